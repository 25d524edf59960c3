use async_trait::async_trait;
use config_manager::DexScreenerConfig;
use pnl_core::{PnLError, PriceInfo, PriceLookupProvider};
use reqwest::Client;
use retry_utils::{retry_with_backoff, RetryConfig, RetryableError};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{TokenPair, TokenPairsResponse};

#[derive(Error, Debug)]
pub enum DexScreenerError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
}

impl DexScreenerError {
    fn retry_class(&self) -> RetryableError {
        match self {
            DexScreenerError::ApiError { status, .. } => RetryableError::from_status(*status),
            DexScreenerError::HttpError(e) => match e.status() {
                Some(status) => RetryableError::from_status(status.as_u16()),
                None => RetryableError::from_transport(e.is_timeout(), e.is_connect()),
            },
        }
    }
}

impl From<DexScreenerError> for PnLError {
    fn from(e: DexScreenerError) -> Self {
        PnLError::PriceFetch(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DexScreenerError>;

/// Pick the first pair on `chain_id` and turn it into price metadata.
///
/// Returns `None` when no pair on the chain exists. A present pair with an
/// unparsable price still yields its symbol, name and pair address.
pub fn price_info_from_pairs(pairs: &[TokenPair], chain_id: &str) -> Option<PriceInfo> {
    let pair = pairs.iter().find(|p| p.chain_id == chain_id)?;

    let price = pair
        .price_usd
        .as_deref()
        .and_then(|p| Decimal::from_str(p.trim()).ok())
        .filter(|p| *p > Decimal::ZERO);

    let price_change_24h = pair
        .price_change
        .as_ref()
        .and_then(|changes| changes.get("h24"))
        .and_then(|v| Decimal::from_f64(*v));

    Some(PriceInfo {
        price,
        symbol: pair.base_token.symbol.clone(),
        name: pair.base_token.name.clone(),
        market_cap: pair.market_cap.and_then(Decimal::from_f64),
        price_change_24h,
        pair_address: Some(pair.pair_address.clone()).filter(|a| !a.is_empty()),
    })
}

/// DexScreener client for current token prices
#[derive(Debug, Clone)]
pub struct DexScreenerClient {
    client: Client,
    config: DexScreenerConfig,
    retry_config: RetryConfig,
}

impl DexScreenerClient {
    pub fn new(config: DexScreenerConfig, retry_config: RetryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            config,
            retry_config,
        })
    }

    pub fn token_pairs_url(&self, mint: &str) -> String {
        format!(
            "{}/latest/dex/tokens/{}",
            self.config.api_base_url.trim_end_matches('/'),
            mint
        )
    }

    /// All pairs DexScreener lists for a token, on any chain
    pub async fn get_token_pairs(&self, mint: &str) -> Result<Vec<TokenPair>> {
        let url = self.token_pairs_url(mint);

        let response: TokenPairsResponse = retry_with_backoff(
            || self.get_json(&url),
            &self.retry_config,
            DexScreenerError::retry_class,
        )
        .await?;

        Ok(response.pairs.unwrap_or_default())
    }

    async fn get_json(&self, url: &str) -> Result<TokenPairsResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DexScreenerError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    pub async fn get_price_info(&self, mint: &str) -> Result<Option<PriceInfo>> {
        let pairs = self.get_token_pairs(mint).await?;
        let info = price_info_from_pairs(&pairs, &self.config.chain_id);

        match &info {
            Some(info) => debug!(
                "DexScreener price for {}: {:?} ({:?}, pair {:?})",
                mint, info.price, info.symbol, info.pair_address
            ),
            None => warn!(
                "No {} pair on DexScreener for {} ({} pairs on other chains)",
                self.config.chain_id,
                mint,
                pairs.len()
            ),
        }

        Ok(info)
    }
}

#[async_trait]
impl PriceLookupProvider for DexScreenerClient {
    async fn lookup_price(&self, mint: &str) -> pnl_core::Result<Option<PriceInfo>> {
        Ok(self.get_price_info(mint).await?)
    }
}
