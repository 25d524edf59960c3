use async_trait::async_trait;
use config_manager::GeckoTerminalConfig;
use pnl_core::{CandleHistoryProvider, PnLError, PriceCandle};
use reqwest::Client;
use retry_utils::{retry_with_backoff, RetryConfig, RetryableError};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::types::OhlcvResponse;

#[derive(Error, Debug)]
pub enum GeckoTerminalError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
}

impl GeckoTerminalError {
    fn retry_class(&self) -> RetryableError {
        match self {
            GeckoTerminalError::ApiError { status, .. } => RetryableError::from_status(*status),
            GeckoTerminalError::HttpError(e) => match e.status() {
                Some(status) => RetryableError::from_status(status.as_u16()),
                None => RetryableError::from_transport(e.is_timeout(), e.is_connect()),
            },
        }
    }
}

impl From<GeckoTerminalError> for PnLError {
    fn from(e: GeckoTerminalError) -> Self {
        PnLError::CandleFetch(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GeckoTerminalError>;

/// Convert raw OHLCV rows into candles, dropping rows that are short or contain nulls
pub fn candles_from_response(response: &OhlcvResponse) -> Vec<PriceCandle> {
    let Some(data) = &response.data else {
        return Vec::new();
    };

    data.attributes
        .ohlcv_list
        .iter()
        .filter_map(|row| {
            let values: Vec<f64> = row.iter().map(|v| v.unwrap_or(f64::NAN)).collect();
            PriceCandle::from_row(&values)
        })
        .collect()
}

/// GeckoTerminal client for pool OHLCV history
#[derive(Debug, Clone)]
pub struct GeckoTerminalClient {
    client: Client,
    config: GeckoTerminalConfig,
    retry_config: RetryConfig,
}

impl GeckoTerminalClient {
    pub fn new(config: GeckoTerminalConfig, retry_config: RetryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            config,
            retry_config,
        })
    }

    pub fn ohlcv_url(&self, pool_address: &str) -> String {
        format!(
            "{}/networks/{}/pools/{}/ohlcv/{}?aggregate={}&limit={}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.network,
            pool_address,
            self.config.timeframe,
            self.config.aggregate,
            self.config.limit
        )
    }

    pub async fn get_ohlcv(&self, pool_address: &str) -> Result<Vec<PriceCandle>> {
        let url = self.ohlcv_url(pool_address);

        let response = retry_with_backoff(
            || self.get_json(&url),
            &self.retry_config,
            GeckoTerminalError::retry_class,
        )
        .await?;

        let candles = candles_from_response(&response);
        debug!("Received {} candles for pool {}", candles.len(), pool_address);

        Ok(candles)
    }

    async fn get_json(&self, url: &str) -> Result<OhlcvResponse> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GeckoTerminalError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl CandleHistoryProvider for GeckoTerminalClient {
    async fn fetch_candles(&self, pair_address: &str) -> pnl_core::Result<Vec<PriceCandle>> {
        Ok(self.get_ohlcv(pair_address).await?)
    }
}
