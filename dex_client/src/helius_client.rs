use async_trait::async_trait;
use config_manager::HeliusConfig;
use pnl_core::{PnLError, RawSwapEvent, TransactionHistoryProvider};
use reqwest::Client;
use retry_utils::{retry_with_backoff, RetryConfig, RetryableError};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::time;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum HeliusError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Invalid wallet address: {0}")]
    InvalidWalletAddress(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl HeliusError {
    fn retry_class(&self) -> RetryableError {
        match self {
            HeliusError::ApiError { status, .. } => RetryableError::from_status(*status),
            HeliusError::RequestFailed(e) => match e.status() {
                Some(status) => RetryableError::from_status(status.as_u16()),
                None => RetryableError::from_transport(e.is_timeout(), e.is_connect()),
            },
            _ => RetryableError::Other,
        }
    }
}

impl From<HeliusError> for PnLError {
    fn from(e: HeliusError) -> Self {
        match e {
            HeliusError::InvalidWalletAddress(msg) => PnLError::InvalidWallet(msg),
            HeliusError::ConfigError(msg) => PnLError::Configuration(msg),
            other => PnLError::TransactionFetch(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, HeliusError>;

/// Records Helius returns per page at most
const MAX_PAGE_SIZE: u32 = 100;

/// Decode a page record by record. A record that does not fit the swap shape is
/// dropped with a warning; the rest of the page is kept.
pub fn decode_swap_page(records: Vec<Value>) -> Vec<RawSwapEvent> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(position, record)| {
            let signature = record
                .get("signature")
                .and_then(Value::as_str)
                .unwrap_or("<missing>")
                .to_string();

            match serde_json::from_value::<RawSwapEvent>(record) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(
                        "Dropping malformed swap record #{} ({}): {}",
                        position, signature, e
                    );
                    None
                }
            }
        })
        .collect()
}

/// Helius enhanced transactions client, restricted to swap history
#[derive(Debug, Clone)]
pub struct HeliusClient {
    http_client: Client,
    config: HeliusConfig,
    retry_config: RetryConfig,
}

impl HeliusClient {
    /// Create a new Helius client with the given configuration
    pub fn new(config: HeliusConfig, retry_config: RetryConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(HeliusError::ConfigError(
                "Helius API key is required".to_string(),
            ));
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent("sol-tracker/0.1")
            .build()
            .map_err(|e| HeliusError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        let retry_config = retry_config.with_max_attempts(config.max_retry_attempts);

        Ok(Self {
            http_client,
            config,
            retry_config,
        })
    }

    /// Build the Helius API URL for fetching a page of swap transactions
    pub fn build_transactions_url(
        &self,
        wallet_address: &str,
        before: Option<&str>,
        limit: u32,
    ) -> String {
        let mut url = format!(
            "{}/addresses/{}/transactions?api-key={}&type=SWAP&limit={}",
            self.config.api_base_url.trim_end_matches('/'),
            wallet_address,
            self.config.api_key,
            limit
        );

        if let Some(before_signature) = before {
            url.push_str(&format!("&before={}", before_signature));
        }

        url
    }

    /// Fetch up to `limit` swap records, newest first, paging with the `before` cursor
    pub async fn fetch_swap_history(
        &self,
        wallet_address: &str,
        limit: u32,
    ) -> Result<Vec<RawSwapEvent>> {
        pnl_core::validate_wallet_address(wallet_address).map_err(|e| match e {
            PnLError::InvalidWallet(msg) => HeliusError::InvalidWalletAddress(msg),
            other => HeliusError::ConfigError(other.to_string()),
        })?;

        let mut events: Vec<RawSwapEvent> = Vec::new();
        let mut before: Option<String> = None;
        // raw records, dropped ones included
        let mut fetched: u32 = 0;

        while fetched < limit {
            let page_size = (limit - fetched).min(MAX_PAGE_SIZE);
            let records = self
                .fetch_page(wallet_address, before.as_deref(), page_size)
                .await?;

            let received = records.len() as u32;
            fetched += received;
            debug!("Received {} swap records (requested {})", received, page_size);

            before = records
                .last()
                .and_then(|r| r.get("signature"))
                .and_then(Value::as_str)
                .map(str::to_string);
            events.extend(decode_swap_page(records));

            // A short page means the history is exhausted
            if received < page_size || before.is_none() {
                break;
            }

            if self.config.rate_limit_ms > 0 {
                time::sleep(Duration::from_millis(self.config.rate_limit_ms)).await;
            }
        }

        info!(
            "Fetched {} swap records for wallet {}",
            events.len(),
            wallet_address
        );

        Ok(events)
    }

    async fn fetch_page(
        &self,
        wallet_address: &str,
        before: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Value>> {
        let url = self.build_transactions_url(wallet_address, before, limit);
        debug!(
            "Requesting Helius swap page for {} (before: {:?}, limit: {})",
            wallet_address, before, limit
        );

        retry_with_backoff(
            || self.get_page(&url),
            &self.retry_config,
            HeliusError::retry_class,
        )
        .await
    }

    async fn get_page(&self, url: &str) -> Result<Vec<Value>> {
        let response = self.http_client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Helius API error: {} - {}", status, message);
            return Err(HeliusError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<Vec<Value>>().await?)
    }
}

#[async_trait]
impl TransactionHistoryProvider for HeliusClient {
    async fn fetch_swap_transactions(
        &self,
        wallet_address: &str,
        limit: u32,
    ) -> pnl_core::Result<Vec<RawSwapEvent>> {
        Ok(self.fetch_swap_history(wallet_address, limit).await?)
    }
}
