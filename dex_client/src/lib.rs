// External market data sources: Helius swap history, DexScreener prices, GeckoTerminal candles

pub mod dexscreener_client;
pub mod geckoterminal_client;
pub mod helius_client;
pub mod types;

// Re-export configs from config_manager
pub use config_manager::{DexScreenerConfig, GeckoTerminalConfig, HeliusConfig};

pub use dexscreener_client::{price_info_from_pairs, DexScreenerClient, DexScreenerError};
pub use geckoterminal_client::{candles_from_response, GeckoTerminalClient, GeckoTerminalError};
pub use helius_client::{decode_swap_page, HeliusClient, HeliusError};
pub use types::{OhlcvResponse, TokenPair, TokenPairsResponse};

use config_manager::SystemConfig;
use retry_utils::RetryConfig;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DexClientError {
    #[error("Helius client error: {0}")]
    Helius(#[from] HeliusError),
    #[error("DexScreener client error: {0}")]
    DexScreener(#[from] DexScreenerError),
    #[error("GeckoTerminal client error: {0}")]
    GeckoTerminal(#[from] GeckoTerminalError),
}

/// The three production providers, built from one configuration
#[derive(Debug, Clone)]
pub struct MarketDataClients {
    pub helius: HeliusClient,
    pub dexscreener: DexScreenerClient,
    pub geckoterminal: GeckoTerminalClient,
}

impl MarketDataClients {
    pub fn from_config(config: &SystemConfig) -> Result<Self, DexClientError> {
        let retry = RetryConfig::from(&config.retry);

        Ok(Self {
            helius: HeliusClient::new(config.helius.clone(), retry.clone())?,
            dexscreener: DexScreenerClient::new(config.dexscreener.clone(), retry.clone())?,
            geckoterminal: GeckoTerminalClient::new(config.geckoterminal.clone(), retry)?,
        })
    }
}
