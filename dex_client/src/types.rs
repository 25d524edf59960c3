use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Response of `GET /latest/dex/tokens/{mint}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenPairsResponse {
    #[serde(rename = "schemaVersion")]
    pub schema_version: Option<String>,
    /// `null` when the token is not listed anywhere
    pub pairs: Option<Vec<TokenPair>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(rename = "chainId")]
    pub chain_id: String,
    #[serde(rename = "dexId")]
    pub dex_id: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "pairAddress")]
    pub pair_address: String,
    #[serde(rename = "baseToken")]
    pub base_token: Token,
    #[serde(rename = "quoteToken")]
    pub quote_token: Option<Token>,
    #[serde(rename = "priceNative")]
    pub price_native: Option<String>,
    #[serde(rename = "priceUsd")]
    pub price_usd: Option<String>,
    #[serde(rename = "priceChange")]
    pub price_change: Option<HashMap<String, f64>>,
    pub liquidity: Option<Liquidity>,
    pub fdv: Option<f64>,
    #[serde(rename = "marketCap")]
    pub market_cap: Option<f64>,
    #[serde(rename = "pairCreatedAt")]
    pub pair_created_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Liquidity {
    pub usd: Option<f64>,
    pub base: Option<f64>,
    pub quote: Option<f64>,
}

/// Response of GeckoTerminal `GET /networks/{network}/pools/{pool}/ohlcv/{timeframe}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OhlcvResponse {
    pub data: Option<OhlcvData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OhlcvData {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub data_type: Option<String>,
    #[serde(default)]
    pub attributes: OhlcvAttributes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OhlcvAttributes {
    /// `[timestamp, open, high, low, close, volume]` rows, newest first
    #[serde(default)]
    pub ohlcv_list: Vec<Vec<Option<f64>>>,
}
