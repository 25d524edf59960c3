pub mod aggregator;
pub mod classifier;
pub mod position_analyzer;
pub mod price_history;
pub mod summary;
pub mod swap_event;


pub use aggregator::TradeAggregator;
pub use classifier::{SwapLeg, TransactionClassifier};
pub use position_analyzer::{AnalysisThresholds, PositionAnalyzer};
pub use price_history::{PriceExtrema, PriceHistoryAnalyzer};
pub use summary::PortfolioSummary;
pub use swap_event::{
    NativeAmount, RawAmount, RawSwapEvent, RawTokenAmount, SwapEvents, SwapPayload, TokenAmount,
};

use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum PnLError {
    #[error("Transaction history fetch failed: {0}")]
    TransactionFetch(String),
    #[error("Price lookup failed: {0}")]
    PriceFetch(String),
    #[error("Candle history fetch failed: {0}")]
    CandleFetch(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid wallet address: {0}")]
    InvalidWallet(String),
}

pub type Result<T> = std::result::Result<T, PnLError>;

/// Wrapped SOL mint, used as the identifier for native-coin swap legs
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
pub const USDT_MINT: &str = "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB";

/// Stable assets recognized as a unit of account (the native coin is checked separately)
pub const STABLE_MINTS: [&str; 2] = [USDC_MINT, USDT_MINT];

/// Decimals assumed for a token leg whose raw amount carries none
pub const DEFAULT_TOKEN_DECIMALS: u32 = 9;

/// Lamports per SOL
pub const NATIVE_DECIMALS: u32 = 9;

/// True for the native coin and for every mint in the stable set
pub fn is_stable_or_native(mint: &str) -> bool {
    mint == SOL_MINT || STABLE_MINTS.contains(&mint)
}

/// Basic Solana address check: non-empty, 32 to 44 characters
pub fn validate_wallet_address(wallet_address: &str) -> Result<()> {
    if wallet_address.is_empty() {
        return Err(PnLError::InvalidWallet(
            "Wallet address cannot be empty".to_string(),
        ));
    }

    if wallet_address.len() < 32 || wallet_address.len() > 44 {
        return Err(PnLError::InvalidWallet(format!(
            "Invalid wallet address length: {}",
            wallet_address.len()
        )));
    }

    Ok(())
}

/// Reference to a tradeable asset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetRef {
    pub mint: String,
    pub decimals: u32,
}

impl AssetRef {
    pub fn native() -> Self {
        Self {
            mint: SOL_MINT.to_string(),
            decimals: NATIVE_DECIMALS,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeDirection {
    Buy,
    Sell,
}

/// A swap normalized into a directional trade of one non-stable asset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    /// Transaction signature
    pub signature: String,

    /// Unix timestamp in seconds
    pub timestamp: i64,

    pub direction: TradeDirection,

    /// Mint of the non-stable asset that was bought or sold
    pub asset_mint: String,

    /// Quantity of the traded asset (always positive)
    pub asset_amount: Decimal,

    /// Quantity of the stable/native side (always positive)
    pub stable_amount: Decimal,

    /// stable_amount / asset_amount
    pub unit_price: Decimal,

    /// Mint of the stable/native side
    pub stable_mint: String,
}

/// Current market data for one asset, as returned by the price lookup provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PriceInfo {
    pub price: Option<Decimal>,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub market_cap: Option<Decimal>,
    pub price_change_24h: Option<Decimal>,
    pub pair_address: Option<String>,
}

/// Per-asset trade accumulator, filled by the aggregator and enriched by a price lookup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenPosition {
    pub mint: String,

    /// Buy trades in input order
    pub buys: Vec<Trade>,

    /// Sell trades in input order
    pub sells: Vec<Trade>,

    pub symbol: Option<String>,
    pub name: Option<String>,
    pub current_price: Option<Decimal>,
    pub market_cap: Option<Decimal>,
    pub pair_address: Option<String>,
    pub price_change_24h: Option<Decimal>,
}

impl TokenPosition {
    pub fn new(mint: impl Into<String>) -> Self {
        Self {
            mint: mint.into(),
            buys: Vec::new(),
            sells: Vec::new(),
            symbol: None,
            name: None,
            current_price: None,
            market_cap: None,
            pair_address: None,
            price_change_24h: None,
        }
    }

    /// Append a trade to the buy or sell list according to its direction
    pub fn record(&mut self, trade: Trade) {
        match trade.direction {
            TradeDirection::Buy => self.buys.push(trade),
            TradeDirection::Sell => self.sells.push(trade),
        }
    }

    /// Copy the metadata of a successful price lookup onto the position.
    /// A non-positive price is treated as unknown.
    pub fn apply_price_info(&mut self, info: PriceInfo) {
        self.current_price = info.price.filter(|p| *p > Decimal::ZERO);
        self.symbol = info.symbol;
        self.name = info.name;
        self.market_cap = info.market_cap;
        self.pair_address = info.pair_address.filter(|p| !p.is_empty());
        self.price_change_24h = info.price_change_24h;
    }

    /// Earliest buy timestamp, 0 when there are no buys
    pub fn first_buy_time(&self) -> i64 {
        self.buys.iter().map(|t| t.timestamp).min().unwrap_or(0)
    }

    /// Latest sell timestamp, 0 when there are no sells
    pub fn last_sell_time(&self) -> i64 {
        self.sells.iter().map(|t| t.timestamp).max().unwrap_or(0)
    }

    pub fn trade_count(&self) -> usize {
        self.buys.len() + self.sells.len()
    }

    fn all_trades(&self) -> impl Iterator<Item = &Trade> {
        self.buys.iter().chain(self.sells.iter())
    }

    pub fn first_trade_time(&self) -> Option<i64> {
        self.all_trades().map(|t| t.timestamp).min()
    }

    pub fn last_trade_time(&self) -> Option<i64> {
        self.all_trades().map(|t| t.timestamp).max()
    }
}

/// One hourly OHLC sample
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceCandle {
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

impl PriceCandle {
    /// Build a candle from a `[timestamp, open, high, low, close, ...]` row.
    /// Rows shorter than five elements or with non-finite values are rejected.
    pub fn from_row(row: &[f64]) -> Option<Self> {
        if row.len() < 5 || row[..5].iter().any(|v| !v.is_finite()) {
            return None;
        }

        Some(Self {
            timestamp: row[0] as i64,
            open: Decimal::from_f64(row[1])?,
            high: Decimal::from_f64(row[2])?,
            low: Decimal::from_f64(row[3])?,
            close: Decimal::from_f64(row[4])?,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionStatus {
    Holding,
    Closed,
}

/// Full per-asset performance report, produced once per analysis run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenReport {
    #[serde(flatten)]
    pub position: TokenPosition,

    pub total_buy_amount: Decimal,
    pub total_buy_tokens: Decimal,
    pub avg_buy_price: Decimal,

    pub total_sell_amount: Decimal,
    pub total_sell_tokens: Decimal,
    pub avg_sell_price: Decimal,

    pub realized_pnl: Decimal,
    pub realized_pnl_percent: Decimal,

    /// Negative only when sells exceed tracked buys
    pub tokens_held: Decimal,
    pub unrealized_value: Decimal,
    pub cost_basis: Decimal,
    pub unrealized_pnl: Decimal,
    pub unrealized_pnl_percent: Decimal,

    pub max_price_after_buy: Decimal,
    pub min_price_after_buy: Decimal,
    pub max_price_after_sell: Decimal,
    pub max_gain_possible: Decimal,
    pub max_drawdown: Decimal,

    pub missed_gains: Decimal,
    pub missed_gains_percent: Decimal,

    pub is_roundtrip: bool,
    pub status: PositionStatus,

    pub trade_count: usize,
    pub first_trade_time: Option<i64>,
    pub last_trade_time: Option<i64>,
}

impl TokenReport {
    pub fn total_pnl(&self) -> Decimal {
        self.realized_pnl.saturating_add(self.unrealized_pnl)
    }
}

/// Source of a wallet's swap history
#[async_trait]
pub trait TransactionHistoryProvider: Send + Sync {
    /// Fetch up to `limit` swap records for a wallet, newest first
    async fn fetch_swap_transactions(
        &self,
        wallet_address: &str,
        limit: u32,
    ) -> Result<Vec<RawSwapEvent>>;
}

/// Source of current price and trading-pair metadata
#[async_trait]
pub trait PriceLookupProvider: Send + Sync {
    /// `Ok(None)` means the asset is not listed
    async fn lookup_price(&self, mint: &str) -> Result<Option<PriceInfo>>;
}

/// Source of hourly candles for a trading pair
#[async_trait]
pub trait CandleHistoryProvider: Send + Sync {
    async fn fetch_candles(&self, pair_address: &str) -> Result<Vec<PriceCandle>>;
}
