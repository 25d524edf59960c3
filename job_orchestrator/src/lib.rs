use chrono::{DateTime, Utc};
use config_manager::SystemConfig;
use dex_client::MarketDataClients;
use futures::stream::{self, StreamExt};
use pnl_core::{
    AnalysisThresholds, CandleHistoryProvider, PnLError, PortfolioSummary, PositionAnalyzer,
    PriceHistoryAnalyzer, PriceLookupProvider, TokenPosition, TokenReport, TradeAggregator,
    TransactionClassifier, TransactionHistoryProvider,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

pub mod export;
pub mod pacer;

pub use export::{report_to_csv, write_report_csv};
pub use pacer::RequestPacer;

#[derive(Error, Debug, Clone)]
pub enum OrchestratorError {
    #[error("Invalid wallet address: {0}")]
    InvalidWallet(String),
    #[error("Transaction history fetch failed: {0}")]
    TransactionFetch(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Client initialization failed: {0}")]
    Client(String),
    #[error("Export failed: {0}")]
    Export(String),
}

impl From<config_manager::ConfigurationError> for OrchestratorError {
    fn from(err: config_manager::ConfigurationError) -> Self {
        OrchestratorError::Config(err.to_string())
    }
}

impl From<dex_client::DexClientError> for OrchestratorError {
    fn from(err: dex_client::DexClientError) -> Self {
        OrchestratorError::Client(err.to_string())
    }
}

impl From<PnLError> for OrchestratorError {
    fn from(err: PnLError) -> Self {
        match err {
            PnLError::InvalidWallet(msg) => OrchestratorError::InvalidWallet(msg),
            PnLError::Configuration(msg) => OrchestratorError::Config(msg),
            other => OrchestratorError::TransactionFetch(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Stage notifications published while a run is in progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum RunProgress {
    FetchingTransactions,
    TransactionsFetched { count: usize },
    TradesClassified { count: usize },
    TokensGrouped { count: usize },
    /// `index` is 1-based
    AnalyzingToken { index: usize, total: usize, mint: String },
    Completed { tokens: usize },
    Failed { message: String },
}

impl fmt::Display for RunProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunProgress::FetchingTransactions => write!(f, "Fetching transactions..."),
            RunProgress::TransactionsFetched { count } => {
                write!(f, "Found {} swap transactions", count)
            }
            RunProgress::TradesClassified { count } => write!(f, "Parsed {} trades", count),
            RunProgress::TokensGrouped { count } => write!(f, "Analyzing {} tokens...", count),
            RunProgress::AnalyzingToken { index, total, mint } => {
                write!(f, "Analyzing token {}/{}: {}", index, total, mint)
            }
            RunProgress::Completed { tokens } => write!(f, "Analysis complete: {} tokens", tokens),
            RunProgress::Failed { message } => write!(f, "Analysis failed: {}", message),
        }
    }
}

/// Forwards progress events to an optional listener. A dropped receiver is ignored.
#[derive(Debug, Clone, Default)]
struct ProgressReporter {
    sender: Option<UnboundedSender<RunProgress>>,
}

impl ProgressReporter {
    fn emit(&self, event: RunProgress) {
        debug!("Run progress: {}", event);
        if let Some(sender) = &self.sender {
            if sender.send(event).is_err() {
                debug!("Progress receiver closed; continuing without notifications");
            }
        }
    }
}

/// Complete result of one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletReport {
    pub wallet_address: String,
    pub generated_at: DateTime<Utc>,
    pub transactions_fetched: usize,
    pub trades_classified: usize,
    pub summary: PortfolioSummary,
    /// One report per traded asset, in first-seen order of the history
    pub tokens: Vec<TokenReport>,
}

/// Run-level settings derived from the system configuration
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub transaction_limit: u32,
    pub max_concurrent_tokens: usize,
    pub min_call_spacing: Duration,
    pub thresholds: AnalysisThresholds,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&SystemConfig::default())
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            transaction_limit: config.helius.transaction_limit,
            max_concurrent_tokens: config.orchestrator.max_concurrent_tokens.max(1),
            min_call_spacing: Duration::from_millis(config.orchestrator.min_call_spacing_ms),
            thresholds: AnalysisThresholds::from(&config.analysis),
        }
    }
}

/// Runs the whole pipeline for one wallet: fetch, classify, aggregate, enrich, analyze
pub struct ReportOrchestrator {
    history: Arc<dyn TransactionHistoryProvider>,
    prices: Arc<dyn PriceLookupProvider>,
    candles: Arc<dyn CandleHistoryProvider>,
    settings: OrchestratorSettings,
    analyzer: PositionAnalyzer,
    pacer: RequestPacer,
}

impl ReportOrchestrator {
    pub fn new(
        history: Arc<dyn TransactionHistoryProvider>,
        prices: Arc<dyn PriceLookupProvider>,
        candles: Arc<dyn CandleHistoryProvider>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            analyzer: PositionAnalyzer::new(settings.thresholds),
            pacer: RequestPacer::new(settings.min_call_spacing),
            history,
            prices,
            candles,
            settings,
        }
    }

    /// Wire the production Helius, DexScreener and GeckoTerminal clients
    pub fn from_config(config: &SystemConfig) -> Result<Self> {
        let clients = MarketDataClients::from_config(config)?;

        Ok(Self::new(
            Arc::new(clients.helius),
            Arc::new(clients.dexscreener),
            Arc::new(clients.geckoterminal),
            OrchestratorSettings::from_config(config),
        ))
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub async fn run(&self, wallet_address: &str) -> Result<WalletReport> {
        self.run_with_progress(wallet_address, None).await
    }

    /// Run the analysis, publishing stage events on `progress` when given.
    /// Exactly one terminal event (`Completed` or `Failed`) is sent.
    pub async fn run_with_progress(
        &self,
        wallet_address: &str,
        progress: Option<UnboundedSender<RunProgress>>,
    ) -> Result<WalletReport> {
        let reporter = ProgressReporter { sender: progress };

        match self.execute(wallet_address, &reporter).await {
            Ok(report) => {
                reporter.emit(RunProgress::Completed {
                    tokens: report.tokens.len(),
                });
                Ok(report)
            }
            Err(e) => {
                error!("Analysis of wallet {} failed: {}", wallet_address, e);
                reporter.emit(RunProgress::Failed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn execute(&self, wallet_address: &str, reporter: &ProgressReporter) -> Result<WalletReport> {
        pnl_core::validate_wallet_address(wallet_address)?;

        info!("Starting analysis for wallet {}", wallet_address);
        reporter.emit(RunProgress::FetchingTransactions);

        self.pacer.wait().await;
        let events = self
            .history
            .fetch_swap_transactions(wallet_address, self.settings.transaction_limit)
            .await?;
        reporter.emit(RunProgress::TransactionsFetched {
            count: events.len(),
        });

        let trades = TransactionClassifier::new(wallet_address).classify_all(&events);
        let trades_classified = trades.len();
        reporter.emit(RunProgress::TradesClassified {
            count: trades_classified,
        });

        let positions = TradeAggregator::from_trades(trades).into_positions();
        let total = positions.len();
        reporter.emit(RunProgress::TokensGrouped { count: total });
        info!(
            "Wallet {}: {} records, {} trades, {} tokens",
            wallet_address,
            events.len(),
            trades_classified,
            total
        );

        // buffered() keeps the output in input order
        let tokens: Vec<TokenReport> = stream::iter(positions.into_iter().enumerate())
            .map(|(index, position)| {
                reporter.emit(RunProgress::AnalyzingToken {
                    index: index + 1,
                    total,
                    mint: position.mint.clone(),
                });
                self.analyze_position(position)
            })
            .buffered(self.settings.max_concurrent_tokens)
            .collect()
            .await;

        let summary = PortfolioSummary::from_reports(&tokens);
        info!(
            "Wallet {} analyzed: {} tokens, realized {}, unrealized {}, {} roundtrips",
            wallet_address,
            summary.tokens_traded,
            summary.total_realized_pnl,
            summary.total_unrealized_pnl,
            summary.roundtrips
        );

        Ok(WalletReport {
            wallet_address: wallet_address.to_string(),
            generated_at: Utc::now(),
            transactions_fetched: events.len(),
            trades_classified,
            summary,
            tokens,
        })
    }

    /// Enrich one position with market data and analyze it. Never fails:
    /// lookup and candle errors leave the affected fields unknown.
    async fn analyze_position(&self, mut position: TokenPosition) -> TokenReport {
        self.pacer.wait().await;
        match self.prices.lookup_price(&position.mint).await {
            Ok(Some(info)) => position.apply_price_info(info),
            Ok(None) => debug!("No price listing for {}", position.mint),
            Err(e) => warn!("Price lookup for {} failed: {}", position.mint, e),
        }

        let candles = match position.pair_address.as_deref() {
            Some(pair_address) => {
                self.pacer.wait().await;
                match self.candles.fetch_candles(pair_address).await {
                    Ok(candles) => candles,
                    Err(e) => {
                        warn!(
                            "Candle fetch for {} (pair {}) failed: {}",
                            position.mint, pair_address, e
                        );
                        Vec::new()
                    }
                }
            }
            None => Vec::new(),
        };

        let extrema = PriceHistoryAnalyzer::for_position(&position).scan(position.current_price, &candles);
        self.analyzer.analyze(position, &extrema)
    }
}
