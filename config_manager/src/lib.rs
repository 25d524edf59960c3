use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] ConfigError),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;

/// Environment prefix, e.g. `TRACKER__HELIUS__API_KEY`
pub const ENV_PREFIX: &str = "TRACKER";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// General system settings
    pub system: SystemSettings,

    /// Helius enhanced transactions API (swap history)
    pub helius: HeliusConfig,

    /// DexScreener API (current price and pair metadata)
    pub dexscreener: DexScreenerConfig,

    /// GeckoTerminal API (hourly candles)
    pub geckoterminal: GeckoTerminalConfig,

    /// Heuristic thresholds used by the position analysis
    pub analysis: AnalysisConfig,

    /// Per-run scheduling of external calls
    pub orchestrator: OrchestratorConfig,

    /// Backoff schedule for transient transport errors
    pub retry: RetrySettings,

    /// API server configuration
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSettings {
    /// Default the log filter to `debug` when `RUST_LOG` is unset
    pub debug_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeliusConfig {
    /// Helius API key, required before a transaction fetch
    pub api_key: String,

    /// Helius API base URL
    pub api_base_url: String,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Maximum number of swap records requested per wallet
    pub transaction_limit: u32,

    /// Maximum retry attempts for failed requests
    pub max_retry_attempts: u32,

    /// Base delay for rate limit backoff in milliseconds
    pub rate_limit_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DexScreenerConfig {
    /// DexScreener API base URL
    pub api_base_url: String,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Only pairs on this chain are considered
    pub chain_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeckoTerminalConfig {
    pub api_base_url: String,
    pub network: String,
    /// OHLCV timeframe (minute, hour, day)
    pub timeframe: String,
    pub aggregate: u32,
    /// Number of candles requested
    pub limit: u32,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    /// Peak after entry must exceed avg buy price times this to count as a roundtrip
    pub roundtrip_runup_multiplier: f64,

    /// Positions holding at most this many tokens are reported as closed
    pub holding_dust_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Tokens enriched at the same time (1 = sequential)
    pub max_concurrent_tokens: usize,

    /// Minimum spacing between two external calls in milliseconds
    pub min_call_spacing_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub rate_limit_delays_ms: Vec<u64>,
    pub server_error_delays_ms: Vec<u64>,
    pub timeout_delays_ms: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API server host
    pub host: String,

    /// API server port
    pub port: u16,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            system: SystemSettings { debug_mode: false },
            helius: HeliusConfig {
                api_key: "".to_string(), // Must be set in .env or config file
                api_base_url: "https://api-mainnet.helius-rpc.com/v0".to_string(),
                request_timeout_seconds: 30,
                transaction_limit: 100,
                max_retry_attempts: 3,
                rate_limit_ms: 200,
            },
            dexscreener: DexScreenerConfig {
                api_base_url: "https://api.dexscreener.com".to_string(),
                request_timeout_seconds: 30,
                chain_id: "solana".to_string(),
            },
            geckoterminal: GeckoTerminalConfig {
                api_base_url: "https://api.geckoterminal.com/api/v2".to_string(),
                network: "solana".to_string(),
                timeframe: "hour".to_string(),
                aggregate: 1,
                limit: 168, // one week of hourly candles
                request_timeout_seconds: 30,
            },
            analysis: AnalysisConfig::default(),
            orchestrator: OrchestratorConfig {
                max_concurrent_tokens: 1,
                min_call_spacing_ms: 200,
            },
            retry: RetrySettings {
                max_attempts: 3,
                rate_limit_delays_ms: vec![1000, 2000, 4000],
                server_error_delays_ms: vec![500, 1000, 2000],
                timeout_delays_ms: vec![1000, 2000],
            },
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            roundtrip_runup_multiplier: 1.5,
            holding_dust_threshold: 0.001,
        }
    }
}

fn require_timeout(name: &str, seconds: u64) -> Result<()> {
    if seconds == 0 {
        return Err(ConfigurationError::InvalidValue(format!(
            "{} request timeout must be greater than 0",
            name
        )));
    }
    Ok(())
}

impl HeliusConfig {
    /// Validate Helius configuration. The API key is checked when the client is built.
    pub fn validate(&self) -> Result<()> {
        require_timeout("Helius", self.request_timeout_seconds)?;

        if self.transaction_limit == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Helius transaction limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl GeckoTerminalConfig {
    pub fn validate(&self) -> Result<()> {
        require_timeout("GeckoTerminal", self.request_timeout_seconds)?;

        if self.aggregate == 0 || self.limit == 0 {
            return Err(ConfigurationError::InvalidValue(
                "GeckoTerminal aggregate and limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("roundtrip_runup_multiplier", self.roundtrip_runup_multiplier),
            ("holding_dust_threshold", self.holding_dust_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigurationError::InvalidValue(format!(
                    "analysis.{} must be a finite, non-negative number (got {})",
                    name, value
                )));
            }
        }

        if self.roundtrip_runup_multiplier <= 1.0 {
            warn!(
                "analysis.roundtrip_runup_multiplier = {} flags any position that ever traded above entry",
                self.roundtrip_runup_multiplier
            );
        }

        Ok(())
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_tokens == 0 {
            return Err(ConfigurationError::InvalidValue(
                "orchestrator.max_concurrent_tokens must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl SystemConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config_builder = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&SystemConfig::default())?);

        // Add config file if it exists
        if config_path.as_ref().exists() {
            info!(
                "Loading configuration from: {}",
                config_path.as_ref().display()
            );
            config_builder = config_builder.add_source(File::from(config_path.as_ref()));
        } else {
            debug!("Config file not found, using defaults and environment variables");
        }

        // Add environment variables with prefix
        config_builder = config_builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("retry.rate_limit_delays_ms")
                .with_list_parse_key("retry.server_error_delays_ms")
                .with_list_parse_key("retry.timeout_delays_ms"),
        );

        let system_config: SystemConfig = config_builder.build()?.try_deserialize()?;

        if system_config.helius.api_key.is_empty() {
            debug!("No Helius API key configured; transaction fetches will be rejected");
        }

        system_config.validate()?;

        Ok(system_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.helius.validate()?;
        require_timeout("DexScreener", self.dexscreener.request_timeout_seconds)?;
        self.geckoterminal.validate()?;
        self.analysis.validate()?;
        self.orchestrator.validate()?;

        if self.api.port == 0 {
            return Err(ConfigurationError::InvalidValue(
                "API port cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}
