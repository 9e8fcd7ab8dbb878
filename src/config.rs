//! Service configuration loaded from environment variables
//!
//! Every key has a default. Unparsable values fall back to the default with a
//! warning; values that would make a run impossible are rejected.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Which provider field the change percentage is measured against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePrice {
    /// Close of the prior trading session
    #[default]
    PreviousClose,
    /// Opening price of the current session
    Open,
}

impl FromStr for ReferencePrice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "previous_close" | "prev_close" | "close" => Ok(Self::PreviousClose),
            "open" => Ok(Self::Open),
            other => Err(format!("unknown reference price '{}'", other)),
        }
    }
}

/// Symbol normalization rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Identifiers treated as market indices
    #[serde(default = "default_index_symbols")]
    pub index_symbols: Vec<String>,

    /// Leading character that marks an index (e.g., "^GSPC")
    #[serde(default = "default_index_marker")]
    pub index_marker: char,

    /// Suffix appended to equity lookup codes
    #[serde(default = "default_market_suffix")]
    pub market_suffix: String,
}

/// Batch partitioning and provider courtesy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum concurrent fetches within one batch
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Pause between batches in milliseconds
    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,
}

/// Per-symbol retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total provider calls per symbol, including the first
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between attempts in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Per-attempt timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Synchronization engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Minimum seconds between the end of one run and the start of the next
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,

    /// Write every fetched quote, even when the price is unchanged
    #[serde(default)]
    pub always_write: bool,

    #[serde(default)]
    pub reference_price: ReferencePrice,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub normalizer: NormalizerConfig,
}

/// Yahoo history request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_history_range")]
    pub history_range: String,

    #[serde(default = "default_history_interval")]
    pub history_interval: String,
}

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_server_addr")]
    pub server_addr: String,

    /// Postgres URL; the in-memory store is used when absent
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Symbols inserted into the universe at startup
    #[serde(default)]
    pub seed_symbols: Vec<String>,

    /// Six-field cron expression for the periodic run
    #[serde(default = "default_schedule")]
    pub schedule: String,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            index_symbols: default_index_symbols(),
            index_marker: default_index_marker(),
            market_suffix: default_market_suffix(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            inter_batch_delay_ms: default_inter_batch_delay_ms(),
        }
    }
}

impl BatchConfig {
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: default_min_interval_secs(),
            always_write: false,
            reference_price: ReferencePrice::default(),
            batch: BatchConfig::default(),
            retry: RetryPolicy::default(),
            normalizer: NormalizerConfig::default(),
        }
    }
}

impl SyncConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            history_range: default_history_range(),
            history_interval: default_history_interval(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_addr: default_server_addr(),
            database_url: None,
            pool_size: default_pool_size(),
            seed_symbols: Vec::new(),
            schedule: default_schedule(),
            sync: SyncConfig::default(),
            provider: ProviderConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };
        let defaults = AppConfig::default();

        let config = AppConfig {
            server_addr: env.string("SERVER_ADDR").unwrap_or(defaults.server_addr),
            database_url: env.string("DATABASE_URL"),
            pool_size: env.parse("DB_POOL_MAX_SIZE", defaults.pool_size),
            seed_symbols: env.list("SYNC_SYMBOLS").unwrap_or_default(),
            schedule: env.string("SYNC_SCHEDULE").unwrap_or(defaults.schedule),
            sync: SyncConfig {
                min_interval_secs: env.parse("SYNC_MIN_INTERVAL_SECS", default_min_interval_secs()),
                always_write: env.parse("SYNC_ALWAYS_WRITE", false),
                reference_price: env.parse("SYNC_REFERENCE_PRICE", ReferencePrice::default()),
                batch: BatchConfig {
                    batch_size: env.parse("SYNC_BATCH_SIZE", default_batch_size()),
                    concurrency: env.parse("SYNC_CONCURRENCY", default_concurrency()),
                    inter_batch_delay_ms: env
                        .parse("SYNC_INTER_BATCH_DELAY_SECS", default_inter_batch_delay_ms() / 1000)
                        .saturating_mul(1000),
                },
                retry: RetryPolicy {
                    max_retries: env.parse("SYNC_MAX_RETRIES", default_max_retries()),
                    retry_delay_ms: env.parse("SYNC_RETRY_DELAY_MS", default_retry_delay_ms()),
                    request_timeout_ms: env
                        .parse("SYNC_REQUEST_TIMEOUT_SECS", default_request_timeout_ms() / 1000)
                        .saturating_mul(1000),
                },
                normalizer: NormalizerConfig {
                    index_symbols: env
                        .list("SYNC_INDEX_SYMBOLS")
                        .unwrap_or_else(default_index_symbols),
                    index_marker: env.parse("SYNC_INDEX_MARKER", default_index_marker()),
                    market_suffix: env
                        .string("SYNC_MARKET_SUFFIX")
                        .unwrap_or_else(default_market_suffix),
                },
            },
            provider: ProviderConfig {
                history_range: env
                    .string("QUOTE_HISTORY_RANGE")
                    .unwrap_or_else(default_history_range),
                history_interval: env
                    .string("QUOTE_HISTORY_INTERVAL")
                    .unwrap_or_else(default_history_interval),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make a run impossible
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.batch.batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "SYNC_BATCH_SIZE",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.sync.batch.concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "SYNC_CONCURRENCY",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.sync.retry.max_retries == 0 {
            return Err(ConfigError::Invalid {
                key: "SYNC_MAX_RETRIES",
                reason: "must allow at least one attempt".to_string(),
            });
        }
        if self.sync.retry.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "SYNC_REQUEST_TIMEOUT_SECS",
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.schedule.split_whitespace().count() != 6 {
            return Err(ConfigError::Invalid {
                key: "SYNC_SCHEDULE",
                reason: format!("expected a six-field cron expression, got '{}'", self.schedule),
            });
        }
        Ok(())
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn list(&self, key: &str) -> Option<Vec<String>> {
        self.string(key).map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
    }

    fn parse<T: FromStr>(&self, key: &str, default: T) -> T {
        match self.string(key) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("Ignoring unparsable {}={:?}, using default", key, raw);
                default
            }),
            None => default,
        }
    }
}

// Default value functions for serde
fn default_server_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_schedule() -> String {
    "0 */15 * * * *".to_string()
}

fn default_min_interval_secs() -> u64 {
    600
}

fn default_batch_size() -> usize {
    20
}

fn default_concurrency() -> usize {
    4
}

fn default_inter_batch_delay_ms() -> u64 {
    15_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_index_symbols() -> Vec<String> {
    ["NSEI", "NSEBANK", "BSESN", "DJI", "IXIC", "GSPC"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_index_marker() -> char {
    '^'
}

fn default_market_suffix() -> String {
    ".NS".to_string()
}

fn default_history_range() -> String {
    "5d".to_string()
}

fn default_history_interval() -> String {
    "1d".to_string()
}
