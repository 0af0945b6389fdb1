//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config.toml
//! structure. Every section has working defaults, so a partial file (or an
//! empty one) still yields a runnable configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::adapters::yahoo::YahooConfig;
use crate::application::PipelineConfig;
use crate::fetch::{FetchConfig, RetryPolicy};
use crate::runner::RunnerConfig;
use crate::scanners::ScannersConfig;
use crate::store::StoreConfig;

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: YahooConfig,
    pub fetch: FetchSection,
    pub runner: RunnerSection,
    pub cache: CacheSection,
    pub universe: UniverseSection,
    pub store: StoreConfig,
    pub pipeline: PipelineConfig,
    pub scanners: ScannersConfig,
}

/// Batch-fetch section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    /// Tickers per bulk request for short lookbacks
    pub chunk_size_short: usize,
    /// Tickers per bulk request for multi-year lookbacks
    pub chunk_size_long: usize,
    /// Lookbacks at or beyond this many days count as long
    pub long_lookback_days: u32,
    /// Pause between bulk chunks, milliseconds
    pub inter_chunk_delay_ms: u64,
    /// Series shorter than this many bars are dropped
    pub min_bars: usize,
    /// Timeout per serial-fallback request, seconds
    pub single_timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            chunk_size_short: 200,
            chunk_size_long: 25,
            long_lookback_days: 365,
            inter_chunk_delay_ms: 250,
            min_bars: 20,
            single_timeout_secs: 20,
            retry: RetryPolicy::default(),
        }
    }
}

impl FetchSection {
    pub fn to_fetch_config(&self) -> FetchConfig {
        FetchConfig {
            chunk_size_short: self.chunk_size_short,
            chunk_size_long: self.chunk_size_long,
            long_lookback_days: self.long_lookback_days,
            inter_chunk_delay: Duration::from_millis(self.inter_chunk_delay_ms),
            min_bars: self.min_bars,
            single_timeout: Duration::from_secs(self.single_timeout_secs),
            retry: self.retry.clone(),
        }
    }
}

/// Worker-pool section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerSection {
    /// Concurrency ceiling for scoring tasks
    pub max_workers: usize,
    /// Per-ticker deadline, seconds
    pub task_timeout_secs: u64,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            max_workers: 8,
            task_timeout_secs: 30,
        }
    }
}

impl RunnerSection {
    pub fn to_runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            max_workers: self.max_workers,
            max_results: None,
            task_timeout: Duration::from_secs(self.task_timeout_secs),
        }
    }
}

/// On-disk cache section (series and ticker metadata)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub dir: String,
    /// Freshness window for cached series, seconds
    pub ttl_secs: u64,
    /// Freshness window for cached ticker metadata, seconds
    pub meta_ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            dir: "series_cache".to_string(),
            ttl_secs: 6 * 3600,
            meta_ttl_secs: 24 * 3600,
        }
    }
}

/// Universe section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UniverseSection {
    /// Path to the exchange equity list CSV
    pub file: String,
}

impl Default for UniverseSection {
    fn default() -> Self {
        Self {
            file: "data/equities.csv".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.chunk_size_short == 0 || self.fetch.chunk_size_long == 0 {
            return Err(ConfigError::ValidationError(
                "fetch chunk sizes must be > 0".to_string(),
            ));
        }
        if self.fetch.min_bars == 0 {
            return Err(ConfigError::ValidationError(
                "fetch.min_bars must be > 0".to_string(),
            ));
        }
        if self.fetch.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "fetch.retry.max_attempts must be > 0".to_string(),
            ));
        }

        self.runner
            .to_runner_config()
            .validate()
            .map_err(ConfigError::ValidationError)?;

        if self.pipeline.max_results == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.max_results must be > 0".to_string(),
            ));
        }
        if self.pipeline.max_results_per_bucket == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.max_results_per_bucket must be > 0".to_string(),
            ));
        }

        if self.store.retention_days == 0 {
            return Err(ConfigError::ValidationError(
                "store.retention_days must be > 0".to_string(),
            ));
        }

        if self.provider.base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "provider.base_url cannot be empty".to_string(),
            ));
        }
        if self.universe.file.is_empty() {
            return Err(ConfigError::ValidationError(
                "universe.file cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> String {
        r#"
[provider]
base_url = "https://query1.finance.yahoo.com"
exchange_suffix = ".NS"
timeout_secs = 30

[fetch]
chunk_size_short = 200
chunk_size_long = 25
long_lookback_days = 365
inter_chunk_delay_ms = 250
min_bars = 20
single_timeout_secs = 20

[fetch.retry]
max_attempts = 3
base_delay_ms = 500
backoff_factor = 2.0

[runner]
max_workers = 8
task_timeout_secs = 30

[cache]
dir = "series_cache"
ttl_secs = 21600
meta_ttl_secs = 86400

[universe]
file = "data/equities.csv"

[store]
database_url = ""
local_dir = "scan_history"
retention_days = 15

[pipeline]
max_results = 20
max_results_per_bucket = 15
memo_ttl_secs = 300

[scanners.swing]
min_price = 50.0
min_rsi = 50.0
min_volume_spike_pct = 50.0

[scanners.cyclical]
min_win_rate = 0.60
min_avg_return_pct = 2.0
"#
        .to_string()
    }

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(create_valid_config().as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();

        assert_eq!(config.fetch.chunk_size_short, 200);
        assert_eq!(config.runner.max_workers, 8);
        assert_eq!(config.scanners.swing.min_price, 50.0);
        assert_eq!(config.store.retention_days, 15);
        assert_eq!(config.provider.exchange_suffix, ".NS");
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/path/config.toml");
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::IoError(_)));
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.pipeline.max_results, 20);
        assert_eq!(config.fetch.min_bars, 20);
        assert_eq!(config.cache.ttl_secs, 6 * 3600);
        assert_eq!(config.cache.meta_ttl_secs, 24 * 3600);
        assert_eq!(config.scanners.stage.min_bars, 250);
    }

    #[test]
    fn test_invalid_chunk_size() {
        let invalid = "[fetch]\nchunk_size_short = 0\n";
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(invalid.as_bytes()).unwrap();

        let result = load_config(file.path());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_invalid_worker_count() {
        let invalid = "[runner]\nmax_workers = 0\n";
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(invalid.as_bytes()).unwrap();

        let result = load_config(file.path());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_section_conversions() {
        let config = Config::default();
        let fetch = config.fetch.to_fetch_config();
        assert_eq!(fetch.inter_chunk_delay, Duration::from_millis(250));
        assert_eq!(fetch.single_timeout, Duration::from_secs(20));

        let runner = config.runner.to_runner_config();
        assert_eq!(runner.max_workers, 8);
        assert!(runner.max_results.is_none());
    }
}
