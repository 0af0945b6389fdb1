//! Bars Provider Port
//!
//! Abstraction over the remote OHLCV source. The pipeline only relies on
//! three facts about it: it can fail outright, its bulk response shape can be
//! ambiguous, and it is rate-limited.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Series;

/// Provider errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Ambiguous bulk response: {0}")]
    AmbiguousResponse(String),

    #[error("No data for {0}")]
    NoData(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl ProviderError {
    /// Transient failures are worth a retry; deterministic ones are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Http(_) | ProviderError::RateLimited)
    }
}

/// Bar interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    Daily,
    Hourly,
    Weekly,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Daily => "1d",
            Interval::Hourly => "1h",
            Interval::Weekly => "1wk",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far back to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lookback {
    pub days: u32,
}

impl Lookback {
    pub fn days(days: u32) -> Self {
        Self { days }
    }

    pub fn years(years: u32) -> Self {
        Self { days: years * 365 }
    }

    /// Provider-facing range string ("60d", "10y")
    pub fn as_range(&self) -> String {
        if self.days % 365 == 0 && self.days >= 365 {
            format!("{}y", self.days / 365)
        } else {
            format!("{}d", self.days)
        }
    }
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_range())
    }
}

/// Lightweight per-ticker metadata used by the market-cap pre-filter and the
/// fundamentals scanner. Fields are best-effort; providers return what they
/// have.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickerMeta {
    pub symbol: String,
    pub sector: Option<String>,
    pub market_cap: Option<f64>,
    /// Fractional, e.g. 0.15 for 15%
    pub revenue_growth: Option<f64>,
    /// Fractional return on equity
    pub roe: Option<f64>,
    pub debt_to_equity: Option<f64>,
}

/// Remote OHLCV source
#[async_trait]
pub trait BarsProvider: Send + Sync {
    /// One bulk request for many tickers. Returned keys use plain symbols
    /// (exchange suffix stripped). May fail as a whole or come back in an
    /// ambiguous shape; callers fall back to per-ticker fetches.
    async fn fetch_bulk(
        &self,
        tickers: &[String],
        lookback: Lookback,
        interval: Interval,
    ) -> Result<HashMap<String, Series>, ProviderError>;

    /// Fetch one ticker's series.
    async fn fetch_single(
        &self,
        ticker: &str,
        lookback: Lookback,
        interval: Interval,
    ) -> Result<Series, ProviderError>;

    /// Fetch per-ticker metadata (market cap, fundamentals).
    async fn fetch_meta(&self, ticker: &str) -> Result<TickerMeta, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookback_range_strings() {
        assert_eq!(Lookback::days(60).as_range(), "60d");
        assert_eq!(Lookback::years(10).as_range(), "10y");
        assert_eq!(Lookback::days(365).as_range(), "1y");
        assert_eq!(Lookback::days(400).as_range(), "400d");
    }

    #[test]
    fn transient_classification() {
        assert!(ProviderError::Http("503".into()).is_transient());
        assert!(ProviderError::RateLimited.is_transient());
        assert!(!ProviderError::NoData("X".into()).is_transient());
        assert!(!ProviderError::AmbiguousResponse("shape".into()).is_transient());
    }
}
