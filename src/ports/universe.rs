//! Ticker Universe Port
//!
//! The universe is produced by an upstream collaborator and arrives already
//! deduplicated by instrument identifier (ISIN). A failure here is fatal to a
//! scan run; there is no partial recovery from not knowing what to scan.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("Failed to read universe: {0}")]
    Io(#[from] std::io::Error),

    #[error("Universe source is empty")]
    Empty,

    #[error("Malformed universe entry: {0}")]
    Malformed(String),
}

/// Source of the ticker universe
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UniverseSource: Send + Sync {
    /// Return the deduplicated list of plain ticker symbols.
    async fn tickers(&self) -> Result<Vec<String>, UniverseError>;
}
