//! File-backed ticker universe.
//!
//! Reads the exchange's equity list CSV (the NSE `EQUITY_L.csv` layout:
//! SYMBOL first, ISIN somewhere later) and yields plain symbols,
//! deduplicated by ISIN so dual listings appear once.

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::ports::universe::{UniverseError, UniverseSource};

pub struct FileUniverse {
    path: PathBuf,
}

impl FileUniverse {
    pub fn new(path: &str) -> Self {
        let expanded = shellexpand::tilde(path).to_string();
        Self {
            path: PathBuf::from(expanded),
        }
    }

    fn parse(content: &str) -> Result<Vec<String>, UniverseError> {
        let mut lines = content.lines();
        let header = lines
            .next()
            .ok_or(UniverseError::Empty)?
            .split(',')
            .map(|c| c.trim().to_uppercase())
            .collect::<Vec<_>>();

        let symbol_col = header
            .iter()
            .position(|c| c == "SYMBOL")
            .ok_or_else(|| UniverseError::Malformed("no SYMBOL column".to_string()))?;
        let isin_col = header.iter().position(|c| c.contains("ISIN"));

        let mut seen_isins = HashSet::new();
        let mut tickers = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let cols: Vec<&str> = line.split(',').map(str::trim).collect();
            let Some(symbol) = cols.get(symbol_col).filter(|s| !s.is_empty()) else {
                continue;
            };
            if let Some(isin_col) = isin_col {
                if let Some(isin) = cols.get(isin_col).filter(|s| !s.is_empty()) {
                    if !seen_isins.insert(isin.to_string()) {
                        continue;
                    }
                }
            }
            tickers.push(symbol.to_string());
        }

        if tickers.is_empty() {
            return Err(UniverseError::Empty);
        }
        Ok(tickers)
    }
}

#[async_trait]
impl UniverseSource for FileUniverse {
    async fn tickers(&self) -> Result<Vec<String>, UniverseError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let tickers = Self::parse(&content)?;
        tracing::info!("Universe: {} tickers from {}", tickers.len(), self.path.display());
        Ok(tickers)
    }
}
