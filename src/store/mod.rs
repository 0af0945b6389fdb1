//! Result Store
//!
//! Rolling persistence for scan runs: the latest result set per scanner plus
//! a 15-day snapshot history, with membership-hash change detection between
//! consecutive runs. Backed by SQLite when a database URL is configured and
//! by plain JSON files otherwise; a broken database degrades to the file
//! backend with a warning rather than failing the scan.

pub mod local;
pub mod sqlite;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::domain::{ScanOutcome, ScannerType};

pub use local::LocalStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt stored payload: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Store configuration (`[store]` section).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite location, a bare path or `sqlite://` URL. The `DATABASE_URL`
    /// environment variable overrides this. Empty means file backend.
    pub database_url: String,
    /// Directory for the JSON file backend
    pub local_dir: String,
    /// Days of snapshot history to keep per scanner
    pub retention_days: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            local_dir: "scan_history".to_string(),
            retention_days: 15,
        }
    }
}

/// One persisted scan run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub scanner: ScannerType,
    pub scan_date: NaiveDate,
    /// Membership hash of the result set
    pub hash: String,
    pub count: usize,
    pub outcome: ScanOutcome,
}

/// Membership diff between the stored latest run and a new one.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeReport {
    pub changed: bool,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub previous_hash: Option<String>,
    pub current_hash: String,
}

/// Content hash over result-set membership.
///
/// Symbols are sorted and deduplicated first, so the hash is a pure function
/// of which stocks are in the set, never of rank order or scores.
pub fn membership_hash(symbols: &[String]) -> String {
    let mut sorted: Vec<&str> = symbols.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut hasher = Sha256::new();
    for symbol in sorted {
        hasher.update(symbol.as_bytes());
        hasher.update(b"\n");
    }
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Persistence behind the pipeline. Implementations are synchronous; the
/// pipeline wraps calls where blocking matters.
pub trait ResultStore: Send + Sync {
    /// Overwrite the latest result set for `scanner`, append a dated
    /// snapshot, and prune snapshots past the retention window.
    fn save(
        &self,
        scanner: ScannerType,
        scan_date: NaiveDate,
        outcome: &ScanOutcome,
    ) -> Result<(), StoreError>;

    fn load_latest(&self, scanner: ScannerType) -> Result<Option<HistorySnapshot>, StoreError>;

    /// Snapshots within the last `days` days, oldest first.
    fn history(&self, scanner: ScannerType, days: u32) -> Result<Vec<HistorySnapshot>, StoreError>;

    /// Compare a fresh outcome against the stored latest run by membership.
    fn detect_change(
        &self,
        scanner: ScannerType,
        outcome: &ScanOutcome,
    ) -> Result<ChangeReport, StoreError> {
        let current_symbols = outcome.symbols();
        let current_hash = membership_hash(&current_symbols);

        let previous = self.load_latest(scanner)?;
        let Some(previous) = previous else {
            return Ok(ChangeReport {
                changed: true,
                added: sorted_unique(current_symbols),
                removed: Vec::new(),
                previous_hash: None,
                current_hash,
            });
        };

        let prev_symbols = sorted_unique(previous.outcome.symbols());
        let cur_symbols = sorted_unique(current_symbols);
        let added = diff(&cur_symbols, &prev_symbols);
        let removed = diff(&prev_symbols, &cur_symbols);

        Ok(ChangeReport {
            changed: previous.hash != current_hash,
            added,
            removed,
            previous_hash: Some(previous.hash),
            current_hash,
        })
    }
}

fn sorted_unique(mut symbols: Vec<String>) -> Vec<String> {
    symbols.sort_unstable();
    symbols.dedup();
    symbols
}

/// Elements of `a` not present in `b`; both inputs sorted.
fn diff(a: &[String], b: &[String]) -> Vec<String> {
    a.iter().filter(|s| b.binary_search(s).is_err()).cloned().collect()
}

/// Open the configured backend. A configured database that fails to open
/// degrades to the file backend so a scan never dies on persistence.
pub fn open_store(config: &StoreConfig) -> Result<Box<dyn ResultStore>, StoreError> {
    let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| config.database_url.clone());
    if !url.is_empty() {
        match SqliteStore::open(&url, config.retention_days) {
            Ok(store) => return Ok(Box::new(store)),
            Err(e) => {
                tracing::warn!("database store unavailable ({}), using local files", e);
            }
        }
    }
    Ok(Box::new(LocalStore::new(
        &config.local_dir,
        config.retention_days,
    )?))
}
