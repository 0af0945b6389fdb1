//! JSON file store backend.
//!
//! Fallback when no database is configured or the database cannot be
//! opened. One latest file and one history file per scanner, under a
//! directory created on demand.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::{membership_hash, HistorySnapshot, ResultStore, StoreError};
use crate::domain::{sanitize_value, ScanOutcome, ScannerType};

pub struct LocalStore {
    dir: PathBuf,
    retention_days: u32,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(dir: P, retention_days: u32) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            retention_days,
        })
    }

    fn latest_path(&self, scanner: ScannerType) -> PathBuf {
        self.dir.join(format!("latest_{}.json", scanner.as_str()))
    }

    fn history_path(&self, scanner: ScannerType) -> PathBuf {
        self.dir.join(format!("history_{}.json", scanner.as_str()))
    }

    fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let value = sanitize_value(serde_json::to_value(value)?);
        // Write-then-rename so a crash mid-write never leaves a torn file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&value)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn read_history(&self, scanner: ScannerType) -> Result<Vec<HistorySnapshot>, StoreError> {
        let path = self.history_path(scanner);
        if !path.exists() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&fs::read(path)?)?)
    }
}

impl ResultStore for LocalStore {
    fn save(
        &self,
        scanner: ScannerType,
        scan_date: NaiveDate,
        outcome: &ScanOutcome,
    ) -> Result<(), StoreError> {
        let snapshot = HistorySnapshot {
            scanner,
            scan_date,
            hash: membership_hash(&outcome.symbols()),
            count: outcome.count(),
            outcome: outcome.clone(),
        };

        self.write_json(&self.latest_path(scanner), &snapshot)?;

        let cutoff = scan_date - chrono::Days::new(self.retention_days as u64);
        let mut history = self.read_history(scanner)?;
        history.retain(|s| s.scan_date != scan_date && s.scan_date >= cutoff);
        history.push(snapshot);
        history.sort_by_key(|s| s.scan_date);
        self.write_json(&self.history_path(scanner), &history)?;
        Ok(())
    }

    fn load_latest(&self, scanner: ScannerType) -> Result<Option<HistorySnapshot>, StoreError> {
        let path = self.latest_path(scanner);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&fs::read(path)?)?))
    }

    fn history(&self, scanner: ScannerType, days: u32) -> Result<Vec<HistorySnapshot>, StoreError> {
        let cutoff = chrono::Utc::now().date_naive() - chrono::Days::new(days as u64);
        let mut history = self.read_history(scanner)?;
        history.retain(|s| s.scan_date >= cutoff);
        history.sort_by_key(|s| s.scan_date);
        Ok(history)
    }
}
