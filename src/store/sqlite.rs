//! SQLite store backend.
//!
//! Two tables: `latest_results` keyed by scanner, and `scanner_history`
//! keyed by scanner and date. Payloads are sanitized JSON, so a row written
//! from a run with non-finite intermediate values still parses back.

use std::sync::Mutex;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use super::{membership_hash, HistorySnapshot, ResultStore, StoreError};
use crate::domain::{sanitize_value, ScanOutcome, ScannerType};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS latest_results (
    scanner   TEXT PRIMARY KEY,
    scan_date TEXT NOT NULL,
    hash      TEXT NOT NULL,
    count     INTEGER NOT NULL,
    payload   TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS scanner_history (
    scanner   TEXT NOT NULL,
    scan_date TEXT NOT NULL,
    hash      TEXT NOT NULL,
    count     INTEGER NOT NULL,
    payload   TEXT NOT NULL,
    PRIMARY KEY (scanner, scan_date)
);
";

pub struct SqliteStore {
    conn: Mutex<Connection>,
    retention_days: u32,
}

impl SqliteStore {
    /// Open (or create) the database at `url`. Accepts a bare filesystem
    /// path or a `sqlite://` URL.
    pub fn open(url: &str, retention_days: u32) -> Result<Self, StoreError> {
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            retention_days,
        })
    }

    fn payload_json(outcome: &ScanOutcome) -> Result<String, StoreError> {
        let value = sanitize_value(serde_json::to_value(outcome)?);
        Ok(serde_json::to_string(&value)?)
    }

    fn row_to_snapshot(
        scanner: ScannerType,
        scan_date: String,
        hash: String,
        count: usize,
        payload: String,
    ) -> Result<HistorySnapshot, StoreError> {
        let scan_date = scan_date
            .parse::<NaiveDate>()
            .map_err(|e| StoreError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        Ok(HistorySnapshot {
            scanner,
            scan_date,
            hash,
            count,
            outcome: serde_json::from_str(&payload)?,
        })
    }
}

impl ResultStore for SqliteStore {
    fn save(
        &self,
        scanner: ScannerType,
        scan_date: NaiveDate,
        outcome: &ScanOutcome,
    ) -> Result<(), StoreError> {
        let hash = membership_hash(&outcome.symbols());
        let count = outcome.count();
        let payload = Self::payload_json(outcome)?;
        let date_str = scan_date.to_string();
        let cutoff = (scan_date - chrono::Days::new(self.retention_days as u64)).to_string();

        let conn = self.conn.lock().expect("store mutex poisoned");
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO latest_results (scanner, scan_date, hash, count, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(scanner) DO UPDATE SET
                 scan_date = excluded.scan_date,
                 hash = excluded.hash,
                 count = excluded.count,
                 payload = excluded.payload",
            params![scanner.as_str(), date_str, hash, count, payload],
        )?;
        tx.execute(
            "INSERT INTO scanner_history (scanner, scan_date, hash, count, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(scanner, scan_date) DO UPDATE SET
                 hash = excluded.hash,
                 count = excluded.count,
                 payload = excluded.payload",
            params![scanner.as_str(), date_str, hash, count, payload],
        )?;
        let pruned = tx.execute(
            "DELETE FROM scanner_history WHERE scanner = ?1 AND scan_date < ?2",
            params![scanner.as_str(), cutoff],
        )?;
        tx.commit()?;

        if pruned > 0 {
            tracing::debug!("pruned {} {} snapshots past retention", pruned, scanner);
        }
        Ok(())
    }

    fn load_latest(&self, scanner: ScannerType) -> Result<Option<HistorySnapshot>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let row = conn
            .query_row(
                "SELECT scan_date, hash, count, payload FROM latest_results WHERE scanner = ?1",
                params![scanner.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, usize>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(date, hash, count, payload)| {
            Self::row_to_snapshot(scanner, date, hash, count, payload)
        })
        .transpose()
    }

    fn history(&self, scanner: ScannerType, days: u32) -> Result<Vec<HistorySnapshot>, StoreError> {
        let cutoff = (chrono::Utc::now().date_naive() - chrono::Days::new(days as u64)).to_string();
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT scan_date, hash, count, payload FROM scanner_history
             WHERE scanner = ?1 AND scan_date >= ?2
             ORDER BY scan_date ASC",
        )?;
        let rows = stmt.query_map(params![scanner.as_str(), cutoff], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, usize>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut snapshots = Vec::new();
        for row in rows {
            let (date, hash, count, payload) = row?;
            snapshots.push(Self::row_to_snapshot(scanner, date, hash, count, payload)?);
        }
        Ok(snapshots)
    }
}
