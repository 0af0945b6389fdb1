//! Time Series Cache
//!
//! On-disk store of fetched OHLCV series, one JSON file per
//! (ticker, interval). The batch fetcher reads through this cache before any
//! remote call and writes back successful fetches. Entries expire by TTL;
//! expired files are simply treated as misses and overwritten on the next
//! write, there is no compaction schedule.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Series;
use crate::ports::provider::Interval;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache entry is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedSeries {
    fetched_at: DateTime<Utc>,
    interval: String,
    series: Series,
}

/// Keyed on-disk cache of OHLCV series with a freshness TTL
#[derive(Debug)]
pub struct SeriesCache {
    dir: PathBuf,
    ttl: Duration,
}

impl SeriesCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    fn entry_path(&self, symbol: &str, interval: Interval) -> PathBuf {
        // Symbols may carry characters unsuitable for file names (e.g. "M&M")
        let safe: String = symbol
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}_{}.json", safe, interval.as_str()))
    }

    /// Look up a fresh entry with at least `min_bars` bars. Stale, corrupt,
    /// or too-short entries are misses.
    pub fn get(&self, symbol: &str, interval: Interval, min_bars: usize) -> Option<Series> {
        let path = self.entry_path(symbol, interval);
        let entry = match self.read_entry(&path) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!("Cache read failed for {}: {}", symbol, e);
                return None;
            }
        };

        let age = Utc::now().signed_duration_since(entry.fetched_at);
        if age.num_seconds() < 0 || age.num_seconds() as u64 >= self.ttl.as_secs() {
            return None;
        }
        if entry.series.len() < min_bars {
            return None;
        }
        Some(entry.series)
    }

    /// Write back a freshly fetched series.
    pub fn put(&self, symbol: &str, interval: Interval, series: &Series) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let entry = CachedSeries {
            fetched_at: Utc::now(),
            interval: interval.as_str().to_string(),
            series: series.clone(),
        };
        let path = self.entry_path(symbol, interval);
        fs::write(&path, serde_json::to_vec(&entry)?)?;
        Ok(())
    }

    /// Number of entry files on disk (fresh or stale)
    pub fn entry_count(&self) -> usize {
        fs::read_dir(&self.dir)
            .map(|rd| {
                rd.filter_map(Result::ok)
                    .filter(|e| e.path().extension().is_some_and(|x| x == "json"))
                    .count()
            })
            .unwrap_or(0)
    }

    fn read_entry(&self, path: &Path) -> Result<Option<CachedSeries>, CacheError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mocks::synthetic_series;
    use tempfile::tempdir;

    #[test]
    fn put_then_get_round_trip() {
        let dir = tempdir().unwrap();
        let cache = SeriesCache::new(dir.path(), Duration::from_secs(3600));
        let series = synthetic_series(60, 100.0);

        cache.put("TCS", Interval::Daily, &series).unwrap();
        let hit = cache.get("TCS", Interval::Daily, 50).unwrap();
        assert_eq!(hit.len(), 60);
    }

    #[test]
    fn short_entry_is_a_miss() {
        let dir = tempdir().unwrap();
        let cache = SeriesCache::new(dir.path(), Duration::from_secs(3600));
        cache.put("TCS", Interval::Daily, &synthetic_series(10, 100.0)).unwrap();
        assert!(cache.get("TCS", Interval::Daily, 50).is_none());
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let dir = tempdir().unwrap();
        let cache = SeriesCache::new(dir.path(), Duration::from_secs(0));
        cache.put("TCS", Interval::Daily, &synthetic_series(60, 100.0)).unwrap();
        assert!(cache.get("TCS", Interval::Daily, 50).is_none());
    }

    #[test]
    fn intervals_do_not_collide() {
        let dir = tempdir().unwrap();
        let cache = SeriesCache::new(dir.path(), Duration::from_secs(3600));
        cache.put("TCS", Interval::Daily, &synthetic_series(60, 100.0)).unwrap();
        assert!(cache.get("TCS", Interval::Hourly, 10).is_none());
        assert_eq!(cache.entry_count(), 1);
    }

    #[test]
    fn awkward_symbols_get_safe_paths() {
        let dir = tempdir().unwrap();
        let cache = SeriesCache::new(dir.path(), Duration::from_secs(3600));
        cache.put("M&M", Interval::Daily, &synthetic_series(60, 100.0)).unwrap();
        assert!(cache.get("M&M", Interval::Daily, 50).is_some());
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let dir = tempdir().unwrap();
        let cache = SeriesCache::new(dir.path(), Duration::from_secs(3600));
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(dir.path().join("TCS_1d.json"), "{ not json").unwrap();
        assert!(cache.get("TCS", Interval::Daily, 1).is_none());
    }
}
