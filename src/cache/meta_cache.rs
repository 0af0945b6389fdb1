//! Ticker Metadata Cache
//!
//! On-disk store of per-ticker fundamentals metadata, one JSON file per
//! ticker. Fundamentals move slowly, so the default TTL is a day rather
//! than the hours used for price series. Lookups go through `get_or_fetch`,
//! which consults the cache before touching the provider and writes back
//! successful fetches; provider errors are never cached.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::series_cache::CacheError;
use crate::ports::provider::{BarsProvider, ProviderError, TickerMeta};

#[derive(Debug, Serialize, Deserialize)]
struct CachedMeta {
    fetched_at: DateTime<Utc>,
    meta: TickerMeta,
}

/// Keyed on-disk cache of ticker metadata with a freshness TTL
#[derive(Debug)]
pub struct MetaCache {
    dir: PathBuf,
    ttl: Duration,
}

impl MetaCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    fn entry_path(&self, symbol: &str) -> PathBuf {
        // Symbols may carry characters unsuitable for file names (e.g. "M&M")
        let safe: String = symbol
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}_meta.json", safe))
    }

    /// Look up a fresh entry. Stale or corrupt entries are misses.
    pub fn get(&self, symbol: &str) -> Option<TickerMeta> {
        let path = self.entry_path(symbol);
        let entry = match self.read_entry(&path) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!("Meta cache read failed for {}: {}", symbol, e);
                return None;
            }
        };

        let age = Utc::now().signed_duration_since(entry.fetched_at);
        if age.num_seconds() < 0 || age.num_seconds() as u64 >= self.ttl.as_secs() {
            return None;
        }
        Some(entry.meta)
    }

    /// Write back freshly fetched metadata.
    pub fn put(&self, symbol: &str, meta: &TickerMeta) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let entry = CachedMeta {
            fetched_at: Utc::now(),
            meta: meta.clone(),
        };
        fs::write(self.entry_path(symbol), serde_json::to_vec(&entry)?)?;
        Ok(())
    }

    /// Cached metadata when fresh, otherwise one provider call with
    /// write-back. Errors pass through uncached so the next caller retries.
    pub async fn get_or_fetch<P: BarsProvider + ?Sized>(
        &self,
        provider: &P,
        symbol: &str,
    ) -> Result<TickerMeta, ProviderError> {
        if let Some(meta) = self.get(symbol) {
            return Ok(meta);
        }
        let meta = provider.fetch_meta(symbol).await?;
        if let Err(e) = self.put(symbol, &meta) {
            tracing::debug!("Meta cache write failed for {}: {}", symbol, e);
        }
        Ok(meta)
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

    fn read_entry(&self, path: &Path) -> Result<Option<CachedMeta>, CacheError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}
