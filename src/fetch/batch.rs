//! Batch Fetcher
//!
//! Fetches OHLCV series for a ticker set in chunked bulk requests, with a
//! serial per-ticker fallback when a chunk fails or comes back in an
//! ambiguous shape. Consults the on-disk series cache before going remote
//! and writes successful fetches back. The returned map contains only
//! tickers with valid data; absence of a key is the failure signal.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::cache::SeriesCache;
use crate::domain::Series;
use crate::fetch::retry::{retry_with_backoff, RetryPolicy};
use crate::ports::provider::{BarsProvider, Interval, Lookback, ProviderError};

/// Batch fetch tuning
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Chunk size for short lookbacks (cheap requests)
    pub chunk_size_short: usize,
    /// Chunk size for long lookbacks (expensive multi-year requests)
    pub chunk_size_long: usize,
    /// Lookbacks at or beyond this many days use the long chunk size
    pub long_lookback_days: u32,
    /// Throttle between chunks; skipped after the last chunk
    pub inter_chunk_delay: Duration,
    /// Quality floor: series shorter than this are dropped
    pub min_bars: usize,
    /// Timeout for each serial-fallback fetch
    pub single_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            chunk_size_short: 200,
            chunk_size_long: 25,
            long_lookback_days: 365,
            inter_chunk_delay: Duration::from_millis(250),
            min_bars: 20,
            single_timeout: Duration::from_secs(20),
            retry: RetryPolicy::default(),
        }
    }
}

/// Chunked bulk fetcher with cache read-through and per-ticker fallback
pub struct BatchFetcher<P: BarsProvider> {
    provider: Arc<P>,
    cache: Arc<SeriesCache>,
    config: FetchConfig,
}

impl<P: BarsProvider> BatchFetcher<P> {
    pub fn new(provider: Arc<P>, cache: Arc<SeriesCache>, config: FetchConfig) -> Self {
        Self {
            provider,
            cache,
            config,
        }
    }

    /// Bulk providers throttle proportionally to payload size and duration,
    /// so long lookbacks get small chunks and short lookbacks large ones.
    fn chunk_size(&self, lookback: Lookback) -> usize {
        if lookback.days >= self.config.long_lookback_days {
            self.config.chunk_size_long.max(1)
        } else {
            self.config.chunk_size_short.max(1)
        }
    }

    /// Fetch series for a ticker set. Input is deduplicated and sorted so
    /// the same logical set always processes in the same order. A ticker
    /// that cannot be fetched is omitted, never an error.
    pub async fn fetch(
        &self,
        tickers: &[String],
        lookback: Lookback,
        interval: Interval,
    ) -> HashMap<String, Series> {
        let ordered: Vec<String> = tickers
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut results: HashMap<String, Series> = HashMap::new();

        // Cache first; only misses go upstream
        let mut missing: Vec<String> = Vec::new();
        for symbol in &ordered {
            match self.cache.get(symbol, interval, self.config.min_bars) {
                Some(series) => {
                    results.insert(symbol.clone(), series);
                }
                None => missing.push(symbol.clone()),
            }
        }
        if !results.is_empty() {
            tracing::debug!(
                "Series cache served {}/{} tickers",
                results.len(),
                ordered.len()
            );
        }
        if missing.is_empty() {
            return results;
        }

        let chunk_size = self.chunk_size(lookback);
        let chunks: Vec<&[String]> = missing.chunks(chunk_size).collect();
        let total_chunks = chunks.len();

        for (idx, chunk) in chunks.into_iter().enumerate() {
            let fetched = self.fetch_chunk(chunk, lookback, interval).await;
            for (symbol, series) in fetched {
                if let Err(e) = self.cache.put(&symbol, interval, &series) {
                    tracing::warn!("Cache write-back failed for {}: {}", symbol, e);
                }
                results.insert(symbol, series);
            }

            // Backpressure against the provider, not a correctness mechanism
            if idx + 1 < total_chunks {
                tokio::time::sleep(self.config.inter_chunk_delay).await;
            }
        }

        results
    }

    /// One chunk: bulk request with retry, falling back to serial per-ticker
    /// fetches on failure or an untrustworthy response.
    async fn fetch_chunk(
        &self,
        chunk: &[String],
        lookback: Lookback,
        interval: Interval,
    ) -> HashMap<String, Series> {
        let bulk = retry_with_backoff(
            &self.config.retry,
            "bulk fetch",
            ProviderError::is_transient,
            || self.provider.fetch_bulk(chunk, lookback, interval),
        )
        .await;

        match bulk.and_then(|map| self.validate_bulk(chunk, map)) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(
                    "Bulk fetch failed for chunk of {} ({}), falling back to serial",
                    chunk.len(),
                    e
                );
                self.fetch_serial(chunk, lookback, interval).await
            }
        }
    }

    /// Reject bulk responses that cannot be trusted: stray keys (possible
    /// cross-chunk contamination) or an empty map for a non-empty request.
    /// Too-short series are dropped by the quality floor.
    fn validate_bulk(
        &self,
        chunk: &[String],
        map: HashMap<String, Series>,
    ) -> Result<HashMap<String, Series>, ProviderError> {
        let requested: BTreeSet<&str> = chunk.iter().map(String::as_str).collect();
        if let Some(stray) = map.keys().find(|k| !requested.contains(k.as_str())) {
            return Err(ProviderError::AmbiguousResponse(format!(
                "unrequested ticker {} in bulk response",
                stray
            )));
        }
        if map.is_empty() && !chunk.is_empty() {
            return Err(ProviderError::NoData("empty bulk response".into()));
        }

        Ok(map
            .into_iter()
            .filter(|(symbol, series)| {
                if series.len() < self.config.min_bars {
                    tracing::debug!(
                        "Dropping {}: {} bars below floor of {}",
                        symbol,
                        series.len(),
                        self.config.min_bars
                    );
                    false
                } else {
                    true
                }
            })
            .collect())
    }

    /// Serial fallback inside a failed chunk. Each ticker gets its own short
    /// timeout; a failing ticker is skipped, never propagated.
    async fn fetch_serial(
        &self,
        chunk: &[String],
        lookback: Lookback,
        interval: Interval,
    ) -> HashMap<String, Series> {
        let mut out = HashMap::new();
        for symbol in chunk {
            let attempt = timeout(
                self.config.single_timeout,
                self.provider.fetch_single(symbol, lookback, interval),
            )
            .await;

            match attempt {
                Ok(Ok(series)) if series.len() >= self.config.min_bars => {
                    out.insert(symbol.clone(), series);
                }
                Ok(Ok(series)) => {
                    tracing::debug!(
                        "Dropping {}: {} bars below floor of {}",
                        symbol,
                        series.len(),
                        self.config.min_bars
                    );
                }
                Ok(Err(e)) => {
                    tracing::debug!("Serial fetch failed for {}: {}", symbol, e);
                }
                Err(_) => {
                    tracing::debug!("Serial fetch timed out for {}", symbol);
                }
            }
        }
        out
    }
}
