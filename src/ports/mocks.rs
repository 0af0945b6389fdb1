//! Scripted mock implementations of the ports for tests.
//!
//! The mock provider records calls and serves canned series, and can be
//! scripted to fail bulk requests, return ambiguous shapes, inject stray
//! keys, or stall individual tickers to exercise fallback and timeout paths.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{Bar, Series};
use crate::ports::provider::{BarsProvider, Interval, Lookback, ProviderError, TickerMeta};

/// Build a valid daily series of `n` bars ending near `base_price`
pub fn synthetic_series(n: usize, base_price: f64) -> Series {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let mut series = Series::new();
    for i in 0..n {
        let date = start + chrono::Duration::days(i as i64);
        let drift = (i as f64 / n.max(1) as f64) * 0.1 * base_price;
        let close = base_price * 0.9 + drift;
        let bar = Bar::new(date, close * 0.995, close * 1.01, close * 0.99, close, 100_000);
        series.push(bar).expect("synthetic bars are ordered");
    }
    series
}

/// Mock bars provider with scripted behavior and call recording
#[derive(Default)]
pub struct MockBarsProvider {
    series: HashMap<String, Series>,
    meta: HashMap<String, TickerMeta>,
    /// Fail this many bulk calls before succeeding
    bulk_failures: Mutex<u32>,
    /// Every bulk call returns an ambiguous-shape error
    always_ambiguous: bool,
    /// Tickers whose single fetch always errors
    failing_singles: HashSet<String>,
    /// Tickers whose single fetch stalls (to trigger caller timeouts)
    slow_singles: HashMap<String, Duration>,
    /// Stray key injected into bulk responses (cross-contamination probe)
    stray_bulk_key: Option<String>,
    bulk_calls: Mutex<Vec<Vec<String>>>,
    single_calls: Mutex<Vec<String>>,
    meta_calls: Mutex<Vec<String>>,
}

impl MockBarsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, symbol: &str, series: Series) -> Self {
        self.series.insert(symbol.to_string(), series);
        self
    }

    pub fn with_bars(self, symbol: &str, n: usize, base_price: f64) -> Self {
        self.with_series(symbol, synthetic_series(n, base_price))
    }

    pub fn with_meta(mut self, symbol: &str, meta: TickerMeta) -> Self {
        self.meta.insert(symbol.to_string(), meta);
        self
    }

    /// Fail the first `n` bulk calls with a transient HTTP error
    pub fn failing_bulk(self, n: u32) -> Self {
        *self.bulk_failures.lock().unwrap() = n;
        self
    }

    pub fn with_ambiguous_bulk(mut self) -> Self {
        self.always_ambiguous = true;
        self
    }

    pub fn with_failing_single(mut self, symbol: &str) -> Self {
        self.failing_singles.insert(symbol.to_string());
        self
    }

    pub fn with_slow_single(mut self, symbol: &str, delay: Duration) -> Self {
        self.slow_singles.insert(symbol.to_string(), delay);
        self
    }

    pub fn with_stray_bulk_key(mut self, symbol: &str) -> Self {
        self.stray_bulk_key = Some(symbol.to_string());
        self
    }

    pub fn bulk_calls(&self) -> Vec<Vec<String>> {
        self.bulk_calls.lock().unwrap().clone()
    }

    pub fn single_calls(&self) -> Vec<String> {
        self.single_calls.lock().unwrap().clone()
    }

    pub fn meta_calls(&self) -> Vec<String> {
        self.meta_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BarsProvider for MockBarsProvider {
    async fn fetch_bulk(
        &self,
        tickers: &[String],
        _lookback: Lookback,
        _interval: Interval,
    ) -> Result<HashMap<String, Series>, ProviderError> {
        self.bulk_calls.lock().unwrap().push(tickers.to_vec());

        {
            let mut failures = self.bulk_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(ProviderError::Http("scripted bulk failure".into()));
            }
        }
        if self.always_ambiguous {
            return Err(ProviderError::AmbiguousResponse(
                "scripted single-ticker shape".into(),
            ));
        }

        let mut out = HashMap::new();
        for ticker in tickers {
            if let Some(series) = self.series.get(ticker) {
                out.insert(ticker.clone(), series.clone());
            }
        }
        if let Some(stray) = &self.stray_bulk_key {
            out.insert(stray.clone(), synthetic_series(60, 10.0));
        }
        Ok(out)
    }

    async fn fetch_single(
        &self,
        ticker: &str,
        _lookback: Lookback,
        _interval: Interval,
    ) -> Result<Series, ProviderError> {
        self.single_calls.lock().unwrap().push(ticker.to_string());

        if let Some(delay) = self.slow_singles.get(ticker) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_singles.contains(ticker) {
            return Err(ProviderError::Http("scripted single failure".into()));
        }
        self.series
            .get(ticker)
            .cloned()
            .ok_or_else(|| ProviderError::NoData(ticker.to_string()))
    }

    async fn fetch_meta(&self, ticker: &str) -> Result<TickerMeta, ProviderError> {
        self.meta_calls.lock().unwrap().push(ticker.to_string());
        self.meta
            .get(ticker)
            .cloned()
            .ok_or_else(|| ProviderError::NoData(ticker.to_string()))
    }
}

/// Universe source backed by a fixed list
pub struct StaticUniverse {
    tickers: Vec<String>,
}

impl StaticUniverse {
    pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(tickers: I) -> Self {
        Self {
            tickers: tickers.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl crate::ports::universe::UniverseSource for StaticUniverse {
    async fn tickers(&self) -> Result<Vec<String>, crate::ports::universe::UniverseError> {
        Ok(self.tickers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_serves_and_records() {
        let provider = MockBarsProvider::new().with_bars("AAA", 60, 100.0);
        let got = provider
            .fetch_bulk(&["AAA".into(), "BBB".into()], Lookback::days(60), Interval::Daily)
            .await
            .unwrap();
        assert!(got.contains_key("AAA"));
        assert!(!got.contains_key("BBB"));
        assert_eq!(provider.bulk_calls().len(), 1);
    }

    #[tokio::test]
    async fn scripted_bulk_failures_run_out() {
        let provider = MockBarsProvider::new().with_bars("AAA", 60, 100.0).failing_bulk(1);
        let first = provider
            .fetch_bulk(&["AAA".into()], Lookback::days(60), Interval::Daily)
            .await;
        assert!(first.is_err());
        let second = provider
            .fetch_bulk(&["AAA".into()], Lookback::days(60), Interval::Daily)
            .await;
        assert!(second.is_ok());
    }

    #[test]
    fn synthetic_series_is_valid() {
        let series = synthetic_series(100, 250.0);
        assert_eq!(series.len(), 100);
        assert!(series.bars().iter().all(Bar::is_valid));
    }
}
