//! OHLCV Bars and Series
//!
//! One `Bar` is a single open/high/low/close/volume observation for a fixed
//! time bucket. A `Series` is the time-ordered sequence of bars for one
//! ticker, with strictly increasing timestamps.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One OHLCV observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// A bar is usable only if its prices are finite and positive
    pub fn is_valid(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|p| p.is_finite() && *p > 0.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SeriesError {
    #[error("Bar for {date} is out of order (last bar is {last})")]
    OutOfOrder { date: NaiveDate, last: NaiveDate },

    #[error("Duplicate bar for {0}")]
    Duplicate(NaiveDate),
}

/// Time-ordered, gap-tolerant sequence of bars for one ticker.
///
/// Invariant: timestamps strictly increasing, no duplicates. Gaps (holidays,
/// halts) are fine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Series {
    bars: Vec<Bar>,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from bars, dropping invalid bars and rejecting
    /// out-of-order input.
    pub fn from_bars(bars: Vec<Bar>) -> Result<Self, SeriesError> {
        let mut series = Self::new();
        for bar in bars.into_iter().filter(Bar::is_valid) {
            series.push(bar)?;
        }
        Ok(series)
    }

    /// Append a bar, enforcing the ordering invariant.
    pub fn push(&mut self, bar: Bar) -> Result<(), SeriesError> {
        if let Some(last) = self.bars.last() {
            if bar.date == last.date {
                return Err(SeriesError::Duplicate(bar.date));
            }
            if bar.date < last.date {
                return Err(SeriesError::OutOfOrder {
                    date: bar.date,
                    last: last.date,
                });
            }
        }
        self.bars.push(bar);
        Ok(())
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Closing prices in time order
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Mean volume over the trailing `n` bars
    pub fn mean_volume(&self, n: usize) -> Option<f64> {
        if self.bars.is_empty() {
            return None;
        }
        let tail = &self.bars[self.bars.len().saturating_sub(n)..];
        Some(tail.iter().map(|b| b.volume as f64).sum::<f64>() / tail.len() as f64)
    }

    /// Percent change between the closes `n` bars apart (last vs last-n)
    pub fn pct_change(&self, n: usize) -> Option<f64> {
        if self.bars.len() <= n {
            return None;
        }
        let last = self.bars[self.bars.len() - 1].close;
        let prev = self.bars[self.bars.len() - 1 - n].close;
        if prev == 0.0 {
            return None;
        }
        Some((last - prev) / prev * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn bar(d: u32, close: f64) -> Bar {
        Bar::new(day(d), close, close * 1.01, close * 0.99, close, 1000)
    }

    #[test]
    fn push_keeps_order() {
        let mut s = Series::new();
        s.push(bar(1, 100.0)).unwrap();
        s.push(bar(3, 101.0)).unwrap();
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn push_rejects_duplicate() {
        let mut s = Series::new();
        s.push(bar(1, 100.0)).unwrap();
        let err = s.push(bar(1, 101.0)).unwrap_err();
        assert_eq!(err, SeriesError::Duplicate(day(1)));
    }

    #[test]
    fn push_rejects_out_of_order() {
        let mut s = Series::new();
        s.push(bar(5, 100.0)).unwrap();
        assert!(matches!(
            s.push(bar(2, 101.0)),
            Err(SeriesError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn from_bars_drops_invalid() {
        let mut bad = bar(2, 100.0);
        bad.close = f64::NAN;
        let s = Series::from_bars(vec![bar(1, 100.0), bad, bar(3, 102.0)]).unwrap();
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn pct_change_over_window() {
        let s = Series::from_bars(vec![bar(1, 100.0), bar(2, 105.0), bar(3, 110.0)]).unwrap();
        let chg = s.pct_change(2).unwrap();
        assert!((chg - 10.0).abs() < 1e-9);
        assert!(s.pct_change(5).is_none());
    }

    #[test]
    fn mean_volume_tail() {
        let s = Series::from_bars(vec![bar(1, 100.0), bar(2, 100.0)]).unwrap();
        assert_eq!(s.mean_volume(20), Some(1000.0));
        assert!(Series::new().mean_volume(5).is_none());
    }
}
