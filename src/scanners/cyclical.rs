//! Cyclical Scanner
//!
//! Finds seasonal quarterly performers in a decade of daily history. For
//! each calendar quarter it computes the per-year return from the first to
//! the last close inside that quarter, then keeps the quarter with the best
//! average return among those clearing the win-rate and return floors.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Deserialize;

use super::SeriesScorer;
use crate::domain::{Quarter, ScanDetail, ScanResult, ScannerType, Series};
use crate::ports::Lookback;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CyclicalConfig {
    pub lookback_years: u32,
    pub min_bars: usize,
    /// Fraction of observed years the quarter must close positive
    pub min_win_rate: f64,
    /// Floor on the quarter's average return, in percent
    pub min_avg_return_pct: f64,
}

impl Default for CyclicalConfig {
    fn default() -> Self {
        Self {
            lookback_years: 10,
            min_bars: 120,
            min_win_rate: 0.60,
            min_avg_return_pct: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CyclicalScanner {
    config: CyclicalConfig,
}

impl CyclicalScanner {
    pub fn new(config: CyclicalConfig) -> Self {
        Self { config }
    }

    /// Per-year quarter returns, keyed by quarter.
    fn quarterly_returns(series: &Series) -> BTreeMap<Quarter, Vec<f64>> {
        // (year, quarter) -> (first close, last close). Bars are in time
        // order, so the first insert fixes the open and later ones roll the
        // close forward.
        let mut spans: BTreeMap<(i32, Quarter), (f64, f64)> = BTreeMap::new();
        for bar in series.bars() {
            let key = (bar.date.year(), Quarter::from_month(bar.date.month()));
            spans
                .entry(key)
                .and_modify(|(_, last)| *last = bar.close)
                .or_insert((bar.close, bar.close));
        }

        let mut returns: BTreeMap<Quarter, Vec<f64>> = BTreeMap::new();
        for ((_, quarter), (first, last)) in spans {
            if first > 0.0 {
                returns
                    .entry(quarter)
                    .or_default()
                    .push((last - first) / first * 100.0);
            }
        }
        returns
    }
}

impl SeriesScorer for CyclicalScanner {
    fn scanner_type(&self) -> ScannerType {
        ScannerType::Cyclical
    }

    fn lookback(&self) -> Lookback {
        Lookback::years(self.config.lookback_years)
    }

    fn min_bars(&self) -> usize {
        self.config.min_bars
    }

    fn score(&self, symbol: &str, series: &Series) -> Option<ScanResult> {
        if series.len() < self.config.min_bars {
            return None;
        }
        let price = series.last()?.close;

        let mut best: Option<(Quarter, f64, f64)> = None;
        for (quarter, returns) in Self::quarterly_returns(series) {
            if returns.is_empty() {
                continue;
            }
            let avg = returns.iter().sum::<f64>() / returns.len() as f64;
            let wins = returns.iter().filter(|r| **r > 0.0).count();
            let win_rate = wins as f64 / returns.len() as f64;

            if avg < self.config.min_avg_return_pct || win_rate < self.config.min_win_rate {
                continue;
            }
            if best.is_none_or(|(_, best_avg, _)| avg > best_avg) {
                best = Some((quarter, avg, win_rate));
            }
        }

        let (quarter, avg_return, win_rate) = best?;
        Some(ScanResult {
            symbol: symbol.to_string(),
            price,
            score: win_rate * 100.0 + avg_return,
            rationale: format!(
                "{} positive {:.0}% of years, avg {:.1}%",
                quarter.as_str(),
                win_rate * 100.0,
                avg_return
            ),
            detail: ScanDetail::Cyclical {
                quarter,
                win_rate_pct: win_rate * 100.0,
                avg_return_pct: avg_return,
            },
        })
    }
}
