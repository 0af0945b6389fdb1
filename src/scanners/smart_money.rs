//! Smart Money Scanner
//!
//! Classifies unusual volume behavior into institutional-activity patterns.
//! The first matching pattern wins, checked from strongest to weakest:
//! breakout, accumulation, absorption, re-accumulation, plain volume surge.

use serde::Deserialize;

use super::SeriesScorer;
use crate::domain::{ScanDetail, ScanResult, ScannerType, Series, SmcSignal};
use crate::ports::Lookback;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmartMoneyConfig {
    pub lookback_days: u32,
    pub min_bars: usize,
    /// Results scoring below this are dropped
    pub min_score: f64,
}

impl Default for SmartMoneyConfig {
    fn default() -> Self {
        Self {
            lookback_days: 60,
            min_bars: 50,
            min_score: 50.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmartMoneyScanner {
    config: SmartMoneyConfig,
}

impl SmartMoneyScanner {
    pub fn new(config: SmartMoneyConfig) -> Self {
        Self { config }
    }
}

fn strength_label(score: f64) -> &'static str {
    if score >= 75.0 {
        "Strong"
    } else if score >= 60.0 {
        "Moderate"
    } else {
        "Weak"
    }
}

impl SeriesScorer for SmartMoneyScanner {
    fn scanner_type(&self) -> ScannerType {
        ScannerType::SmartMoney
    }

    fn lookback(&self) -> Lookback {
        Lookback::days(self.config.lookback_days)
    }

    fn min_bars(&self) -> usize {
        self.config.min_bars
    }

    fn score(&self, symbol: &str, series: &Series) -> Option<ScanResult> {
        if series.len() < self.config.min_bars {
            return None;
        }
        let bars = series.bars();
        let last = series.last()?;
        let price = last.close;

        let avg_volume_20 = series.mean_volume(20)?;
        let avg_volume_50 = series.mean_volume(50)?;
        let current_volume = last.volume as f64;
        let prev_volume = bars[bars.len() - 2].volume as f64;

        let volume_spike_20 = if avg_volume_20 > 0.0 {
            (current_volume - avg_volume_20) / avg_volume_20 * 100.0
        } else {
            0.0
        };
        let volume_surge = if prev_volume > 0.0 {
            (current_volume - prev_volume) / prev_volume * 100.0
        } else {
            0.0
        };

        // Change over the last 5 and 10 sessions inclusive.
        let change_5d = series.pct_change(4)?;
        let change_10d = series.pct_change(9)?;

        let (signal, note, raw_score) = if volume_spike_20 >= 30.0 && change_5d > 1.0 {
            (
                SmcSignal::Breakout,
                "Strong volume with upward price momentum",
                60.0 + volume_spike_20 / 2.0 + change_5d * 5.0,
            )
        } else if avg_volume_20 > avg_volume_50 * 1.2 && change_5d.abs() < 2.0 {
            (
                SmcSignal::Accumulation,
                "Consistent high volume with price consolidation",
                55.0 + (avg_volume_20 / avg_volume_50 - 1.0) * 50.0,
            )
        } else if volume_spike_20 >= 20.0 && change_5d >= -1.0 {
            (
                SmcSignal::Absorption,
                "High volume supporting price levels",
                50.0 + volume_spike_20 / 2.0,
            )
        } else if volume_spike_20 >= 25.0 && change_10d < 0.0 && change_5d > 0.0 {
            (
                SmcSignal::Reaccumulation,
                "Volume surge after pullback, potential reversal",
                55.0 + volume_spike_20 / 2.0 + change_10d.abs() * 2.0,
            )
        } else if volume_spike_20 >= 20.0 || volume_surge >= 50.0 {
            (
                SmcSignal::VolumeSurge,
                "Unusual volume activity detected",
                45.0 + volume_spike_20.max(volume_surge) / 2.0,
            )
        } else {
            return None;
        };

        let score = raw_score.min(100.0);
        if score < self.config.min_score {
            return None;
        }

        let delivery_pct = (volume_spike_20 * 0.7).clamp(0.0, 100.0);

        Some(ScanResult {
            symbol: symbol.to_string(),
            price,
            score,
            rationale: format!("{} - {}", signal.as_str(), note),
            detail: ScanDetail::SmartMoney {
                signal,
                volume_spike_pct: volume_spike_20,
                delivery_pct,
                strength: strength_label(score).to_string(),
            },
        })
    }
}
