//! Stage Scanner
//!
//! Weinstein trend-stage classification from the 150 and 200 day simple
//! moving averages. Output is categorical; the score carries the distance
//! above the 200 SMA so stronger names sort first within a stage.

use serde::Deserialize;

use super::indicators::sma_last;
use super::SeriesScorer;
use crate::domain::{ScanDetail, ScanResult, ScannerType, Series, TrendStage};
use crate::ports::Lookback;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub lookback_days: u32,
    pub min_bars: usize,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            lookback_days: 365,
            min_bars: 250,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StageScanner {
    config: StageConfig,
}

impl StageScanner {
    pub fn new(config: StageConfig) -> Self {
        Self { config }
    }

    fn classify(price: f64, sma_150: f64, sma_200: f64) -> (TrendStage, &'static str) {
        if price > sma_150 && price > sma_200 && sma_150 > sma_200 {
            (TrendStage::Advancing, "Above average")
        } else if price < sma_150 && price < sma_200 {
            (TrendStage::Declining, "Below average")
        } else if price > sma_150 && price > sma_200 {
            (TrendStage::Topping, "Neutral")
        } else {
            (TrendStage::Basing, "Below average")
        }
    }
}

impl SeriesScorer for StageScanner {
    fn scanner_type(&self) -> ScannerType {
        ScannerType::StageAnalysis
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
        let closes = series.closes();
        let price = series.last()?.close;
        let sma_150 = sma_last(&closes, 150)?;
        let sma_200 = sma_last(&closes, 200)?;

        let (stage, relative_strength) = Self::classify(price, sma_150, sma_200);

        Some(ScanResult {
            symbol: symbol.to_string(),
            price,
            score: (price - sma_200) / sma_200 * 100.0,
            rationale: format!("{}, price {:.1}% vs 200 SMA", stage.label(), (price - sma_200) / sma_200 * 100.0),
            detail: ScanDetail::Stage {
                stage,
                relative_strength: relative_strength.to_string(),
                action: stage.suggested_action().to_string(),
            },
        })
    }
}
