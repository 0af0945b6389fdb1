//! Scanners
//!
//! Five scanning strategies over the shared fetch/runner machinery. Four of
//! them are pure functions over an OHLCV series; the long-term scanner works
//! from per-ticker fundamentals instead. All thresholds live in
//! [`ScannersConfig`], loaded from the `[scanners.*]` config sections.

pub mod cyclical;
pub mod indicators;
pub mod long_term;
pub mod smart_money;
pub mod stage;
pub mod swing;

use serde::Deserialize;

use crate::domain::{ScanResult, ScannerType, Series};
use crate::ports::{Interval, Lookback};

pub use cyclical::{CyclicalConfig, CyclicalScanner};
pub use long_term::{LongTermConfig, LongTermScanner};
pub use smart_money::{SmartMoneyConfig, SmartMoneyScanner};
pub use stage::{StageConfig, StageScanner};
pub use swing::{SwingConfig, SwingScanner};

/// A scanner that scores one ticker from its price series.
///
/// `score` is pure: no I/O, no shared state, total over any series (it
/// declines with `None` rather than failing).
pub trait SeriesScorer: Send + Sync {
    fn scanner_type(&self) -> ScannerType;

    /// History depth this scanner needs fetched.
    fn lookback(&self) -> Lookback;

    fn interval(&self) -> Interval {
        Interval::Daily
    }

    /// Series shorter than this are declined before scoring.
    fn min_bars(&self) -> usize;

    fn score(&self, symbol: &str, series: &Series) -> Option<ScanResult>;
}

/// Threshold configuration for all scanners.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScannersConfig {
    pub swing: SwingConfig,
    pub smart_money: SmartMoneyConfig,
    pub long_term: LongTermConfig,
    pub cyclical: CyclicalConfig,
    pub stage: StageConfig,
}

/// Build the series scorer for a scanner type. The long-term scanner is
/// fundamentals-driven and has no series scorer; the pipeline routes it
/// through [`LongTermScanner`] instead.
pub fn series_scorer(
    scanner: ScannerType,
    config: &ScannersConfig,
) -> Option<Box<dyn SeriesScorer>> {
    match scanner {
        ScannerType::Swing => Some(Box::new(SwingScanner::new(config.swing.clone()))),
        ScannerType::SmartMoney => {
            Some(Box::new(SmartMoneyScanner::new(config.smart_money.clone())))
        }
        ScannerType::Cyclical => Some(Box::new(CyclicalScanner::new(config.cyclical.clone()))),
        ScannerType::StageAnalysis => Some(Box::new(StageScanner::new(config.stage.clone()))),
        ScannerType::LongTerm => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_series_scanner_has_a_scorer() {
        let config = ScannersConfig::default();
        for st in ScannerType::ALL {
            let scorer = series_scorer(st, &config);
            if st == ScannerType::LongTerm {
                assert!(scorer.is_none());
            } else {
                let scorer = scorer.unwrap();
                assert_eq!(scorer.scanner_type(), st);
                assert!(scorer.min_bars() > 0);
                assert!(scorer.lookback().days > 0);
            }
        }
    }
}
