//! Swing Scanner
//!
//! Momentum setups on a 15-20 day horizon: price above the 21 EMA, fast EMA
//! over slow, RSI confirming, and a volume spike against the 20-day average.
//! Targets and stops come off the 14-period ATR.

use serde::Deserialize;

use super::indicators::{atr_last, ema_last, rsi_last};
use super::SeriesScorer;
use crate::domain::{ScanDetail, ScanResult, ScannerType, Series};
use crate::ports::Lookback;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SwingConfig {
    pub lookback_days: u32,
    pub min_bars: usize,
    /// Penny-stock floor on the last close
    pub min_price: f64,
    pub min_rsi: f64,
    /// Required volume spike vs the 20-day average, in percent
    pub min_volume_spike_pct: f64,
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self {
            lookback_days: 60,
            min_bars: 50,
            min_price: 50.0,
            min_rsi: 50.0,
            min_volume_spike_pct: 50.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SwingScanner {
    config: SwingConfig,
}

impl SwingScanner {
    pub fn new(config: SwingConfig) -> Self {
        Self { config }
    }
}

impl SeriesScorer for SwingScanner {
    fn scanner_type(&self) -> ScannerType {
        ScannerType::Swing
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
        let last = series.last()?;
        let price = last.close;
        if price < self.config.min_price {
            return None;
        }

        let ema9 = ema_last(&closes, 9)?;
        let ema21 = ema_last(&closes, 21)?;
        let rsi = rsi_last(&closes, 14)?;
        if !(price > ema21 && ema9 > ema21 && rsi > self.config.min_rsi) {
            return None;
        }

        let avg_volume = series.mean_volume(20)?;
        if avg_volume <= 0.0 {
            return None;
        }
        let volume_spike = (last.volume as f64 - avg_volume) / avg_volume * 100.0;
        if volume_spike < self.config.min_volume_spike_pct {
            return None;
        }

        let atr = atr_last(series.bars(), 14).unwrap_or(price * 0.02);
        let target = price + 2.0 * atr;
        let stop_loss = price - 1.5 * atr;
        let expected_move = (target - price) / price * 100.0;

        let mut confidence: f64 = 50.0;
        confidence += if rsi > 60.0 { 20.0 } else { 10.0 };
        confidence += if volume_spike > 100.0 { 15.0 } else { 5.0 };
        confidence += if price > ema9 { 15.0 } else { 0.0 };
        let confidence = confidence.min(100.0);

        Some(ScanResult {
            symbol: symbol.to_string(),
            price,
            score: confidence,
            rationale: format!(
                "EMA alignment, RSI {:.1}, volume surge {:.0}%",
                rsi, volume_spike
            ),
            detail: ScanDetail::Swing {
                entry_low: price,
                entry_high: price * 1.02,
                target,
                stop_loss,
                rsi,
                volume_spike_pct: volume_spike,
                expected_move_pct: expected_move,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mocks::synthetic_series;
    use chrono::NaiveDate;

    use crate::domain::Bar;

    /// An uptrending series whose final bar carries an outsized volume.
    fn breakout_series() -> Series {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut bars = Vec::new();
        for i in 0..60u64 {
            let close = 100.0 + i as f64;
            let volume = if i == 59 { 50_000 } else { 10_000 };
            bars.push(Bar::new(
                start + chrono::Days::new(i),
                close - 0.5,
                close + 1.0,
                close - 1.0,
                close,
                volume,
            ));
        }
        Series::from_bars(bars).unwrap()
    }

    #[test]
    fn qualifying_breakout_scores() {
        let scanner = SwingScanner::new(SwingConfig::default());
        let result = scanner.score("RELIANCE", &breakout_series()).unwrap();

        assert_eq!(result.symbol, "RELIANCE");
        assert!(result.score >= 85.0, "score was {}", result.score);
        match result.detail {
            ScanDetail::Swing {
                target, stop_loss, ..
            } => {
                assert!(target > result.price);
                assert!(stop_loss < result.price);
            }
            _ => panic!("wrong detail variant"),
        }
    }

    #[test]
    fn confidence_is_capped_at_one_hundred() {
        // The fixture hits every confidence bonus: RSI above 60, a volume
        // spike above 100%, and price above the fast EMA.
        let scanner = SwingScanner::new(SwingConfig::default());
        let result = scanner.score("RELIANCE", &breakout_series()).unwrap();
        assert_eq!(result.score, 100.0);
    }

    #[test]
    fn declines_quiet_volume() {
        // Same trend but the last bar's volume matches the average.
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars: Vec<Bar> = (0..60u64)
            .map(|i| {
                let close = 100.0 + i as f64;
                Bar::new(
                    start + chrono::Days::new(i),
                    close,
                    close + 1.0,
                    close - 1.0,
                    close,
                    10_000,
                )
            })
            .collect();
        let series = Series::from_bars(bars).unwrap();
        assert!(SwingScanner::new(SwingConfig::default())
            .score("X", &series)
            .is_none());
    }

    #[test]
    fn declines_cheap_stock() {
        let mut config = SwingConfig::default();
        config.min_price = 1_000.0;
        assert!(SwingScanner::new(config)
            .score("X", &breakout_series())
            .is_none());
    }

    #[test]
    fn declines_short_series() {
        let series = synthetic_series(30, 100.0);
        assert!(SwingScanner::new(SwingConfig::default())
            .score("X", &series)
            .is_none());
    }
}
