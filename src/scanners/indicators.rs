//! Indicator math shared by the scanners.
//!
//! Everything here is a pure function over slices and returns the latest
//! value only; scanners never need full indicator series.

use crate::domain::Bar;

/// Simple moving average of the trailing `n` values.
pub fn sma_last(values: &[f64], n: usize) -> Option<f64> {
    if n == 0 || values.len() < n {
        return None;
    }
    let tail = &values[values.len() - n..];
    Some(tail.iter().sum::<f64>() / n as f64)
}

/// Exponential moving average, seeded with the SMA of the first `n` values.
pub fn ema_last(values: &[f64], n: usize) -> Option<f64> {
    if n == 0 || values.len() < n {
        return None;
    }
    let alpha = 2.0 / (n as f64 + 1.0);
    let mut ema = values[..n].iter().sum::<f64>() / n as f64;
    for v in &values[n..] {
        ema = alpha * v + (1.0 - alpha) * ema;
    }
    Some(ema)
}

/// Wilder-smoothed RSI over closing prices.
///
/// Returns 100 when the window has no losses and 50 when it is perfectly
/// flat (no gains and no losses).
pub fn rsi_last(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for w in closes[..period + 1].windows(2) {
        let diff = w[1] - w[0];
        if diff > 0.0 {
            avg_gain += diff;
        } else {
            avg_loss += -diff;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    for w in closes[period..].windows(2) {
        let diff = w[1] - w[0];
        let (gain, loss) = if diff > 0.0 { (diff, 0.0) } else { (0.0, -diff) };
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Wilder-smoothed average true range.
pub fn atr_last(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }

    let true_range = |prev: &Bar, cur: &Bar| -> f64 {
        let hl = cur.high - cur.low;
        let hc = (cur.high - prev.close).abs();
        let lc = (cur.low - prev.close).abs();
        hl.max(hc).max(lc)
    };

    let mut atr = bars[..period + 1]
        .windows(2)
        .map(|w| true_range(&w[0], &w[1]))
        .sum::<f64>()
        / period as f64;

    for w in bars[period..].windows(2) {
        let tr = true_range(&w[0], &w[1]);
        atr = (atr * (period as f64 - 1.0) + tr) / period as f64;
    }
    Some(atr)
}
