//! Long-Term Scanner
//!
//! Fundamentals-driven scoring over per-ticker metadata rather than price
//! history. Missing fields earn partial credit instead of disqualifying the
//! stock, so patchy provider data still produces a usable ranking.

use serde::Deserialize;

use crate::domain::{ScanDetail, ScanResult, ScannerType};
use crate::ports::TickerMeta;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LongTermConfig {
    /// Hard floor on market cap, in the listing currency
    pub min_market_cap: f64,
    /// Minimum composite score unless two or more criteria are met outright
    pub min_score: f64,
}

impl Default for LongTermConfig {
    fn default() -> Self {
        Self {
            min_market_cap: 2_000_000_000.0,
            min_score: 40.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LongTermScanner {
    config: LongTermConfig,
}

impl LongTermScanner {
    pub fn new(config: LongTermConfig) -> Self {
        Self { config }
    }

    pub fn scanner_type(&self) -> ScannerType {
        ScannerType::LongTerm
    }

    pub fn score(&self, meta: &TickerMeta) -> Option<ScanResult> {
        let market_cap = meta.market_cap?;
        if market_cap < self.config.min_market_cap {
            return None;
        }

        // Debt-to-equity sometimes arrives as a percentage.
        let debt_eq = meta.debt_to_equity.map(|d| if d > 100.0 { d / 100.0 } else { d });

        let mut score = 0.0;
        let mut criteria_met = 0u32;

        match meta.revenue_growth {
            Some(g) if g >= 0.20 => {
                score += 30.0;
                criteria_met += 1;
            }
            Some(g) if g >= 0.10 => {
                score += 20.0;
                criteria_met += 1;
            }
            Some(g) if g >= 0.05 => score += 10.0,
            Some(_) => {}
            None => score += 5.0,
        }

        match meta.roe {
            Some(r) if r >= 0.20 => {
                score += 30.0;
                criteria_met += 1;
            }
            Some(r) if r >= 0.15 => {
                score += 20.0;
                criteria_met += 1;
            }
            Some(r) if r >= 0.10 => score += 10.0,
            Some(_) => {}
            None => score += 5.0,
        }

        match debt_eq {
            Some(d) if d <= 0.3 => {
                score += 20.0;
                criteria_met += 1;
            }
            Some(d) if d <= 0.5 => score += 15.0,
            Some(d) if d <= 1.0 => score += 10.0,
            Some(d) if d <= 2.0 => score += 5.0,
            Some(_) => {}
            None => score += 10.0,
        }

        if market_cap >= 10_000_000_000.0 {
            score += 20.0;
        } else if market_cap >= 5_000_000_000.0 {
            score += 15.0;
        } else {
            score += 10.0;
        }

        if score < self.config.min_score && criteria_met < 2 {
            return None;
        }

        let mut thesis_parts = Vec::new();
        if let Some(g) = meta.revenue_growth.filter(|g| *g > 0.0) {
            thesis_parts.push(format!("{:.1}% revenue growth", g * 100.0));
        }
        if let Some(r) = meta.roe.filter(|r| *r > 0.0) {
            thesis_parts.push(format!("{:.1}% ROE", r * 100.0));
        }
        if debt_eq.is_some_and(|d| d < 1.0) {
            thesis_parts.push("low debt".to_string());
        }
        let rationale = if thesis_parts.is_empty() {
            "Fundamentally sound company with growth potential.".to_string()
        } else {
            format!("Strong fundamentals: {}.", thesis_parts.join(", "))
        };

        Some(ScanResult {
            symbol: meta.symbol.clone(),
            // Fundamentals metadata carries no quote; the pipeline reports
            // market cap scale rather than a price for this scanner.
            price: 0.0,
            score,
            rationale,
            detail: ScanDetail::LongTerm {
                sector: meta.sector.clone(),
                market_cap,
                revenue_growth_pct: meta.revenue_growth.map(|g| g * 100.0),
                roe_pct: meta.roe.map(|r| r * 100.0),
                debt_to_equity: debt_eq,
            },
        })
    }
}
