//! Scan Results
//!
//! Tagged result types shared by all scanners: a common base (symbol, price,
//! score, rationale) plus a scanner-specific detail variant with a fixed
//! schema. A new scan always produces a fresh result set; results are never
//! mutated after a run.

use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// The five scanner flavors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ScannerType {
    /// Momentum/swing setups (15-20 day horizon)
    Swing,
    /// Institutional volume activity patterns
    SmartMoney,
    /// Fundamentals-driven long-term candidates
    LongTerm,
    /// Seasonal quarterly performers
    Cyclical,
    /// Weinstein trend-stage classification
    StageAnalysis,
}

impl ScannerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScannerType::Swing => "swing",
            ScannerType::SmartMoney => "smart_money",
            ScannerType::LongTerm => "long_term",
            ScannerType::Cyclical => "cyclical",
            ScannerType::StageAnalysis => "stage_analysis",
        }
    }

    /// Categorical scanners bucket results instead of ranking them
    pub fn is_categorical(&self) -> bool {
        matches!(self, ScannerType::Cyclical | ScannerType::StageAnalysis)
    }

    pub const ALL: [ScannerType; 5] = [
        ScannerType::Swing,
        ScannerType::SmartMoney,
        ScannerType::LongTerm,
        ScannerType::Cyclical,
        ScannerType::StageAnalysis,
    ];
}

impl fmt::Display for ScannerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calendar quarter bucket for the cyclical scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quarter::Q1 => "Q1",
            Quarter::Q2 => "Q2",
            Quarter::Q3 => "Q3",
            Quarter::Q4 => "Q4",
        }
    }

    pub fn from_month(month: u32) -> Self {
        match month {
            1..=3 => Quarter::Q1,
            4..=6 => Quarter::Q2,
            7..=9 => Quarter::Q3,
            _ => Quarter::Q4,
        }
    }

    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];
}

/// Weinstein trend stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TrendStage {
    Basing,
    Advancing,
    Topping,
    Declining,
}

impl TrendStage {
    pub fn label(&self) -> &'static str {
        match self {
            TrendStage::Basing => "Stage 1 - Basing",
            TrendStage::Advancing => "Stage 2 - Advancing",
            TrendStage::Topping => "Stage 3 - Top",
            TrendStage::Declining => "Stage 4 - Declining",
        }
    }

    pub fn suggested_action(&self) -> &'static str {
        match self {
            TrendStage::Basing => "Wait",
            TrendStage::Advancing => "Buy",
            TrendStage::Topping => "Take profits",
            TrendStage::Declining => "Avoid",
        }
    }
}

/// Smart-money signal classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmcSignal {
    Breakout,
    Accumulation,
    Absorption,
    Reaccumulation,
    VolumeSurge,
}

impl SmcSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmcSignal::Breakout => "Breakout",
            SmcSignal::Accumulation => "Accumulation",
            SmcSignal::Absorption => "Absorption",
            SmcSignal::Reaccumulation => "Re-accumulation",
            SmcSignal::VolumeSurge => "Volume Surge",
        }
    }
}

/// Scanner-specific extension fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanDetail {
    Swing {
        entry_low: f64,
        entry_high: f64,
        target: f64,
        stop_loss: f64,
        rsi: f64,
        volume_spike_pct: f64,
        expected_move_pct: f64,
    },
    SmartMoney {
        signal: SmcSignal,
        volume_spike_pct: f64,
        delivery_pct: f64,
        strength: String,
    },
    LongTerm {
        sector: Option<String>,
        market_cap: f64,
        revenue_growth_pct: Option<f64>,
        roe_pct: Option<f64>,
        debt_to_equity: Option<f64>,
    },
    Cyclical {
        quarter: Quarter,
        win_rate_pct: f64,
        avg_return_pct: f64,
    },
    Stage {
        stage: TrendStage,
        relative_strength: String,
        action: String,
    },
}

/// One qualifying stock from a scan run.
///
/// Immutable once produced: the pipeline builds a complete new set per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Ticker symbol without exchange suffix
    pub symbol: String,
    /// Last close at scan time
    pub price: f64,
    /// Scanner-defined score, higher is better
    pub score: f64,
    /// Human-readable rationale for the match
    pub rationale: String,
    pub detail: ScanDetail,
}

impl ScanResult {
    /// Bucket key for categorical scanners
    pub fn bucket(&self) -> Option<&'static str> {
        match &self.detail {
            ScanDetail::Cyclical { quarter, .. } => Some(quarter.as_str()),
            ScanDetail::Stage { stage, .. } => Some(stage.label()),
            _ => None,
        }
    }
}

/// Output of one scanner run: ranked list or named buckets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScanOutcome {
    Ranked(Vec<ScanResult>),
    Bucketed(BTreeMap<String, Vec<ScanResult>>),
}

impl ScanOutcome {
    /// Total number of results across buckets or the ranked list
    pub fn count(&self) -> usize {
        match self {
            ScanOutcome::Ranked(v) => v.len(),
            ScanOutcome::Bucketed(m) => m.values().map(Vec::len).sum(),
        }
    }

    /// All member symbols, in output order
    pub fn symbols(&self) -> Vec<String> {
        match self {
            ScanOutcome::Ranked(v) => v.iter().map(|r| r.symbol.clone()).collect(),
            ScanOutcome::Bucketed(m) => m
                .values()
                .flat_map(|v| v.iter().map(|r| r.symbol.clone()))
                .collect(),
        }
    }
}

/// Deterministic ranking: score descending, then symbol ascending.
///
/// Equal-score ties must never depend on task completion order.
pub fn rank_results(results: &mut [ScanResult]) {
    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(symbol: &str, score: f64) -> ScanResult {
        ScanResult {
            symbol: symbol.to_string(),
            price: 100.0,
            score,
            rationale: "test".to_string(),
            detail: ScanDetail::Stage {
                stage: TrendStage::Advancing,
                relative_strength: "Above average".to_string(),
                action: "Buy".to_string(),
            },
        }
    }

    #[test]
    fn ranking_is_deterministic_on_ties() {
        let mut results = vec![result("ZEE", 80.0), result("ACC", 80.0), result("MID", 90.0)];
        rank_results(&mut results);
        let symbols: Vec<_> = results.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["MID", "ACC", "ZEE"]);
    }

    #[test]
    fn scanner_type_round_trip() {
        for st in ScannerType::ALL {
            let json = serde_json::to_string(&st).unwrap();
            let back: ScannerType = serde_json::from_str(&json).unwrap();
            assert_eq!(st, back);
        }
        assert_eq!(ScannerType::StageAnalysis.as_str(), "stage_analysis");
    }

    #[test]
    fn categorical_flags() {
        assert!(ScannerType::Cyclical.is_categorical());
        assert!(ScannerType::StageAnalysis.is_categorical());
        assert!(!ScannerType::Swing.is_categorical());
    }

    #[test]
    fn quarter_from_month() {
        assert_eq!(Quarter::from_month(1), Quarter::Q1);
        assert_eq!(Quarter::from_month(6), Quarter::Q2);
        assert_eq!(Quarter::from_month(9), Quarter::Q3);
        assert_eq!(Quarter::from_month(12), Quarter::Q4);
    }

    #[test]
    fn outcome_counts_and_symbols() {
        let ranked = ScanOutcome::Ranked(vec![result("AAA", 1.0), result("BBB", 2.0)]);
        assert_eq!(ranked.count(), 2);
        assert_eq!(ranked.symbols(), vec!["AAA", "BBB"]);

        let mut buckets = BTreeMap::new();
        buckets.insert("Q1".to_string(), vec![result("CCC", 1.0)]);
        buckets.insert("Q2".to_string(), vec![result("DDD", 1.0), result("EEE", 1.0)]);
        let bucketed = ScanOutcome::Bucketed(buckets);
        assert_eq!(bucketed.count(), 3);
        assert_eq!(bucketed.symbols(), vec!["CCC", "DDD", "EEE"]);
    }

    #[test]
    fn detail_serializes_with_kind_tag() {
        let r = result("AAA", 1.0);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["detail"]["kind"], "stage");
    }
}
