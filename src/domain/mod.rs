//! Core domain types: bars, series, scan results, JSON sanitization.

pub mod bar;
pub mod result;
pub mod sanitize;

pub use bar::{Bar, Series, SeriesError};
pub use result::{
    rank_results, Quarter, ScanDetail, ScanOutcome, ScanResult, ScannerType, SmcSignal, TrendStage,
};
pub use sanitize::{json_safe_f64, sanitize_value, to_sanitized_value};
