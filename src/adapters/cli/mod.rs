//! CLI Adapter
//!
//! Command-line surface for running scans and inspecting stored results.

pub mod commands;

pub use commands::{execute, CacheStatsCmd, ChangesCmd, CliApp, Command, HistoryCmd, ScanCmd};
