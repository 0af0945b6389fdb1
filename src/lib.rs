//! equityscan - Concurrent Rule-Based Equity Scanner Library
//!
//! Scans an equity universe with five strategies and keeps a rolling
//! 15-day result history with membership change detection.
//!
//! # Modules
//!
//! - `domain`: Core types (Bar, Series, ScanResult, ScanOutcome)
//! - `ports`: Trait abstractions (BarsProvider, UniverseSource) and mocks
//! - `scanners`: The five scoring strategies and their indicators
//! - `fetch`: Chunked batch fetching with retry and serial fallback
//! - `runner`: Bounded parallel task runner with timeout and result cap
//! - `cache`: On-disk series cache and the in-memory scan memo
//! - `store`: SQLite/JSON result persistence and change detection
//! - `application`: The scan pipeline and universe pre-filter
//! - `adapters`: External implementations (Yahoo Finance, universe CSV, CLI)
//! - `config`: Configuration loading and validation

pub mod adapters;
pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod fetch;
pub mod ports;
pub mod runner;
pub mod scanners;
pub mod store;
