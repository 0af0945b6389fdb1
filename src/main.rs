//! equityscan - Concurrent Rule-Based Equity Scanner
//!
//! Scans an equity universe with five strategies and keeps a rolling
//! 15-day result history with membership change detection.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use equityscan::adapters::cli::{execute, CliApp};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (DATABASE_URL goes here, not in config.toml)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    init_logging(app.verbose, app.debug)?;

    execute(app).await
}

fn init_logging(verbose: bool, debug: bool) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt().with_env_filter(filter).init();
    Ok(())
}
