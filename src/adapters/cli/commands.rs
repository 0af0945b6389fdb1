//! CLI Command Handlers
//!
//! Implementation of all CLI commands for the equityscan scanner.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::universe_file::FileUniverse;
use crate::adapters::yahoo::YahooProvider;
use crate::application::{ScanReport, ScannerPipeline};
use crate::cache::{MetaCache, SeriesCache};
use crate::config::{load_config, Config};
use crate::domain::{to_sanitized_value, ScanOutcome, ScannerType};
use crate::fetch::BatchFetcher;
use crate::ports::{UniverseError, UniverseSource};
use crate::runner::ProgressFn;
use crate::store::{open_store, ResultStore};

/// equityscan - concurrent stock scanner for NSE equities
#[derive(Parser, Debug)]
#[command(
    name = "equityscan",
    version = env!("CARGO_PKG_VERSION"),
    about = "Concurrent stock scanner with rolling result history",
    long_about = "Scans an equity universe with five strategies (swing, smart money, \
                  long term, cyclical, stage analysis), persists a rolling result \
                  history, and reports membership changes between runs."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one scanner over the universe
    Scan(ScanCmd),

    /// Show stored snapshots for a scanner
    History(HistoryCmd),

    /// Show the membership diff between the two most recent snapshots
    Changes(ChangesCmd),

    /// Show on-disk series cache statistics
    CacheStats(CacheStatsCmd),
}

/// Run one scanner
#[derive(Parser, Debug)]
pub struct ScanCmd {
    /// Scanner to run
    #[arg(value_enum)]
    pub scanner: ScannerType,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    /// Override the ranked-result cap
    #[arg(short, long, value_name = "N")]
    pub limit: Option<usize>,

    /// Override the worker-pool size
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Scan these symbols instead of the configured universe file
    #[arg(short, long, value_name = "SYMBOLS", value_delimiter = ',')]
    pub tickers: Option<Vec<String>>,

    /// Emit the result set as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Suppress per-ticker progress output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Show stored history
#[derive(Parser, Debug)]
pub struct HistoryCmd {
    /// Scanner whose history to show
    #[arg(value_enum)]
    pub scanner: ScannerType,

    /// Days of history to include
    #[arg(short, long, value_name = "DAYS", default_value = "15")]
    pub days: u32,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,
}

/// Show the latest membership diff
#[derive(Parser, Debug)]
pub struct ChangesCmd {
    /// Scanner whose runs to compare
    #[arg(value_enum)]
    pub scanner: ScannerType,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,
}

/// Show cache statistics
#[derive(Parser, Debug)]
pub struct CacheStatsCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    match app.command {
        Command::Scan(cmd) => scan_command(cmd).await,
        Command::History(cmd) => history_command(cmd).await,
        Command::Changes(cmd) => changes_command(cmd).await,
        Command::CacheStats(cmd) => cache_stats_command(cmd).await,
    }
}

fn load_config_or_default(path: &PathBuf) -> Result<Config> {
    if path.exists() {
        load_config(path).with_context(|| format!("Failed to load {}", path.display()))
    } else {
        tracing::warn!("{} not found, using built-in defaults", path.display());
        Ok(Config::default())
    }
}

fn build_store(config: &Config) -> Result<Arc<dyn ResultStore>> {
    let store = open_store(&config.store).context("Failed to open result store")?;
    Ok(Arc::from(store))
}

fn build_pipeline(
    config: &Config,
    universe: Arc<dyn UniverseSource>,
) -> Result<ScannerPipeline<YahooProvider>> {
    let provider =
        Arc::new(YahooProvider::new(config.provider.clone()).context("Failed to build provider")?);
    let cache_dir = shellexpand::tilde(&config.cache.dir).to_string();
    let cache = Arc::new(SeriesCache::new(
        &cache_dir,
        Duration::from_secs(config.cache.ttl_secs),
    ));
    let meta_cache = Arc::new(MetaCache::new(
        PathBuf::from(&cache_dir).join("meta"),
        Duration::from_secs(config.cache.meta_ttl_secs),
    ));
    let fetcher = Arc::new(BatchFetcher::new(
        provider.clone(),
        cache,
        config.fetch.to_fetch_config(),
    ));
    let store = build_store(config)?;

    Ok(ScannerPipeline::new(
        universe,
        provider,
        fetcher,
        meta_cache,
        config.runner.to_runner_config(),
        config.scanners.clone(),
        store,
        config.pipeline.clone(),
    ))
}

/// Universe taken directly from `--tickers` on the command line.
struct ArgUniverse(Vec<String>);

#[async_trait::async_trait]
impl UniverseSource for ArgUniverse {
    async fn tickers(&self) -> Result<Vec<String>, UniverseError> {
        if self.0.is_empty() {
            return Err(UniverseError::Empty);
        }
        Ok(self.0.clone())
    }
}

async fn scan_command(cmd: ScanCmd) -> Result<()> {
    let mut config = load_config_or_default(&cmd.config)?;
    if let Some(limit) = cmd.limit {
        config.pipeline.max_results = limit;
    }
    if let Some(workers) = cmd.workers {
        config.runner.max_workers = workers;
    }
    config.validate().context("Invalid configuration")?;

    let universe: Arc<dyn UniverseSource> = match &cmd.tickers {
        Some(tickers) => Arc::new(ArgUniverse(tickers.clone())),
        None => Arc::new(FileUniverse::new(&config.universe.file)),
    };

    let pipeline = build_pipeline(&config, universe)?;

    let progress: Option<ProgressFn> = if cmd.quiet {
        None
    } else {
        Some(Arc::new(|completed, total, ticker| {
            if completed % 25 == 0 || completed == total {
                eprintln!("  scanned {completed}/{total} (last: {ticker})");
            }
        }))
    };

    let report = pipeline.run(cmd.scanner, progress).await?;

    if cmd.json {
        let value = to_sanitized_value(&report.outcome)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        render_report(&report);
    }
    Ok(())
}

fn render_report(report: &ScanReport) {
    println!();
    println!(
        "{} scan - {} ({} tickers{})",
        report.scanner,
        report.scan_date,
        report.universe_size,
        if report.from_memo { ", cached" } else { "" }
    );

    match &report.outcome {
        ScanOutcome::Ranked(results) => {
            if results.is_empty() {
                println!("  No qualifying stocks.");
            }
            for (i, result) in results.iter().enumerate() {
                println!(
                    "  {:>2}. {:<12} {:>10.2}  score {:>5.1}  {}",
                    i + 1,
                    result.symbol,
                    result.price,
                    result.score,
                    result.rationale
                );
            }
        }
        ScanOutcome::Bucketed(buckets) => {
            for (bucket, results) in buckets {
                println!("  {bucket}:");
                if results.is_empty() {
                    println!("    (none)");
                }
                for result in results {
                    println!(
                        "    {:<12} {:>10.2}  {}",
                        result.symbol, result.price, result.rationale
                    );
                }
            }
        }
    }

    if let Some(change) = &report.change {
        println!();
        if !change.changed {
            println!("  Membership unchanged since the last run.");
        } else {
            if !change.added.is_empty() {
                println!("  New entrants: {}", change.added.join(", "));
            }
            if !change.removed.is_empty() {
                println!("  Dropped out:  {}", change.removed.join(", "));
            }
        }
    }
}

async fn history_command(cmd: HistoryCmd) -> Result<()> {
    let config = load_config_or_default(&cmd.config)?;
    let store = build_store(&config)?;

    let snapshots = store.history(cmd.scanner, cmd.days)?;
    if snapshots.is_empty() {
        println!("No stored runs for {} in the last {} days.", cmd.scanner, cmd.days);
        return Ok(());
    }

    println!("{} history ({} days):", cmd.scanner, cmd.days);
    for snapshot in &snapshots {
        println!(
            "  {}  {:>3} results  hash {}",
            snapshot.scan_date,
            snapshot.count,
            &snapshot.hash[..12.min(snapshot.hash.len())]
        );
    }
    Ok(())
}

async fn changes_command(cmd: ChangesCmd) -> Result<()> {
    let config = load_config_or_default(&cmd.config)?;
    let store = build_store(&config)?;

    let snapshots = store.history(cmd.scanner, config.store.retention_days)?;
    if snapshots.len() < 2 {
        println!(
            "Need at least two stored runs for {} to diff (have {}).",
            cmd.scanner,
            snapshots.len()
        );
        return Ok(());
    }

    let previous = &snapshots[snapshots.len() - 2];
    let latest = &snapshots[snapshots.len() - 1];
    let report = diff_symbols(&previous.outcome, &latest.outcome);

    println!(
        "{}: {} -> {}",
        cmd.scanner, previous.scan_date, latest.scan_date
    );
    if report.0.is_empty() && report.1.is_empty() {
        println!("  Membership unchanged.");
    } else {
        if !report.0.is_empty() {
            println!("  New entrants: {}", report.0.join(", "));
        }
        if !report.1.is_empty() {
            println!("  Dropped out:  {}", report.1.join(", "));
        }
    }
    Ok(())
}

/// (added, removed) between two outcomes, by membership.
fn diff_symbols(previous: &ScanOutcome, latest: &ScanOutcome) -> (Vec<String>, Vec<String>) {
    let mut prev = previous.symbols();
    let mut cur = latest.symbols();
    prev.sort_unstable();
    prev.dedup();
    cur.sort_unstable();
    cur.dedup();

    let added = cur
        .iter()
        .filter(|s| prev.binary_search(s).is_err())
        .cloned()
        .collect();
    let removed = prev
        .iter()
        .filter(|s| cur.binary_search(s).is_err())
        .cloned()
        .collect();
    (added, removed)
}

async fn cache_stats_command(cmd: CacheStatsCmd) -> Result<()> {
    let config = load_config_or_default(&cmd.config)?;
    let cache_dir = shellexpand::tilde(&config.cache.dir).to_string();
    let cache = SeriesCache::new(&cache_dir, Duration::from_secs(config.cache.ttl_secs));

    println!("Series cache: {}", cache_dir);
    println!("  Entries: {}", cache.entry_count());
    println!("  TTL:     {}s", config.cache.ttl_secs);

    let meta_cache = MetaCache::new(
        PathBuf::from(&cache_dir).join("meta"),
        Duration::from_secs(config.cache.meta_ttl_secs),
    );
    println!("Meta cache:   {}/meta", cache_dir);
    println!("  Entries: {}", meta_cache.entry_count());
    println!("  TTL:     {}s", config.cache.meta_ttl_secs);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ScanDetail, ScanResult, TrendStage};
    use std::collections::BTreeMap;

    #[test]
    fn test_cli_parse_scan() {
        let args = vec!["equityscan", "scan", "swing", "--limit", "10"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Scan(cmd) => {
                assert_eq!(cmd.scanner, ScannerType::Swing);
                assert_eq!(cmd.limit, Some(10));
                assert_eq!(cmd.config, PathBuf::from("config.toml"));
                assert!(!cmd.json);
            }
            _ => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_cli_parse_scan_with_tickers() {
        let args = vec!["equityscan", "scan", "smart-money", "-t", "INFY,TCS,HCL"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Scan(cmd) => {
                assert_eq!(cmd.scanner, ScannerType::SmartMoney);
                assert_eq!(
                    cmd.tickers,
                    Some(vec!["INFY".to_string(), "TCS".to_string(), "HCL".to_string()])
                );
            }
            _ => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_cli_parse_history() {
        let args = vec!["equityscan", "history", "cyclical", "--days", "7"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::History(cmd) => {
                assert_eq!(cmd.scanner, ScannerType::Cyclical);
                assert_eq!(cmd.days, 7);
            }
            _ => panic!("Expected History command"),
        }
    }

    #[test]
    fn test_cli_parse_changes() {
        let args = vec!["equityscan", "changes", "stage-analysis"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Changes(cmd) => {
                assert_eq!(cmd.scanner, ScannerType::StageAnalysis);
            }
            _ => panic!("Expected Changes command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = vec!["equityscan", "-v", "--debug", "cache-stats"];
        let app = CliApp::try_parse_from(args).unwrap();

        assert!(app.verbose);
        assert!(app.debug);
    }

    fn result(symbol: &str) -> ScanResult {
        ScanResult {
            symbol: symbol.to_string(),
            price: 100.0,
            score: 50.0,
            rationale: "test".to_string(),
            detail: ScanDetail::Stage {
                stage: TrendStage::Advancing,
                relative_strength: "Above average".to_string(),
                action: "Buy".to_string(),
            },
        }
    }

    #[test]
    fn diff_symbols_is_membership_based() {
        let previous = ScanOutcome::Ranked(vec![result("A"), result("B")]);
        let latest = {
            let mut buckets = BTreeMap::new();
            buckets.insert("Stage 2 - Advancing".to_string(), vec![result("B"), result("C")]);
            ScanOutcome::Bucketed(buckets)
        };
        let (added, removed) = diff_symbols(&previous, &latest);
        assert_eq!(added, vec!["C"]);
        assert_eq!(removed, vec!["A"]);
    }
}
