//! Scanner Pipeline
//!
//! Orchestrates one scan run: universe, batch fetch, bounded parallel
//! scoring, deterministic ranking (or bucketing for the categorical
//! scanners), persistence with change detection, and a short-TTL memo so a
//! repeated run inside the cooldown window is free.
//!
//! Failure policy: a universe failure is fatal (there is nothing to scan);
//! everything downstream degrades per ticker, and persistence errors are
//! logged but never fail a completed scan.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{MetaCache, TtlMemo};
use crate::domain::{rank_results, ScanOutcome, ScanResult, ScannerType};
use crate::fetch::BatchFetcher;
use crate::ports::{BarsProvider, UniverseError, UniverseSource};
use crate::runner::{BoundedRunner, ProgressFn, RunnerConfig};
use crate::scanners::{series_scorer, LongTermScanner, ScannersConfig, SeriesScorer};
use crate::store::{ChangeReport, ResultStore};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Universe unavailable: {0}")]
    Universe(#[from] UniverseError),
}

/// Pipeline phase, observable while a run is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Fetching,
    Scoring,
    Ranking,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Fetching => "fetching",
            RunState::Scoring => "scoring",
            RunState::Ranking => "ranking",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Pipeline tuning (`[pipeline]` section).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Cap on ranked results per run
    pub max_results: usize,
    /// Cap per bucket for the categorical scanners
    pub max_results_per_bucket: usize,
    /// Cooldown during which a repeated run is served from memory
    pub memo_ttl_secs: u64,
    /// Optional market-cap floor applied to the universe before scanning
    pub min_market_cap: Option<f64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_results: 20,
            max_results_per_bucket: 15,
            memo_ttl_secs: 300,
            min_market_cap: None,
        }
    }
}

/// Outcome of one pipeline run.
#[derive(Debug)]
pub struct ScanReport {
    pub scanner: ScannerType,
    pub scan_date: NaiveDate,
    /// Universe size after the pre-filter
    pub universe_size: usize,
    pub outcome: ScanOutcome,
    /// Membership diff vs the previous stored run; None on a memo hit or
    /// when the store was unreachable.
    pub change: Option<ChangeReport>,
    pub from_memo: bool,
}

#[derive(Serialize)]
struct MemoArgs {
    scanner: ScannerType,
    max_results: usize,
    max_results_per_bucket: usize,
}

pub struct ScannerPipeline<P: BarsProvider + 'static> {
    universe: Arc<dyn UniverseSource>,
    provider: Arc<P>,
    fetcher: Arc<BatchFetcher<P>>,
    meta_cache: Arc<MetaCache>,
    runner: BoundedRunner,
    scanners: ScannersConfig,
    store: Arc<dyn ResultStore>,
    config: PipelineConfig,
    memo: TtlMemo<ScanOutcome>,
    state: Mutex<RunState>,
}

impl<P: BarsProvider + 'static> ScannerPipeline<P> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        universe: Arc<dyn UniverseSource>,
        provider: Arc<P>,
        fetcher: Arc<BatchFetcher<P>>,
        meta_cache: Arc<MetaCache>,
        runner_config: RunnerConfig,
        scanners: ScannersConfig,
        store: Arc<dyn ResultStore>,
        config: PipelineConfig,
    ) -> Self {
        let memo = TtlMemo::new(Duration::from_secs(config.memo_ttl_secs));
        Self {
            universe,
            provider,
            fetcher,
            meta_cache,
            runner: BoundedRunner::new(runner_config),
            scanners,
            store,
            config,
            memo,
            state: Mutex::new(RunState::Idle),
        }
    }

    pub fn state(&self) -> RunState {
        *self.state.lock().expect("state mutex poisoned")
    }

    fn set_state(&self, state: RunState) {
        tracing::debug!("pipeline state: {}", state);
        *self.state.lock().expect("state mutex poisoned") = state;
    }

    /// Run one scanner over the universe.
    pub async fn run(
        &self,
        scanner: ScannerType,
        progress: Option<ProgressFn>,
    ) -> Result<ScanReport, PipelineError> {
        let scan_date = chrono::Utc::now().date_naive();
        self.set_state(RunState::Fetching);

        let tickers = match self.universe.tickers().await {
            Ok(t) => t,
            Err(e) => {
                self.set_state(RunState::Failed);
                return Err(e.into());
            }
        };
        tracing::info!("{} scan over {} tickers", scanner, tickers.len());

        let memo_key = TtlMemo::<ScanOutcome>::canonical_key(&MemoArgs {
            scanner,
            max_results: self.config.max_results,
            max_results_per_bucket: self.config.max_results_per_bucket,
        });
        if let Some(outcome) = self.memo.get(&memo_key) {
            tracing::info!("{} scan served from cooldown memo", scanner);
            self.set_state(RunState::Done);
            return Ok(ScanReport {
                scanner,
                scan_date,
                universe_size: tickers.len(),
                outcome,
                change: None,
                from_memo: true,
            });
        }

        let tickers = match self.config.min_market_cap {
            Some(floor) => {
                super::prefilter::MarketCapPrefilter::new(floor)
                    .apply(
                        self.provider.clone(),
                        self.meta_cache.clone(),
                        &self.runner,
                        tickers,
                    )
                    .await
            }
            None => tickers,
        };
        let universe_size = tickers.len();

        let outcome = match scanner {
            ScannerType::LongTerm => self.run_long_term(tickers, progress).await,
            _ => {
                let scorer: Arc<dyn SeriesScorer> = series_scorer(scanner, &self.scanners)
                    .expect("non-fundamental scanners have a series scorer")
                    .into();
                self.run_series(scanner, scorer, tickers, progress).await
            }
        };

        let change = match self.store.detect_change(scanner, &outcome) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!("change detection unavailable: {}", e);
                None
            }
        };
        if let Err(e) = self.store.save(scanner, scan_date, &outcome) {
            // Scan results are still returned; persistence is best-effort.
            tracing::warn!("failed to persist {} results: {}", scanner, e);
        }

        self.memo.put(memo_key, outcome.clone());
        self.set_state(RunState::Done);
        tracing::info!("{} scan produced {} results", scanner, outcome.count());

        Ok(ScanReport {
            scanner,
            scan_date,
            universe_size,
            outcome,
            change,
            from_memo: false,
        })
    }

    /// Series-driven scanners: batch fetch, score under the runner, then
    /// rank or bucket.
    async fn run_series(
        &self,
        scanner: ScannerType,
        scorer: Arc<dyn SeriesScorer>,
        tickers: Vec<String>,
        progress: Option<ProgressFn>,
    ) -> ScanOutcome {
        let series_map = Arc::new(
            self.fetcher
                .fetch(&tickers, scorer.lookback(), scorer.interval())
                .await,
        );
        tracing::info!(
            "fetched {}/{} series for {}",
            series_map.len(),
            tickers.len(),
            scanner
        );

        self.set_state(RunState::Scoring);
        // Categorical scanners keep every classification; only ranked
        // scanners can stop early at the result cap.
        let runner = if scanner.is_categorical() {
            self.runner.clone().without_result_cap()
        } else {
            self.runner.clone().with_result_cap(self.config.max_results)
        };

        let results = runner
            .run(
                tickers,
                {
                    let series_map = series_map.clone();
                    let scorer = scorer.clone();
                    move |ticker| {
                        let series_map = series_map.clone();
                        let scorer = scorer.clone();
                        async move {
                            let series = series_map.get(&ticker)?;
                            if series.len() < scorer.min_bars() {
                                return None;
                            }
                            scorer.score(&ticker, series)
                        }
                    }
                },
                progress,
            )
            .await;

        self.set_state(RunState::Ranking);
        if scanner.is_categorical() {
            self.bucket(results)
        } else {
            self.rank(results)
        }
    }

    /// The fundamentals scanner pulls per-ticker metadata instead of series.
    async fn run_long_term(
        &self,
        tickers: Vec<String>,
        progress: Option<ProgressFn>,
    ) -> ScanOutcome {
        let scorer = Arc::new(LongTermScanner::new(self.scanners.long_term.clone()));

        self.set_state(RunState::Scoring);
        let runner = self.runner.clone().with_result_cap(self.config.max_results);
        let results = runner
            .run(
                tickers,
                {
                    let provider = self.provider.clone();
                    let meta_cache = self.meta_cache.clone();
                    let scorer = scorer.clone();
                    move |ticker| {
                        let provider = provider.clone();
                        let meta_cache = meta_cache.clone();
                        let scorer = scorer.clone();
                        async move {
                            match meta_cache.get_or_fetch(&*provider, &ticker).await {
                                Ok(meta) => scorer.score(&meta),
                                Err(e) => {
                                    tracing::debug!("no fundamentals for {}: {}", ticker, e);
                                    None
                                }
                            }
                        }
                    }
                },
                progress,
            )
            .await;

        self.set_state(RunState::Ranking);
        self.rank(results)
    }

    fn rank(&self, mut results: Vec<ScanResult>) -> ScanOutcome {
        rank_results(&mut results);
        results.truncate(self.config.max_results);
        ScanOutcome::Ranked(results)
    }

    fn bucket(&self, results: Vec<ScanResult>) -> ScanOutcome {
        let mut buckets: BTreeMap<String, Vec<ScanResult>> = BTreeMap::new();
        for result in results {
            if let Some(bucket) = result.bucket() {
                buckets.entry(bucket.to_string()).or_default().push(result);
            }
        }
        for bucket in buckets.values_mut() {
            rank_results(bucket);
            bucket.truncate(self.config.max_results_per_bucket);
        }
        ScanOutcome::Bucketed(buckets)
    }
}

/// Map of scanner outputs used by callers that render several scans at once.
pub type OutcomeMap = HashMap<ScannerType, ScanOutcome>;
