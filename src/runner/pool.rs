//! Concurrency pool for per-ticker work.
//!
//! Built on a tokio semaphore (the ceiling), one spawned task per admitted
//! ticker, and an mpsc channel the caller drains in completion order.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio::time::timeout;

/// Called once per completed ticker: (completed, total, ticker).
pub type ProgressFn = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Concurrency ceiling. At most this many tasks run at once.
    pub max_workers: usize,
    /// Stop admitting new work once this many results have been produced.
    pub max_results: Option<usize>,
    /// Per-ticker deadline. A task past this is abandoned, not cancelled.
    pub task_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_workers: 8,
            max_results: None,
            task_timeout: Duration::from_secs(30),
        }
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_workers == 0 {
            return Err("max_workers must be at least 1".to_string());
        }
        if self.max_results == Some(0) {
            return Err("max_results must be at least 1 when set".to_string());
        }
        if self.task_timeout.is_zero() {
            return Err("task_timeout must be non-zero".to_string());
        }
        Ok(())
    }
}

/// One completed ticker flowing back to the collector. `result` is None for
/// skips, timeouts, panics, and tickers the work function declined to score.
struct Completion<T> {
    ticker: String,
    result: Option<T>,
}

#[derive(Debug, Clone)]
pub struct BoundedRunner {
    config: RunnerConfig,
}

impl BoundedRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn with_result_cap(mut self, cap: usize) -> Self {
        self.config.max_results = Some(cap);
        self
    }

    pub fn without_result_cap(mut self) -> Self {
        self.config.max_results = None;
        self
    }

    /// Run `work` over every ticker under the configured ceiling.
    ///
    /// Results come back in completion order, at most `max_results` of them.
    /// The progress callback fires exactly once per ticker on this task and
    /// its completed count reaches `tickers.len()` exactly once.
    pub async fn run<T, F, Fut>(
        &self,
        tickers: Vec<String>,
        work: F,
        progress: Option<ProgressFn>,
    ) -> Vec<T>
    where
        T: Send + 'static,
        F: Fn(String) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Option<T>> + Send + 'static,
    {
        let total = tickers.len();
        if total == 0 {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_workers));
        let hits = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::channel::<Completion<T>>(total);
        let max_results = self.config.max_results;
        let task_timeout = self.config.task_timeout;

        let submitter = {
            let tx = tx.clone();
            let hits = hits.clone();
            tokio::spawn(async move {
                for ticker in tickers {
                    let cap_reached =
                        max_results.is_some_and(|cap| hits.load(Ordering::SeqCst) >= cap);
                    if cap_reached {
                        // Drain the remainder as instant skips so the
                        // progress count still reaches the total.
                        if tx
                            .send(Completion {
                                ticker,
                                result: None,
                            })
                            .await
                            .is_err()
                        {
                            break;
                        }
                        continue;
                    }

                    let permit = match semaphore.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => break,
                    };
                    let tx = tx.clone();
                    let hits = hits.clone();
                    let work = work.clone();
                    tokio::spawn(async move {
                        // The work future runs in its own task so a panic
                        // surfaces here as a JoinError instead of unwinding
                        // through the pool.
                        let inner = tokio::spawn(work(ticker.clone()));
                        let result = match timeout(task_timeout, inner).await {
                            Ok(Ok(result)) => result,
                            Ok(Err(join_err)) => {
                                tracing::warn!("task for {} panicked: {}", ticker, join_err);
                                None
                            }
                            Err(_) => {
                                tracing::warn!(
                                    "task for {} exceeded {:?}, abandoning",
                                    ticker,
                                    task_timeout
                                );
                                None
                            }
                        };
                        if result.is_some() {
                            hits.fetch_add(1, Ordering::SeqCst);
                        }
                        let _ = tx.send(Completion { ticker, result }).await;
                        drop(permit);
                    });
                }
            })
        };
        drop(tx);

        let mut results = Vec::new();
        let mut completed = 0usize;
        while let Some(completion) = rx.recv().await {
            completed += 1;
            if let Some(cb) = &progress {
                cb(completed, total, &completion.ticker);
            }
            if let Some(value) = completion.result {
                // A task already in flight when the cap was hit may still
                // deliver; anything past the cap is discarded.
                match max_results {
                    Some(cap) if results.len() >= cap => {}
                    _ => results.push(value),
                }
            }
        }
        let _ = submitter.await;

        debug_assert_eq!(completed, total);
        results
    }
}
