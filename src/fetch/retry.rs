//! Backoff Retry
//!
//! One reusable retry wrapper for remote-fetch call sites. Retries are for
//! transient failures only; deterministic errors (bad symbol, ambiguous
//! shape) return immediately. Scoring logic is never retried.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;

/// Bounded exponential backoff policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given zero-based attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ms = self.base_delay_ms as f64 * self.backoff_factor.powi(attempt as i32);
        Duration::from_millis(ms as u64)
    }
}

/// Run `op` up to `policy.max_attempts` times, sleeping with exponential
/// backoff between attempts. Only errors for which `is_transient` returns
/// true are retried.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    op_name: &str,
    is_transient: P,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_err = None;

    for attempt in 0..attempts {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!("{} succeeded on attempt {}", op_name, attempt + 1);
                }
                return Ok(value);
            }
            Err(e) => {
                if !is_transient(&e) || attempt + 1 == attempts {
                    if attempt + 1 == attempts {
                        tracing::warn!("{} failed after {} attempts: {}", op_name, attempt + 1, e);
                    }
                    return Err(e);
                }
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}",
                    op_name,
                    attempt + 1,
                    attempts,
                    e
                );
                tokio::time::sleep(policy.delay_for(attempt)).await;
                last_err = Some(e);
            }
        }
    }
    // Unreachable: the loop always returns. Kept for the compiler.
    Err(last_err.expect("retry loop exhausted without an error"))
}
