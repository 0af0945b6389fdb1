//! Bounded Parallel Runner
//!
//! Executes a per-ticker function across a pool with a fixed concurrency
//! ceiling, per-task timeout, optional result cap, and progress reporting.
//!
//! Contract highlights:
//! - a panic or timeout in one ticker's task is "no result", never an abort
//! - once the result cap is hit, no new work starts; remaining tickers are
//!   drained as instant skips so progress still reaches the total, and
//!   in-flight tasks finish with late results discarded
//! - results are collected in completion order; callers apply their own
//!   deterministic ranking afterwards
//! - the progress callback fires once per completed ticker on the caller's
//!   task, not from worker tasks

pub mod pool;

pub use pool::{BoundedRunner, ProgressFn, RunnerConfig};
