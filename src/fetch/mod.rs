//! Batch data acquisition: chunked bulk fetch with fallback and retry.

pub mod batch;
pub mod retry;

pub use batch::{BatchFetcher, FetchConfig};
pub use retry::{retry_with_backoff, RetryPolicy};
