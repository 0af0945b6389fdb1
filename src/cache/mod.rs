//! Caching: the on-disk OHLCV series and ticker-metadata caches and the
//! generic TTL memo.
//!
//! All three are explicit objects constructed with their TTLs and passed by
//! reference to whoever needs them; there is no process-wide singleton
//! cache state.

pub mod meta_cache;
pub mod series_cache;
pub mod ttl_memo;

pub use meta_cache::MetaCache;
pub use series_cache::{CacheError, SeriesCache};
pub use ttl_memo::TtlMemo;
