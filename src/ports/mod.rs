//! Trait seams toward external collaborators: the bars provider and the
//! ticker universe. Mocks live here too so integration tests can script them.

pub mod mocks;
pub mod provider;
pub mod universe;

pub use provider::{BarsProvider, Interval, Lookback, ProviderError, TickerMeta};
pub use universe::{UniverseError, UniverseSource};
