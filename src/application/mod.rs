//! Application layer: the scan pipeline and the market-cap pre-filter.

pub mod pipeline;
pub mod prefilter;

pub use pipeline::{PipelineConfig, PipelineError, RunState, ScanReport, ScannerPipeline};
pub use prefilter::MarketCapPrefilter;
