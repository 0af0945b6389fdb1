//! External-facing implementations of the ports: the Yahoo Finance market
//! data provider, the exchange equity-list universe, and the CLI surface.

pub mod cli;
pub mod universe_file;
pub mod yahoo;

pub use universe_file::FileUniverse;
pub use yahoo::{YahooConfig, YahooProvider};
