pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod error;
pub mod error_utils;
pub mod fetch;
pub mod filter;
pub mod normalizer;
pub mod tickers;
pub mod types;

pub use aggregator::*;
pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use fetch::*;
pub use types::*;
