#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod events;
pub mod history;
pub mod local;
pub mod provider;
pub mod types;
pub mod yahoo;

pub use error::{DataError, Result};
pub use events::{SkipEvent, SkipReason};
pub use history::PriceHistory;
pub use local::{CsvFundamentals, CsvPriceLoader, StaticFundamentals};
pub use provider::{
    AccountProvider, FETCH_CONCURRENCY, FundamentalsProvider, OrderAck, OrderSink, PriceProvider,
    gather_fundamentals, gather_history,
};
pub use types::{
    AssetRecord, Fundamentals, FundamentalsMap, Holdings, OrderIntent, OrderSide, PriceSeries,
};
pub use yahoo::YahooQuoteProvider;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
