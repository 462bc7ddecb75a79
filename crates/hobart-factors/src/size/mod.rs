//! Size factors - measures of company scale

pub mod market_cap;

pub use market_cap::{MarketCapConfig, MarketCapFactor};
