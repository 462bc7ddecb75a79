//! Momentum factors - measures of trend persistence
//!
//! Momentum captures the tendency of securities with strong recent performance
//! to keep outperforming. Hobart uses a single medium-term price momentum
//! signal over a trailing window of daily closes.

pub mod price_momentum;

pub use price_momentum::{MomentumScores, PriceMomentumConfig, PriceMomentumFactor};
