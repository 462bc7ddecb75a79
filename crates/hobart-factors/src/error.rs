//! Error types for factor scoring.

use thiserror::Error;

/// Result type for factor scoring.
pub type Result<T> = std::result::Result<T, FactorError>;

/// Errors raised while scoring a universe.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FactorError {
    /// Trailing window is shorter than the momentum lookback requires
    #[error("Insufficient history: need {required} rows, have {available}")]
    InsufficientHistory {
        /// Rows required, lookback plus one
        required: usize,
        /// Rows in the trailing window
        available: usize,
    },

    /// Factor weights are negative or do not sum to one
    #[error("Invalid factor weights: momentum {momentum}, value {value}, size {size}")]
    InvalidWeights {
        /// Momentum weight
        momentum: f64,
        /// Value weight
        value: f64,
        /// Size weight
        size: f64,
    },

    /// Invalid factor configuration
    #[error("Invalid factor configuration: {0}")]
    InvalidConfig(String),
}
