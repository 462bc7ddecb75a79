//! Error types for portfolio optimization.

use thiserror::Error;

/// Result type for portfolio optimization.
pub type Result<T> = std::result::Result<T, OptimizeError>;

/// Errors raised by the optimizer.
///
/// All of them mean the caller should keep its previous weights for the cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizeError {
    /// Constraints cannot be met, the solver failed, or it ran out of time
    #[error("Optimization infeasible: {0}")]
    OptimizationInfeasible(String),

    /// Score and covariance share no tickers
    #[error("No tickers shared by scores and covariance")]
    EmptyUniverse,

    /// Invalid optimizer configuration
    #[error("Invalid optimizer configuration: {0}")]
    InvalidConfig(String),
}
