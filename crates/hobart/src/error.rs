//! Error types for the engine.

use hobart_data::{DataError, SkipReason};
use hobart_factors::FactorError;
use hobart_output::ExportError;
use hobart_portfolio::OptimizeError;
use hobart_risk::CovarianceError;
use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, HobartError>;

/// Errors raised by the engine and its components.
#[derive(Debug, Error)]
pub enum HobartError {
    /// Data or collaborator failure
    #[error(transparent)]
    Data(#[from] DataError),

    /// Factor scoring failure
    #[error("Factor error: {0}")]
    Factor(#[from] FactorError),

    /// Covariance estimation failure
    #[error("Covariance error: {0}")]
    Covariance(#[from] CovarianceError),

    /// Optimization failure
    #[error(transparent)]
    Optimize(#[from] OptimizeError),

    /// Export failure
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HobartError {
    /// Reason to record when this error ends a cycle.
    ///
    /// Short histories map to [`SkipReason::InsufficientHistory`]; everything
    /// else leaves the previous weights in place as an infeasible cycle.
    pub fn skip_reason(&self) -> SkipReason {
        match self {
            Self::Factor(FactorError::InsufficientHistory {
                required,
                available,
            }) => SkipReason::InsufficientHistory {
                required: *required,
                available: *available,
            },
            Self::Covariance(CovarianceError::InsufficientData { required, actual }) => {
                SkipReason::InsufficientHistory {
                    required: *required,
                    available: *actual,
                }
            }
            Self::Optimize(OptimizeError::OptimizationInfeasible(reason)) => {
                SkipReason::OptimizationInfeasible(reason.clone())
            }
            other => SkipReason::OptimizationInfeasible(other.to_string()),
        }
    }
}
