//! Asset covariance estimation
//!
//! Estimators take a `T x N` matrix of daily returns, where `NaN` marks a
//! missing observation, and return an `N x N` covariance matrix.

pub mod ledoit_wolf;
pub mod sample;
pub mod utils;

pub use ledoit_wolf::{LedoitWolfConfig, LedoitWolfEstimator, ShrinkageTarget};
pub use sample::SampleCovarianceEstimator;
pub use utils::{
    EigenDecomposition, clip_to_positive_semidefinite, is_positive_semidefinite,
    jacobi_eigendecomp,
};

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during covariance estimation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CovarianceError {
    /// Insufficient data for estimation
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Matrix is not symmetric
    #[error("Covariance matrix is not symmetric")]
    NotSymmetric,

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Trait for covariance matrix estimators
pub trait CovarianceEstimator {
    /// Estimate the per-period covariance matrix from asset returns
    ///
    /// # Arguments
    /// * `returns` - Matrix where each row is a period and each column an asset
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError>;
}

/// Covariance matrix labelled by ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovarianceMatrix {
    tickers: Vec<String>,
    matrix: Array2<f64>,
}

impl CovarianceMatrix {
    /// Wrap a square symmetric matrix.
    ///
    /// # Errors
    /// Returns an error if the matrix is not square, does not match the
    /// ticker count, or is not symmetric.
    pub fn new(tickers: Vec<String>, matrix: Array2<f64>) -> Result<Self, CovarianceError> {
        let (rows, cols) = matrix.dim();
        if rows != cols {
            return Err(CovarianceError::DimensionMismatch {
                expected: rows,
                actual: cols,
            });
        }
        if rows != tickers.len() {
            return Err(CovarianceError::DimensionMismatch {
                expected: tickers.len(),
                actual: rows,
            });
        }
        let scale = matrix.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
        for i in 0..rows {
            for j in (i + 1)..rows {
                if (matrix[[i, j]] - matrix[[j, i]]).abs() > 1e-10 * scale {
                    return Err(CovarianceError::NotSymmetric);
                }
            }
        }
        Ok(Self { tickers, matrix })
    }

    /// Diagonal covariance from per-ticker variances.
    pub fn diagonal<I, S>(variances: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let (tickers, vars): (Vec<String>, Vec<f64>) =
            variances.into_iter().map(|(t, v)| (t.into(), v)).unzip();
        Self {
            tickers,
            matrix: Array2::from_diag(&Array1::from(vars)),
        }
    }

    /// Row and column labels.
    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Matrix values.
    pub const fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// Number of assets.
    pub const fn len(&self) -> usize {
        self.tickers.len()
    }

    /// Whether the matrix is empty.
    pub const fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    /// Restrict to `tickers`, in their order, dropping any this matrix lacks.
    pub fn align(&self, tickers: &[String]) -> Self {
        let indices: Vec<(String, usize)> = tickers
            .iter()
            .filter_map(|t| self.tickers.iter().position(|c| c == t).map(|i| (t.clone(), i)))
            .collect();
        let n = indices.len();
        let matrix = Array2::from_shape_fn((n, n), |(r, c)| {
            self.matrix[[indices[r].1, indices[c].1]]
        });
        Self {
            tickers: indices.into_iter().map(|(t, _)| t).collect(),
            matrix,
        }
    }

    /// Portfolio variance `w' Σ w` for weights in ticker order.
    pub fn portfolio_variance(&self, weights: &Array1<f64>) -> f64 {
        weights.dot(&self.matrix.dot(weights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_validates_shape() {
        let result = CovarianceMatrix::new(labels(&["A"]), Array2::eye(2));
        assert!(matches!(result, Err(CovarianceError::DimensionMismatch { .. })));

        let result = CovarianceMatrix::new(labels(&["A", "B"]), array![[1.0, 0.5], [0.2, 1.0]]);
        assert_eq!(result, Err(CovarianceError::NotSymmetric));
    }

    #[test]
    fn test_align_intersects_and_reorders() {
        let cov = CovarianceMatrix::new(
            labels(&["A", "B", "C"]),
            array![[1.0, 0.1, 0.2], [0.1, 2.0, 0.3], [0.2, 0.3, 3.0]],
        )
        .unwrap();
        let aligned = cov.align(&labels(&["C", "X", "A"]));
        assert_eq!(aligned.tickers(), &labels(&["C", "A"])[..]);
        assert_eq!(aligned.matrix(), &array![[3.0, 0.2], [0.2, 1.0]]);
    }

    #[test]
    fn test_portfolio_variance() {
        let cov = CovarianceMatrix::diagonal([("A", 0.04), ("B", 0.09)]);
        let variance = cov.portfolio_variance(&array![0.5, 0.5]);
        assert!((variance - 0.0325).abs() < 1e-12);
    }
}
