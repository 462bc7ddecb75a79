//! Pairwise-complete sample covariance
//!
//! Each entry uses the periods where both assets have a return, so a short
//! gap in one ticker does not discard history for the rest of the universe.

use super::{CovarianceError, CovarianceEstimator};
use ndarray::Array2;

/// Unbiased sample covariance estimator tolerant of missing returns.
#[derive(Debug, Clone, Copy)]
pub struct SampleCovarianceEstimator {
    min_periods: usize,
}

impl Default for SampleCovarianceEstimator {
    fn default() -> Self {
        Self { min_periods: 2 }
    }
}

impl SampleCovarianceEstimator {
    /// Create an estimator requiring `min_periods` overlapping returns per pair.
    pub const fn new(min_periods: usize) -> Self {
        Self { min_periods }
    }

    fn pair_covariance(&self, returns: &Array2<f64>, i: usize, j: usize) -> Option<f64> {
        let pairs: Vec<(f64, f64)> = returns
            .column(i)
            .iter()
            .zip(returns.column(j))
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .map(|(x, y)| (*x, *y))
            .collect();

        let n = pairs.len();
        if n < self.min_periods.max(2) {
            return None;
        }
        let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n as f64;
        let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n as f64;
        let cross: f64 = pairs
            .iter()
            .map(|(x, y)| (x - mean_x) * (y - mean_y))
            .sum();
        Some(cross / (n - 1) as f64)
    }
}

impl CovarianceEstimator for SampleCovarianceEstimator {
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
        let n_assets = returns.ncols();
        let mut cov = Array2::zeros((n_assets, n_assets));

        for i in 0..n_assets {
            let variance = self.pair_covariance(returns, i, i).ok_or_else(|| {
                CovarianceError::InsufficientData {
                    required: self.min_periods.max(2),
                    actual: returns.column(i).iter().filter(|r| r.is_finite()).count(),
                }
            })?;
            cov[[i, i]] = variance;

            for j in 0..i {
                // Pairs without enough overlap are treated as uncorrelated
                let value = self.pair_covariance(returns, i, j).unwrap_or(0.0);
                cov[[i, j]] = value;
                cov[[j, i]] = value;
            }
        }
        Ok(cov)
    }
}
