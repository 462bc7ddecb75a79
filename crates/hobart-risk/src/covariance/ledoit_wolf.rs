//! Ledoit-Wolf Shrinkage Covariance Estimator
//!
//! Implements the analytical shrinkage estimator from:
//! "Honey, I Shrunk the Sample Covariance Matrix" (Ledoit & Wolf, 2004)
//!
//! The estimator has the form:
//! Σ_LW = δ* F + (1-δ*) S
//!
//! where:
//! - S is the sample covariance matrix
//! - F is the shrinkage target
//! - δ* is the shrinkage intensity, estimated from the sample
//!
//! Only periods where every asset has a return are used.

use super::{CovarianceError, CovarianceEstimator};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Shrinkage target types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ShrinkageTarget {
    /// Identity matrix scaled by average variance: F = μ * I where μ = trace(S)/n
    #[default]
    Identity,

    /// Diagonal matrix (no off-diagonal elements)
    Diagonal,

    /// Sample variances with the average pairwise correlation
    ConstantCorrelation,
}

/// Ledoit-Wolf covariance estimator configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedoitWolfConfig {
    /// Minimum number of complete periods required (default: 2)
    pub min_observations: usize,

    /// Shrinkage target type (default: Identity)
    pub target: ShrinkageTarget,
}

impl Default for LedoitWolfConfig {
    fn default() -> Self {
        Self {
            min_observations: 2,
            target: ShrinkageTarget::Identity,
        }
    }
}

/// Ledoit-Wolf shrinkage covariance estimator
#[derive(Debug, Clone, Copy, Default)]
pub struct LedoitWolfEstimator {
    config: LedoitWolfConfig,
}

impl LedoitWolfEstimator {
    /// Create a new Ledoit-Wolf estimator with the given configuration
    pub const fn new(config: LedoitWolfConfig) -> Self {
        Self { config }
    }

    /// Rows with no missing return, centered on their column means.
    fn complete_centered(returns: &Array2<f64>) -> Array2<f64> {
        let complete: Vec<usize> = returns
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(_, row)| row.iter().all(|r| r.is_finite()))
            .map(|(i, _)| i)
            .collect();
        let rows = returns.select(Axis(0), &complete);
        match rows.mean_axis(Axis(0)) {
            Some(means) => &rows - &means.insert_axis(Axis(0)),
            None => rows,
        }
    }

    /// Compute the shrinkage target matrix F
    fn shrinkage_target(&self, sample_cov: &Array2<f64>) -> Array2<f64> {
        let n_assets = sample_cov.nrows();

        match self.config.target {
            ShrinkageTarget::Identity => {
                let mu = sample_cov.diag().sum() / n_assets as f64;
                Array2::eye(n_assets) * mu
            }

            ShrinkageTarget::Diagonal => Array2::from_diag(&sample_cov.diag().to_owned()),

            ShrinkageTarget::ConstantCorrelation => {
                let std_devs: Array1<f64> = sample_cov.diag().mapv(f64::sqrt);

                let mut sum_corr = 0.0;
                let mut count = 0;
                for i in 0..n_assets {
                    for j in (i + 1)..n_assets {
                        let denom = std_devs[i] * std_devs[j];
                        if denom > 0.0 {
                            sum_corr += sample_cov[[i, j]] / denom;
                            count += 1;
                        }
                    }
                }
                let avg_corr = if count > 0 {
                    sum_corr / count as f64
                } else {
                    0.0
                };

                Array2::from_shape_fn((n_assets, n_assets), |(i, j)| {
                    if i == j {
                        sample_cov[[i, i]]
                    } else {
                        avg_corr * std_devs[i] * std_devs[j]
                    }
                })
            }
        }
    }

    /// Shrinkage intensity δ* = min(b̄², d²) / d²
    ///
    /// b̄² is the average squared distance of the per-period outer products
    /// from S, divided by the number of periods; d² = ||S - F||²_F.
    fn shrinkage_intensity(
        centered: &Array2<f64>,
        sample_cov: &Array2<f64>,
        target: &Array2<f64>,
    ) -> f64 {
        let (n_periods, n_assets) = centered.dim();
        let n = n_periods as f64;

        let mut b_bar = 0.0;
        for y_t in centered.rows() {
            for i in 0..n_assets {
                for j in 0..n_assets {
                    let diff = y_t[i] * y_t[j] - sample_cov[[i, j]];
                    b_bar += diff * diff;
                }
            }
        }
        b_bar /= n * n;

        let d2: f64 = (sample_cov - target).mapv(|v| v * v).sum();
        if d2 > 0.0 {
            (b_bar.min(d2) / d2).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Shrinkage intensity the estimator would apply to `returns`.
    ///
    /// # Errors
    /// Returns an error if fewer than `min_observations` complete periods exist.
    pub fn shrinkage(&self, returns: &Array2<f64>) -> Result<f64, CovarianceError> {
        let centered = self.checked_rows(returns)?;
        let sample_cov = centered.t().dot(&centered) / centered.nrows() as f64;
        let target = self.shrinkage_target(&sample_cov);
        Ok(Self::shrinkage_intensity(&centered, &sample_cov, &target))
    }

    fn checked_rows(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
        let centered = Self::complete_centered(returns);
        let required = self.config.min_observations.max(2);
        if centered.nrows() < required {
            return Err(CovarianceError::InsufficientData {
                required,
                actual: centered.nrows(),
            });
        }
        Ok(centered)
    }
}

impl CovarianceEstimator for LedoitWolfEstimator {
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
        let centered = self.checked_rows(returns)?;
        let sample_cov = centered.t().dot(&centered) / centered.nrows() as f64;
        let target = self.shrinkage_target(&sample_cov);
        let delta = Self::shrinkage_intensity(&centered, &sample_cov, &target);
        tracing::debug!(delta, periods = centered.nrows(), "ledoit-wolf shrinkage");

        Ok(&target * delta + &sample_cov * (1.0 - delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn returns() -> Array2<f64> {
        array![
            [0.010, 0.020, -0.005],
            [0.030, 0.010, 0.002],
            [-0.020, 0.000, 0.011],
            [0.020, 0.030, -0.004],
            [0.005, -0.010, 0.007],
            [0.012, 0.004, 0.000],
        ]
    }

    #[test]
    fn test_shrinkage_in_unit_interval() {
        for target in [
            ShrinkageTarget::Identity,
            ShrinkageTarget::Diagonal,
            ShrinkageTarget::ConstantCorrelation,
        ] {
            let estimator = LedoitWolfEstimator::new(LedoitWolfConfig {
                target,
                ..Default::default()
            });
            let delta = estimator.shrinkage(&returns()).unwrap();
            assert!((0.0..=1.0).contains(&delta), "{target:?} gave {delta}");
        }
    }

    #[test]
    fn test_estimate_is_symmetric_and_shrinks_toward_target() {
        let estimator = LedoitWolfEstimator::default();
        let cov = estimator.estimate(&returns()).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(cov[[i, j]], cov[[j, i]], epsilon = 1e-15);
            }
        }

        let centered = LedoitWolfEstimator::complete_centered(&returns());
        let sample = centered.t().dot(&centered) / 6.0;
        // Identity target keeps the trace
        assert_relative_eq!(cov.diag().sum(), sample.diag().sum(), epsilon = 1e-15);
        // and pulls off-diagonals toward zero
        assert!(cov[[0, 1]].abs() <= sample[[0, 1]].abs());
    }

    #[test]
    fn test_incomplete_rows_dropped() {
        let nan = f64::NAN;
        let returns = array![[0.01, nan], [0.02, 0.01], [0.00, 0.03]];
        let cov = LedoitWolfEstimator::default().estimate(&returns).unwrap();
        assert!(cov.iter().all(|v| v.is_finite()));

        let too_few = array![[0.01, nan], [0.02, 0.01]];
        assert!(matches!(
            LedoitWolfEstimator::default().estimate(&too_few),
            Err(CovarianceError::InsufficientData { required: 2, actual: 1 })
        ));
    }
}
