//! Risk Model
//!
//! Turns a price panel into an annualized asset covariance matrix:
//!
//! Σ = f · Cov(r)
//!
//! where:
//! - r = daily simple returns on forward-filled closes
//! - f = periods per year (252 for daily data)
//! - Cov = the configured estimator, followed by spectral repair

use crate::covariance::{
    CovarianceError, CovarianceEstimator, CovarianceMatrix, LedoitWolfConfig,
    LedoitWolfEstimator, SampleCovarianceEstimator, clip_to_positive_semidefinite,
};
use hobart_data::PriceHistory;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Covariance estimation method
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CovarianceMethod {
    /// Pairwise-complete sample covariance
    #[default]
    Sample,
    /// Ledoit-Wolf shrinkage on complete periods
    LedoitWolf(LedoitWolfConfig),
}

/// Risk model configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CovarianceConfig {
    /// Estimation method (default: sample)
    pub method: CovarianceMethod,
    /// Periods per year used to annualize (default: 252)
    pub frequency: f64,
    /// Clip negative eigenvalues after estimation (default: true)
    pub repair: bool,
}

impl Default for CovarianceConfig {
    fn default() -> Self {
        Self {
            method: CovarianceMethod::Sample,
            frequency: 252.0,
            repair: true,
        }
    }
}

/// Asset risk model
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskModel {
    config: CovarianceConfig,
}

impl RiskModel {
    /// Create a new risk model
    pub const fn new(config: CovarianceConfig) -> Self {
        Self { config }
    }

    /// Current configuration
    pub const fn config(&self) -> &CovarianceConfig {
        &self.config
    }

    /// Annualized covariance of every ticker in `history`
    ///
    /// # Errors
    /// Returns an error if any ticker has fewer than two returns, or the
    /// frequency is not positive.
    pub fn covariance(&self, history: &PriceHistory) -> Result<CovarianceMatrix, CovarianceError> {
        if !(self.config.frequency.is_finite() && self.config.frequency > 0.0) {
            return Err(CovarianceError::InvalidParameter(format!(
                "frequency {} must be positive",
                self.config.frequency
            )));
        }

        let returns = history.returns();
        let per_period = match self.config.method {
            CovarianceMethod::Sample => SampleCovarianceEstimator::default().estimate(&returns)?,
            CovarianceMethod::LedoitWolf(config) => {
                LedoitWolfEstimator::new(config).estimate(&returns)?
            }
        };

        let mut annualized = per_period * self.config.frequency;
        if self.config.repair {
            annualized = clip_to_positive_semidefinite(&annualized)?;
        }
        CovarianceMatrix::new(history.tickers().to_vec(), annualized)
    }

    /// Portfolio volatility `sqrt(w' Σ w)` for weights in the matrix's ticker order
    pub fn portfolio_volatility(cov: &CovarianceMatrix, weights: &Array1<f64>) -> f64 {
        cov.portfolio_variance(weights).max(0.0).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};
    use ndarray::array;

    fn history() -> PriceHistory {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = (0..5).map(|i| start + Duration::days(i)).collect();
        let prices = array![
            [100.0, 50.0],
            [101.0, 50.5],
            [99.0, 50.0],
            [102.0, 51.0],
            [103.0, 50.0]
        ];
        PriceHistory::new(dates, vec!["A".into(), "B".into()], prices).unwrap()
    }

    #[test]
    fn test_sample_covariance_is_annualized() {
        let model = RiskModel::default();
        let cov = model.covariance(&history()).unwrap();
        let daily = SampleCovarianceEstimator::default()
            .estimate(&history().returns())
            .unwrap();
        assert_eq!(cov.tickers(), &["A".to_string(), "B".to_string()]);
        assert_relative_eq!(cov.matrix()[[0, 0]], daily[[0, 0]] * 252.0, epsilon = 1e-12);
        assert_relative_eq!(cov.matrix()[[0, 1]], daily[[0, 1]] * 252.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ledoit_wolf_method() {
        let model = RiskModel::new(CovarianceConfig {
            method: CovarianceMethod::LedoitWolf(LedoitWolfConfig::default()),
            ..Default::default()
        });
        let cov = model.covariance(&history()).unwrap();
        assert!(cov.matrix().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_rejects_bad_frequency() {
        let model = RiskModel::new(CovarianceConfig {
            frequency: 0.0,
            ..Default::default()
        });
        assert!(matches!(
            model.covariance(&history()),
            Err(CovarianceError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_portfolio_volatility() {
        let cov = CovarianceMatrix::diagonal([("A", 0.04), ("B", 0.0)]);
        let vol = RiskModel::portfolio_volatility(&cov, &array![1.0, 0.0]);
        assert_relative_eq!(vol, 0.2);
    }
}
