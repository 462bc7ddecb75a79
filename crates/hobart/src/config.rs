//! Engine configuration.
//!
//! Every section has defaults matching the reference strategy, so an empty
//! JSON object is a complete configuration. Files are validated on load.

use crate::error::{HobartError, Result};
use chrono::NaiveDate;
use hobart_factors::FactorConfig;
use hobart_portfolio::{ClassifierConfig, ConstraintSet, OptimizerConfig, ReconcilerConfig};
use hobart_risk::CovarianceConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Backtest settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Starting cash (default: 1,000,000)
    pub initial_capital: f64,
    /// First date to simulate, inclusive (default: first date in the panel)
    pub start: Option<NaiveDate>,
    /// Last date to simulate, inclusive (default: last date in the panel)
    pub end: Option<NaiveDate>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 1_000_000.0,
            start: None,
            end: None,
        }
    }
}

/// Live rebalance settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalanceConfig {
    /// Skip the drift gate and always re-optimize (default: false)
    pub force: bool,
    /// Capital to allocate when the account reports none (default: off)
    pub fallback_capital: Option<f64>,
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HobartConfig {
    /// Factor scoring
    pub factors: FactorConfig,
    /// Covariance estimation
    pub covariance: CovarianceConfig,
    /// Weight cap and bucket floors
    pub constraints: ConstraintSet,
    /// Solver settings
    pub optimizer: OptimizerConfig,
    /// Bucket thresholds and ETF list
    pub classifier: ClassifierConfig,
    /// Order emission policy
    pub reconciler: ReconcilerConfig,
    /// Backtest settings
    pub backtest: BacktestConfig,
    /// Live rebalance settings
    pub rebalance: RebalanceConfig,
}

impl HobartConfig {
    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or fails validation.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Serialize as pretty JSON.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check cross-field invariants.
    ///
    /// # Errors
    /// Returns [`HobartError::Config`] describing the first problem found, or
    /// the factor error for invalid blend weights.
    pub fn validate(&self) -> Result<()> {
        self.factors.weights.validate()?;

        let cap = self.constraints.max_single_weight;
        if !(cap > 0.0 && cap <= 1.0) {
            return Err(invalid(format!("max_single_weight {cap} outside (0, 1]")));
        }
        let mut floors = 0.0;
        for (bucket, floor) in &self.constraints.min_bucket_weight {
            if !(0.0..=1.0).contains(floor) {
                return Err(invalid(format!("floor {floor} for {bucket} outside [0, 1]")));
            }
            floors += floor;
        }
        if floors > 1.0 + 1e-9 {
            return Err(invalid(format!("bucket floors sum to {floors}, above 1")));
        }

        if self.classifier.small_cap_ceiling > self.classifier.large_cap_floor {
            return Err(invalid(format!(
                "small_cap_ceiling {} above large_cap_floor {}",
                self.classifier.small_cap_ceiling, self.classifier.large_cap_floor
            )));
        }

        if self.optimizer.weight_cutoff < 0.0 {
            return Err(invalid("weight_cutoff must be non-negative".to_string()));
        }
        if let Some(limit) = self.optimizer.time_limit_secs {
            if !(limit > 0.0) {
                return Err(invalid(format!("time_limit_secs {limit} must be positive")));
            }
        }
        if !(self.covariance.frequency > 0.0) {
            return Err(invalid("covariance frequency must be positive".to_string()));
        }

        if !(self.backtest.initial_capital > 0.0) {
            return Err(invalid("initial_capital must be positive".to_string()));
        }
        if let (Some(start), Some(end)) = (self.backtest.start, self.backtest.end) {
            if start > end {
                return Err(invalid(format!("backtest start {start} after end {end}")));
            }
        }
        if let Some(fallback) = self.rebalance.fallback_capital {
            if !(fallback > 0.0) {
                return Err(invalid("fallback_capital must be positive".to_string()));
            }
        }
        Ok(())
    }
}

const fn invalid(message: String) -> HobartError {
    HobartError::Config(message)
}
