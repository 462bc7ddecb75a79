//! Per-cycle scoring, optimization and reconciliation.

use crate::config::HobartConfig;
use crate::error::Result;
use hobart_data::{FundamentalsMap, Holdings, OrderIntent, PriceHistory, SkipEvent};
use hobart_factors::{FactorScore, FactorScorer};
use hobart_portfolio::{
    DriftMonitor, DriftReport, PortfolioOptimizer, Reconciler, Reconciliation, TargetWeights,
    UniverseBuckets, UniverseClassifier,
};
use hobart_risk::RiskModel;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// What a cycle did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CycleOutcome {
    /// Weights were within constraints; nothing traded
    InBounds,
    /// New targets were computed and these orders emitted
    Rebalanced {
        /// Orders emitted this cycle
        orders: Vec<OrderIntent>,
    },
    /// Re-optimization failed; previous holdings kept
    Skipped(SkipEvent),
}

impl CycleOutcome {
    /// Whether the cycle traded.
    pub const fn is_rebalanced(&self) -> bool {
        matches!(self, Self::Rebalanced { .. })
    }

    /// Whether the cycle was skipped.
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// Scores and weights produced by one optimization.
#[derive(Debug, Clone, PartialEq)]
pub struct Targets {
    /// Composite scores the weights were solved from
    pub scores: FactorScore,
    /// Optimized weights
    pub weights: TargetWeights,
}

/// The configured components, wired in cycle order.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: HobartConfig,
    scorer: FactorScorer,
    risk: RiskModel,
    optimizer: PortfolioOptimizer,
    classifier: UniverseClassifier,
    reconciler: Reconciler,
    monitor: DriftMonitor,
}

impl Pipeline {
    /// Validate `config` and build every component from it.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: HobartConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            scorer: FactorScorer::new(config.factors)?,
            risk: RiskModel::new(config.covariance),
            optimizer: PortfolioOptimizer::new(config.optimizer),
            classifier: UniverseClassifier::new(config.classifier.clone()),
            reconciler: Reconciler::new(config.reconciler),
            monitor: DriftMonitor::new(),
            config,
        })
    }

    /// Configuration the pipeline was built from.
    pub const fn config(&self) -> &HobartConfig {
        &self.config
    }

    /// Calendar days of history a cycle needs.
    pub const fn window_days(&self) -> i64 {
        self.config.factors.momentum.window_days
    }

    /// Bucket the universe.
    pub fn classify(&self, fundamentals: &FundamentalsMap) -> UniverseBuckets {
        self.classifier.classify(fundamentals)
    }

    /// Check current weights against the constraints.
    pub fn drift(&self, weights: &BTreeMap<String, f64>, buckets: &UniverseBuckets) -> DriftReport {
        self.monitor.evaluate(weights, buckets, &self.config.constraints)
    }

    /// Score the universe as of the last row of `history` and optimize.
    ///
    /// Covariance is estimated over the same trailing window the scorer uses,
    /// restricted to scored tickers.
    ///
    /// # Errors
    /// Returns the scoring, covariance or optimization error that ended the
    /// attempt; [`HobartError::skip_reason`](crate::HobartError::skip_reason)
    /// turns it into a cycle skip.
    pub fn target_weights(
        &self,
        history: &PriceHistory,
        fundamentals: &FundamentalsMap,
        buckets: &UniverseBuckets,
    ) -> Result<Targets> {
        let scores = self.scorer.score(history, fundamentals)?;
        let window = match history.last_date() {
            Some(as_of) => history.trailing_window(as_of, self.window_days()),
            None => history.clone(),
        };
        let covariance = self.risk.covariance(&window.select(&scores.tickers()))?;
        let weights = self.optimizer.optimize_with_buckets(
            &scores,
            &covariance,
            buckets,
            &self.config.constraints,
        )?;
        Ok(Targets { scores, weights })
    }

    /// Share deltas moving `holdings` to `targets`.
    pub fn reconcile(
        &self,
        targets: &TargetWeights,
        capital: f64,
        holdings: &Holdings,
        prices: &HashMap<String, f64>,
    ) -> Reconciliation {
        self.reconciler.delta(targets, capital, holdings, prices)
    }
}

/// Whether every position is flat.
pub(crate) fn is_uninvested(holdings: &Holdings) -> bool {
    holdings.values().all(|q| *q == 0)
}

/// Market value of `holdings` at `prices`; unpriced tickers count as zero.
pub(crate) fn holdings_value(holdings: &Holdings, prices: &HashMap<String, f64>) -> f64 {
    holdings
        .iter()
        .filter_map(|(t, q)| {
            prices
                .get(t)
                .filter(|p| p.is_finite() && **p > 0.0)
                .map(|p| *q as f64 * p)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holdings_value_skips_unpriced() {
        let holdings: Holdings = [("A".to_string(), 10), ("B".to_string(), 5)].into();
        let prices: HashMap<String, f64> = [("A".to_string(), 2.5)].into();
        assert_eq!(holdings_value(&holdings, &prices), 25.0);
        assert!(!is_uninvested(&holdings));
        assert!(is_uninvested(&Holdings::new()));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = HobartConfig::default();
        config.constraints.max_single_weight = 1.5;
        assert!(Pipeline::new(config).is_err());
    }
}
