//! Drift detection against the constraint set.

use crate::constraints::{ConstraintSet, ConstraintViolation};
use crate::universe::UniverseBuckets;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether current weights still satisfy the constraints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriftState {
    /// Every constraint holds
    #[default]
    InBounds,
    /// At least one constraint is breached
    Violated,
}

/// Outcome of a drift check.
#[derive(Debug, Clone, PartialEq)]
pub struct DriftReport {
    /// Resulting state
    pub state: DriftState,
    /// Breaches found, empty when in bounds
    pub violations: Vec<ConstraintViolation>,
}

impl DriftReport {
    /// Whether a rebalance is warranted.
    pub const fn is_violated(&self) -> bool {
        matches!(self.state, DriftState::Violated)
    }
}

/// Two-state drift monitor.
///
/// Moves to [`DriftState::Violated`] as soon as any weight exceeds the cap or
/// any non-empty bucket falls below its floor. There is no hysteresis band.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriftMonitor {
    state: DriftState,
}

impl DriftMonitor {
    /// Create a monitor in the [`DriftState::InBounds`] state.
    pub const fn new() -> Self {
        Self {
            state: DriftState::InBounds,
        }
    }

    /// State after the last [`observe`](Self::observe).
    pub const fn state(&self) -> DriftState {
        self.state
    }

    /// Check `weights` against the constraints.
    ///
    /// Bucket floors apply to every non-empty bucket, so a bucket whose
    /// members are classified but not held counts as zero weight.
    pub fn evaluate(
        &self,
        weights: &BTreeMap<String, f64>,
        buckets: &UniverseBuckets,
        constraints: &ConstraintSet,
    ) -> DriftReport {
        let mut tickers = buckets.tickers();
        tickers.extend(weights.keys().filter(|t| buckets.bucket_of(t).is_none()).cloned());

        let violations: Vec<ConstraintViolation> = constraints
            .build(buckets, &tickers)
            .iter()
            .flat_map(|c| c.violations(weights))
            .collect();
        let state = if violations.is_empty() {
            DriftState::InBounds
        } else {
            DriftState::Violated
        };
        DriftReport { state, violations }
    }

    /// Whether `weights` breach any constraint.
    pub fn needs_rebalance(
        &self,
        weights: &BTreeMap<String, f64>,
        buckets: &UniverseBuckets,
        constraints: &ConstraintSet,
    ) -> bool {
        self.evaluate(weights, buckets, constraints).is_violated()
    }

    /// Evaluate and record the resulting state, logging transitions.
    pub fn observe(
        &mut self,
        weights: &BTreeMap<String, f64>,
        buckets: &UniverseBuckets,
        constraints: &ConstraintSet,
    ) -> DriftReport {
        let report = self.evaluate(weights, buckets, constraints);
        if report.state != self.state {
            tracing::info!(from = ?self.state, to = ?report.state, "drift state changed");
        }
        for violation in &report.violations {
            tracing::debug!(%violation, "constraint breached");
        }
        self.state = report.state;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe::UniverseBucket;

    fn buckets() -> UniverseBuckets {
        UniverseBuckets {
            small_caps: ["S"].iter().map(|s| s.to_string()).collect(),
            large_caps: ["L1", "L2"].iter().map(|s| s.to_string()).collect(),
            etfs: Default::default(),
        }
    }

    fn weights(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(t, w)| (t.to_string(), *w)).collect()
    }

    #[test]
    fn test_in_bounds() {
        let w = weights(&[("S", 0.15), ("L1", 0.2), ("L2", 0.2), ("X", 0.2)]);
        let report = DriftMonitor::new().evaluate(&w, &buckets(), &ConstraintSet::default());
        assert_eq!(report.state, DriftState::InBounds);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_cap_breach() {
        let w = weights(&[("S", 0.15), ("L1", 0.25), ("X", 0.2)]);
        let report = DriftMonitor::new().evaluate(&w, &buckets(), &ConstraintSet::default());
        assert_eq!(
            report.violations,
            vec![ConstraintViolation::WeightTooLarge {
                ticker: "L1".to_string(),
                weight: 0.25,
                limit: 0.20,
            }]
        );
    }

    #[test]
    fn test_unheld_bucket_breaches_floor() {
        let w = weights(&[("L1", 0.2), ("X", 0.2)]);
        let report = DriftMonitor::new().evaluate(&w, &buckets(), &ConstraintSet::default());
        assert!(report.violations.iter().any(|v| matches!(
            v,
            ConstraintViolation::BucketTooSmall {
                bucket: UniverseBucket::SmallCap,
                ..
            }
        )));
    }

    #[test]
    fn test_empty_bucket_never_breaches() {
        // ETF bucket has no members
        let w = weights(&[("S", 0.1), ("L1", 0.1)]);
        assert!(!DriftMonitor::new().needs_rebalance(&w, &buckets(), &ConstraintSet::default()));
    }

    #[test]
    fn test_boundary_is_in_bounds() {
        let w = weights(&[("S", 0.10), ("L1", 0.20)]);
        assert!(!DriftMonitor::new().needs_rebalance(&w, &buckets(), &ConstraintSet::default()));
    }

    #[test]
    fn test_observe_tracks_state() {
        let mut monitor = DriftMonitor::new();
        let bad = weights(&[("L1", 0.9)]);
        monitor.observe(&bad, &buckets(), &ConstraintSet::default());
        assert_eq!(monitor.state(), DriftState::Violated);

        let good = weights(&[("S", 0.1), ("L1", 0.2)]);
        monitor.observe(&good, &buckets(), &ConstraintSet::default());
        assert_eq!(monitor.state(), DriftState::InBounds);
    }
}
