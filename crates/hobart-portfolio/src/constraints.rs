//! Declarative portfolio constraints.
//!
//! Constraints are plain values built once per cycle from configuration and
//! the universe buckets. The optimizer lowers them to linear rows and the
//! drift monitor checks them directly against current weights.

use crate::universe::{UniverseBucket, UniverseBuckets};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Weight caps and bucket floors applied to every optimization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintSet {
    /// Largest weight any single ticker may hold (default: 0.20)
    pub max_single_weight: f64,
    /// Smallest aggregate weight per bucket (default: 0.10 each)
    pub min_bucket_weight: BTreeMap<UniverseBucket, f64>,
}

impl Default for ConstraintSet {
    fn default() -> Self {
        Self {
            max_single_weight: 0.20,
            min_bucket_weight: UniverseBucket::ALL.into_iter().map(|b| (b, 0.10)).collect(),
        }
    }
}

impl ConstraintSet {
    /// Constraint set with a weight cap and no bucket floors.
    pub fn with_max_weight(max_single_weight: f64) -> Self {
        Self {
            max_single_weight,
            min_bucket_weight: BTreeMap::new(),
        }
    }

    /// Lower the configuration to constraints over `tickers`.
    ///
    /// Bucket floors are restricted to members present in `tickers`; a bucket
    /// with no such member yields no constraint.
    pub fn build(&self, buckets: &UniverseBuckets, tickers: &[String]) -> Vec<PortfolioConstraint> {
        let mut constraints = vec![PortfolioConstraint::MaxWeight {
            limit: self.max_single_weight,
        }];
        for (bucket, floor) in &self.min_bucket_weight {
            let members: Vec<String> = tickers
                .iter()
                .filter(|t| buckets.members(*bucket).contains(*t))
                .cloned()
                .collect();
            if members.is_empty() {
                tracing::debug!(bucket = %bucket, "omitting floor for empty bucket");
                continue;
            }
            constraints.push(PortfolioConstraint::MinBucketWeight {
                bucket: *bucket,
                members,
                floor: *floor,
            });
        }
        constraints
    }
}

/// One linear inequality `coefficients · w <= bound` over ticker indices.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRow {
    /// Sparse `(ticker index, coefficient)` pairs
    pub coefficients: Vec<(usize, f64)>,
    /// Right-hand side
    pub bound: f64,
}

/// A single portfolio constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PortfolioConstraint {
    /// Every weight is at most `limit`
    MaxWeight {
        /// Weight cap
        limit: f64,
    },
    /// Members of a bucket together hold at least `floor`
    MinBucketWeight {
        /// Bucket being constrained
        bucket: UniverseBucket,
        /// Tickers in the bucket
        members: Vec<String>,
        /// Aggregate weight floor
        floor: f64,
    },
}

/// A constraint breach found in a set of weights.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintViolation {
    /// A single weight exceeds the cap
    WeightTooLarge {
        /// Offending ticker
        ticker: String,
        /// Its weight
        weight: f64,
        /// The cap
        limit: f64,
    },
    /// A bucket's aggregate weight is below its floor
    BucketTooSmall {
        /// Offending bucket
        bucket: UniverseBucket,
        /// Aggregate weight
        weight: f64,
        /// The floor
        floor: f64,
    },
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WeightTooLarge {
                ticker,
                weight,
                limit,
            } => write!(f, "weight {weight:.4} for '{ticker}' exceeds max {limit:.4}"),
            Self::BucketTooSmall {
                bucket,
                weight,
                floor,
            } => write!(f, "bucket {bucket} weight {weight:.4} below min {floor:.4}"),
        }
    }
}

impl PortfolioConstraint {
    /// Linear rows over `tickers` expressing this constraint.
    pub fn linear_rows(&self, tickers: &[String]) -> Vec<LinearRow> {
        match self {
            Self::MaxWeight { limit } => (0..tickers.len())
                .map(|i| LinearRow {
                    coefficients: vec![(i, 1.0)],
                    bound: *limit,
                })
                .collect(),
            Self::MinBucketWeight { members, floor, .. } => {
                let coefficients: Vec<(usize, f64)> = tickers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| members.contains(t))
                    .map(|(i, _)| (i, -1.0))
                    .collect();
                if coefficients.is_empty() {
                    return Vec::new();
                }
                vec![LinearRow {
                    coefficients,
                    bound: -floor,
                }]
            }
        }
    }

    /// Breaches of this constraint in `weights`, compared strictly.
    pub fn violations(&self, weights: &BTreeMap<String, f64>) -> Vec<ConstraintViolation> {
        match self {
            Self::MaxWeight { limit } => weights
                .iter()
                .filter(|(_, w)| **w > *limit)
                .map(|(t, w)| ConstraintViolation::WeightTooLarge {
                    ticker: t.clone(),
                    weight: *w,
                    limit: *limit,
                })
                .collect(),
            Self::MinBucketWeight {
                bucket,
                members,
                floor,
            } => {
                let weight: f64 = members.iter().filter_map(|m| weights.get(m)).sum();
                if weight < *floor {
                    vec![ConstraintViolation::BucketTooSmall {
                        bucket: *bucket,
                        weight,
                        floor: *floor,
                    }]
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Whether `weights` satisfy this constraint within `tolerance`.
    pub fn is_satisfied(&self, weights: &BTreeMap<String, f64>, tolerance: f64) -> bool {
        match self {
            Self::MaxWeight { limit } => weights.values().all(|w| *w <= limit + tolerance),
            Self::MinBucketWeight { members, floor, .. } => {
                members.iter().filter_map(|m| weights.get(m)).sum::<f64>() >= floor - tolerance
            }
        }
    }
}
