#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod constraints;
pub mod drift;
pub mod error;
pub mod optimizer;
pub mod reconcile;
pub mod universe;
pub mod weights;

pub use constraints::{ConstraintSet, ConstraintViolation, LinearRow, PortfolioConstraint};
pub use drift::{DriftMonitor, DriftReport, DriftState};
pub use error::{OptimizeError, Result};
pub use optimizer::{OptimizerConfig, PortfolioOptimizer};
pub use reconcile::{OrderSequencing, Reconciler, ReconcilerConfig, Reconciliation};
pub use universe::{ClassifierConfig, UniverseBucket, UniverseBuckets, UniverseClassifier};
pub use weights::{TargetWeights, current_weights};
