#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod covariance;
pub mod model;

pub use covariance::{
    CovarianceError, CovarianceEstimator, CovarianceMatrix, LedoitWolfConfig, LedoitWolfEstimator,
    SampleCovarianceEstimator, ShrinkageTarget,
};
pub use model::{CovarianceConfig, CovarianceMethod, RiskModel};
