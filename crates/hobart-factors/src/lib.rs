#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod factor;
pub mod momentum;
pub mod registry;
pub mod scaling;
pub mod scorer;
pub mod size;
pub mod value;

pub use error::{FactorError, Result};
pub use factor::{Factor, StyleFactor};
pub use momentum::{MomentumScores, PriceMomentumConfig, PriceMomentumFactor};
pub use registry::{
    FactorCategory, FactorInfo, available_factors, factors_by_category, get_factor_info,
};
pub use scaling::min_max_scale;
pub use scorer::{FactorConfig, FactorScore, FactorScorer, FactorWeights, ScoreBreakdown};
pub use size::{MarketCapConfig, MarketCapFactor};
pub use value::{PeValueConfig, PeValueFactor};
