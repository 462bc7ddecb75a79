//! Value factors - measures of relative cheapness
//!
//! Hobart scores value from the trailing price to earnings ratio.

pub mod pe_ratio;

pub use pe_ratio::{PeValueConfig, PeValueFactor};
