//! Common factor traits.

use crate::registry::FactorCategory;

/// A cross-sectional factor.
pub trait Factor {
    /// Unique factor name, matching the registry.
    fn name(&self) -> &str;

    /// Factor category.
    fn category(&self) -> FactorCategory;

    /// Score assigned to tickers the factor cannot evaluate, or `None` if such
    /// tickers are dropped from the cross-section instead.
    fn neutral_score(&self) -> Option<f64>;
}

/// A factor driven by a serde configuration.
pub trait StyleFactor: Factor + Sized {
    /// Configuration type
    type Config;

    /// Build the factor from its configuration.
    fn with_config(config: Self::Config) -> Self;

    /// Current configuration.
    fn config(&self) -> &Self::Config;
}
