//! Factor Registry
//!
//! Static metadata for every factor the scorer can blend.

use std::collections::HashMap;

/// Available factor categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactorCategory {
    /// Momentum factors (trailing price return)
    Momentum,
    /// Value factors (price to earnings)
    Value,
    /// Size factors (market capitalization)
    Size,
}

/// Factor metadata
#[derive(Debug, Clone)]
pub struct FactorInfo {
    /// Factor name (unique identifier)
    pub name: &'static str,
    /// Factor category
    pub category: FactorCategory,
    /// Brief description of what the factor measures
    pub description: &'static str,
    /// Inputs the factor reads
    pub inputs: &'static [&'static str],
    /// Weight in the default blend
    pub default_weight: f64,
}

/// Get all available factor info
pub fn available_factors() -> Vec<FactorInfo> {
    vec![
        FactorInfo {
            name: "price_momentum",
            category: FactorCategory::Momentum,
            description: "Trailing price return over the lookback (6 months)",
            inputs: &["date", "close"],
            default_weight: 0.8,
        },
        FactorInfo {
            name: "pe_value",
            category: FactorCategory::Value,
            description: "Cross-sectional position of the trailing P/E ratio",
            inputs: &["pe_ratio"],
            default_weight: 0.2,
        },
        FactorInfo {
            name: "market_cap_size",
            category: FactorCategory::Size,
            description: "Cross-sectional position of market capitalization",
            inputs: &["market_cap"],
            default_weight: 0.0,
        },
    ]
}

/// Get factors by category
pub fn factors_by_category(category: FactorCategory) -> Vec<FactorInfo> {
    available_factors()
        .into_iter()
        .filter(|f| f.category == category)
        .collect()
}

/// Get factor info by name
pub fn get_factor_info(name: &str) -> Option<FactorInfo> {
    available_factors().into_iter().find(|f| f.name == name)
}

/// Get a map of all factors indexed by name
pub fn factor_map() -> HashMap<&'static str, FactorInfo> {
    available_factors()
        .into_iter()
        .map(|f| (f.name, f))
        .collect()
}

/// List all factor names
pub fn list_factor_names() -> Vec<&'static str> {
    available_factors().into_iter().map(|f| f.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factor::{Factor, StyleFactor};
    use crate::{MarketCapFactor, PeValueFactor, PriceMomentumFactor};
    use approx::assert_relative_eq;

    #[test]
    fn test_available_factors_count() {
        assert_eq!(available_factors().len(), 3);
        assert_eq!(factor_map().len(), 3);
    }

    #[test]
    fn test_factors_by_category() {
        assert_eq!(factors_by_category(FactorCategory::Momentum).len(), 1);
        assert_eq!(factors_by_category(FactorCategory::Value).len(), 1);
        assert_eq!(factors_by_category(FactorCategory::Size).len(), 1);
    }

    #[test]
    fn test_get_factor_info() {
        let info = get_factor_info("pe_value").unwrap();
        assert_eq!(info.category, FactorCategory::Value);
        assert!(info.inputs.contains(&"pe_ratio"));
        assert!(get_factor_info("nonexistent_factor").is_none());
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let total: f64 = available_factors().iter().map(|f| f.default_weight).sum();
        assert_relative_eq!(total, 1.0);
    }

    #[test]
    fn test_registry_matches_implementations() {
        let names = list_factor_names();
        let momentum = PriceMomentumFactor::with_config(Default::default());
        assert!(names.contains(&momentum.name()));
        assert!(names.contains(&PeValueFactor::default().name()));
        assert!(names.contains(&MarketCapFactor::default().name()));

        for factor in [
            &momentum as &dyn Factor,
            &PeValueFactor::default(),
            &MarketCapFactor::default(),
        ] {
            let info = get_factor_info(factor.name()).unwrap();
            assert_eq!(info.category, factor.category());
        }
    }
}
