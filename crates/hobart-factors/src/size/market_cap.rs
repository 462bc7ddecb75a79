//! Market Cap Size Factor
//!
//! Min-max scales market capitalization, so larger companies score higher.
//! Disabled in the default blend; tickers without a known market cap receive
//! the neutral score.

use crate::factor::{Factor, StyleFactor};
use crate::registry::FactorCategory;
use crate::scaling::min_max_scale;
use hobart_data::FundamentalsMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for the MarketCap factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketCapConfig {
    /// Score for tickers without a known market cap (default: 0.5)
    pub neutral: f64,
}

impl Default for MarketCapConfig {
    fn default() -> Self {
        Self { neutral: 0.5 }
    }
}

/// MarketCap scores tickers by their position in the market cap cross-section
#[derive(Debug, Clone, Default)]
pub struct MarketCapFactor {
    config: MarketCapConfig,
}

impl MarketCapFactor {
    /// Scaled scores for every ticker with a known market cap.
    pub fn compute(&self, fundamentals: &FundamentalsMap) -> BTreeMap<String, f64> {
        let (tickers, caps): (Vec<&String>, Vec<f64>) = fundamentals
            .iter()
            .filter_map(|(t, f)| f.known_market_cap().map(|cap| (t, cap)))
            .unzip();
        tickers.into_iter().cloned().zip(min_max_scale(&caps)).collect()
    }

    /// Score for one ticker, falling back to the neutral score.
    pub fn score_or_neutral(&self, scores: &BTreeMap<String, f64>, ticker: &str) -> f64 {
        scores.get(ticker).copied().unwrap_or(self.config.neutral)
    }
}

impl Factor for MarketCapFactor {
    fn name(&self) -> &str {
        "market_cap_size"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Size
    }

    fn neutral_score(&self) -> Option<f64> {
        Some(self.config.neutral)
    }
}

impl StyleFactor for MarketCapFactor {
    type Config = MarketCapConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}
