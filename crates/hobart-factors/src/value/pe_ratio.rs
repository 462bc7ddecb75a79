//! PE Value Factor
//!
//! Places each ticker's trailing P/E on `[0, 1]` relative to the cross-section
//! with `(min(PE) - PE) / (min(PE) - max(PE))`. Tickers without a finite P/E
//! receive the neutral score so missing fundamentals are not penalized.

use crate::factor::{Factor, StyleFactor};
use crate::registry::FactorCategory;
use crate::scaling::min_max_scale;
use hobart_data::FundamentalsMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for the PeValue factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeValueConfig {
    /// Score for tickers without a finite P/E (default: 0.5)
    pub neutral: f64,
}

impl Default for PeValueConfig {
    fn default() -> Self {
        Self { neutral: 0.5 }
    }
}

/// PeValue scores tickers by their position in the P/E cross-section
#[derive(Debug, Clone, Default)]
pub struct PeValueFactor {
    config: PeValueConfig,
}

impl PeValueFactor {
    /// Scaled scores for every ticker with a finite P/E.
    pub fn compute(&self, fundamentals: &FundamentalsMap) -> BTreeMap<String, f64> {
        let (tickers, ratios): (Vec<&String>, Vec<f64>) = fundamentals
            .iter()
            .filter_map(|(t, f)| f.known_pe_ratio().map(|pe| (t, pe)))
            .unzip();
        tickers
            .into_iter()
            .cloned()
            .zip(min_max_scale(&ratios))
            .collect()
    }

    /// Score for one ticker, falling back to the neutral score.
    pub fn score_or_neutral(&self, scores: &BTreeMap<String, f64>, ticker: &str) -> f64 {
        scores.get(ticker).copied().unwrap_or(self.config.neutral)
    }
}

impl Factor for PeValueFactor {
    fn name(&self) -> &str {
        "pe_value"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Value
    }

    fn neutral_score(&self) -> Option<f64> {
        Some(self.config.neutral)
    }
}

impl StyleFactor for PeValueFactor {
    type Config = PeValueConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}
