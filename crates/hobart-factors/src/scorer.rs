//! Composite factor scorer.
//!
//! Blends scaled momentum, value and size into a single expected-return proxy
//! per ticker. Only tickers with a momentum score enter the output, and value
//! and size are scaled across those tickers alone. Both fall back to their
//! neutral scores when fundamentals are missing.

use crate::error::{FactorError, Result};
use crate::factor::StyleFactor;
use crate::momentum::{PriceMomentumConfig, PriceMomentumFactor};
use crate::size::{MarketCapConfig, MarketCapFactor};
use crate::value::{PeValueConfig, PeValueFactor};
use hobart_data::{FundamentalsMap, PriceHistory, SkipEvent};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Blend weights for the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    /// Momentum weight (default: 0.8)
    pub momentum: f64,
    /// Value weight (default: 0.2)
    pub value: f64,
    /// Size weight (default: 0.0)
    pub size: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self::new(0.8, 0.2, 0.0)
    }
}

impl FactorWeights {
    /// Create blend weights.
    pub const fn new(momentum: f64, value: f64, size: f64) -> Self {
        Self {
            momentum,
            value,
            size,
        }
    }

    /// Check that the weights are a convex combination.
    ///
    /// # Errors
    /// Returns [`FactorError::InvalidWeights`] if any weight is negative or
    /// non-finite, or the weights do not sum to one.
    pub fn validate(&self) -> Result<()> {
        let parts = [self.momentum, self.value, self.size];
        let sum: f64 = parts.iter().sum();
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0)
            || (sum - 1.0).abs() > WEIGHT_TOLERANCE
        {
            return Err(FactorError::InvalidWeights {
                momentum: self.momentum,
                value: self.value,
                size: self.size,
            });
        }
        Ok(())
    }
}

/// Configuration for the composite scorer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorConfig {
    /// Blend weights
    #[serde(default)]
    pub weights: FactorWeights,
    /// Momentum settings
    #[serde(default)]
    pub momentum: PriceMomentumConfig,
    /// Value settings
    #[serde(default)]
    pub value: PeValueConfig,
    /// Size settings
    #[serde(default)]
    pub size: MarketCapConfig,
}

/// Per-ticker factor contributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Ticker symbol
    pub ticker: String,
    /// Scaled momentum
    pub momentum: f64,
    /// Scaled value, or neutral
    pub value: f64,
    /// Scaled size, or neutral
    pub size: f64,
    /// Weighted blend
    pub combined: f64,
}

/// Combined expected-return proxy for a universe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    entries: Vec<ScoreBreakdown>,
    skipped: Vec<SkipEvent>,
}

impl FactorScore {
    /// Build a score directly from combined values, in the given order.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(t, s)| ScoreBreakdown {
                ticker: t.into(),
                momentum: s,
                value: s,
                size: s,
                combined: s,
            })
            .collect();
        Self {
            entries,
            skipped: Vec::new(),
        }
    }

    /// Tickers in score order.
    pub fn tickers(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.ticker.clone()).collect()
    }

    /// Combined scores in ticker order.
    pub fn combined(&self) -> Array1<f64> {
        self.entries.iter().map(|e| e.combined).collect()
    }

    /// Breakdown for one ticker.
    pub fn get(&self, ticker: &str) -> Option<&ScoreBreakdown> {
        self.entries.iter().find(|e| e.ticker == ticker)
    }

    /// Iterate over breakdowns in ticker order.
    pub fn iter(&self) -> impl Iterator<Item = &ScoreBreakdown> {
        self.entries.iter()
    }

    /// Number of scored tickers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no ticker was scored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tickers dropped while scoring.
    pub fn skipped(&self) -> &[SkipEvent] {
        &self.skipped
    }

    /// Keep only the given tickers, preserving score order.
    pub fn retain(&self, tickers: &[String]) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|e| tickers.contains(&e.ticker))
                .cloned()
                .collect(),
            skipped: self.skipped.clone(),
        }
    }
}

/// Scores a universe from price history and fundamentals.
#[derive(Debug, Clone)]
pub struct FactorScorer {
    config: FactorConfig,
    momentum: PriceMomentumFactor,
    value: PeValueFactor,
    size: MarketCapFactor,
}

impl FactorScorer {
    /// Create a scorer.
    ///
    /// # Errors
    /// Returns [`FactorError::InvalidWeights`] if the blend weights are not a
    /// convex combination, or [`FactorError::InvalidConfig`] for a zero
    /// lookback or an out-of-range missing fraction.
    pub fn new(config: FactorConfig) -> Result<Self> {
        config.weights.validate()?;
        if config.momentum.lookback == 0 {
            return Err(FactorError::InvalidConfig(
                "momentum lookback must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&config.momentum.max_missing_fraction) {
            return Err(FactorError::InvalidConfig(format!(
                "max_missing_fraction {} outside [0, 1]",
                config.momentum.max_missing_fraction
            )));
        }
        Ok(Self {
            config,
            momentum: PriceMomentumFactor::with_config(config.momentum),
            value: PeValueFactor::with_config(config.value),
            size: MarketCapFactor::with_config(config.size),
        })
    }

    /// Current configuration.
    pub const fn config(&self) -> &FactorConfig {
        &self.config
    }

    /// Score every ticker in `history` as of its last row.
    ///
    /// # Errors
    /// Returns [`FactorError::InsufficientHistory`] when the trailing window
    /// is too short for the momentum lookback.
    pub fn score(
        &self,
        history: &PriceHistory,
        fundamentals: &FundamentalsMap,
    ) -> Result<FactorScore> {
        let momentum = self.momentum.compute(history)?;
        // cross-sectional scaling runs over the priced universe only
        let scored: FundamentalsMap = momentum
            .tickers
            .iter()
            .filter_map(|t| fundamentals.get(t).map(|f| (t.clone(), *f)))
            .collect();
        let value = self.value.compute(&scored);
        let size = self.size.compute(&scored);
        let w = self.config.weights;

        let entries = momentum
            .tickers
            .iter()
            .zip(&momentum.scaled)
            .map(|(ticker, m)| {
                let v = self.value.score_or_neutral(&value, ticker);
                let s = self.size.score_or_neutral(&size, ticker);
                ScoreBreakdown {
                    ticker: ticker.clone(),
                    momentum: *m,
                    value: v,
                    size: s,
                    combined: w.momentum * m + w.value * v + w.size * s,
                }
            })
            .collect();

        Ok(FactorScore {
            entries,
            skipped: momentum.skipped,
        })
    }
}
