//! Target and current portfolio weights.

use hobart_data::Holdings;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Optimizer output: ticker weights in score order.
///
/// Weights are non-negative and sum to at most one; the remainder is cash.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetWeights {
    weights: Vec<(String, f64)>,
}

impl TargetWeights {
    /// Wrap ordered weights.
    pub const fn new(weights: Vec<(String, f64)>) -> Self {
        Self { weights }
    }

    /// Weight for a ticker, zero if absent.
    pub fn get(&self, ticker: &str) -> f64 {
        self.weights
            .iter()
            .find(|(t, _)| t == ticker)
            .map_or(0.0, |(_, w)| *w)
    }

    /// Iterate over `(ticker, weight)` in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(t, w)| (t.as_str(), *w))
    }

    /// Sum of weights.
    pub fn total(&self) -> f64 {
        self.weights.iter().map(|(_, w)| w).sum()
    }

    /// Number of tickers, including zero weights.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether there are no tickers.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Weights keyed by ticker.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.weights.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for TargetWeights {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(t, w)| (t.into(), w)).collect())
    }
}

/// Market-value weights of holdings, plus the total portfolio value.
///
/// The total includes `cash`. Tickers without a positive price contribute
/// nothing and are left out of the weights. Positions are summed in ticker
/// order, so equal inputs give bit-identical outputs.
pub fn current_weights(
    holdings: &Holdings,
    prices: &HashMap<String, f64>,
    cash: f64,
) -> (BTreeMap<String, f64>, f64) {
    let values: Vec<(&String, f64)> = holdings
        .iter()
        .filter_map(|(t, shares)| {
            prices
                .get(t)
                .filter(|p| p.is_finite() && **p > 0.0)
                .map(|p| (t, *shares as f64 * p))
        })
        .collect();

    let total = values.iter().map(|(_, v)| v).sum::<f64>() + cash;
    let weights = if total > 0.0 {
        values
            .into_iter()
            .map(|(t, v)| (t.clone(), v / total))
            .collect()
    } else {
        BTreeMap::new()
    };
    (weights, total)
}
