//! Price Momentum Factor
//!
//! Measures the simple return over a lookback of trading rows (typically 126,
//! about six months) ending at the last row of the history.

use crate::error::{FactorError, Result};
use crate::factor::{Factor, StyleFactor};
use crate::registry::FactorCategory;
use crate::scaling::min_max_scale;
use hobart_data::{PriceHistory, SkipEvent, SkipReason};
use serde::{Deserialize, Serialize};

/// Configuration for the PriceMomentum factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceMomentumConfig {
    /// Lookback in rows (default: 126 for ~6 months)
    pub lookback: usize,
    /// Calendar days of trailing history considered (default: 365)
    pub window_days: i64,
    /// Largest tolerated fraction of missing prices in the window (default: 0.2)
    pub max_missing_fraction: f64,
}

impl Default for PriceMomentumConfig {
    fn default() -> Self {
        Self {
            lookback: 126,
            window_days: 365,
            max_missing_fraction: 0.2,
        }
    }
}

/// Raw and scaled momentum for the tickers that survived filtering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MomentumScores {
    /// Tickers in panel order
    pub tickers: Vec<String>,
    /// Raw lookback returns
    pub raw: Vec<f64>,
    /// Min-max scaled returns
    pub scaled: Vec<f64>,
    /// Tickers dropped from the cross-section
    pub skipped: Vec<SkipEvent>,
}

impl MomentumScores {
    /// Scaled momentum for a ticker.
    pub fn get(&self, ticker: &str) -> Option<f64> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.scaled[i])
    }
}

/// PriceMomentum computes lookback returns over a trailing calendar window
#[derive(Debug, Clone, Default)]
pub struct PriceMomentumFactor {
    config: PriceMomentumConfig,
}

impl PriceMomentumFactor {
    /// Rows a window must hold to compute momentum.
    pub const fn required_rows(&self) -> usize {
        self.config.lookback + 1
    }

    /// Fewest observations a ticker may have in a window of `rows` rows.
    pub fn min_observations(&self, rows: usize) -> usize {
        let keep = (1.0 - self.config.max_missing_fraction).clamp(0.0, 1.0);
        (keep * rows as f64 + 1e-9).floor() as usize
    }

    /// Compute momentum as of the last row of `history`.
    ///
    /// # Errors
    /// Returns [`FactorError::InsufficientHistory`] when the trailing window
    /// holds fewer than `lookback + 1` rows.
    pub fn compute(&self, history: &PriceHistory) -> Result<MomentumScores> {
        let Some(as_of) = history.last_date() else {
            return Err(FactorError::InsufficientHistory {
                required: self.required_rows(),
                available: 0,
            });
        };
        let window = history.trailing_window(as_of, self.config.window_days);
        let rows = window.len();
        if rows < self.required_rows() {
            return Err(FactorError::InsufficientHistory {
                required: self.required_rows(),
                available: rows,
            });
        }

        let min_obs = self.min_observations(rows);
        let filled = window.forward_filled();
        let (now, base) = (rows - 1, rows - 1 - self.config.lookback);

        let mut scores = MomentumScores::default();
        for (col, ticker) in window.tickers().iter().enumerate() {
            if window.observed_count(col) < min_obs {
                scores.skipped.push(
                    SkipEvent::ticker(
                        ticker.as_str(),
                        SkipReason::ExcessiveMissingPrices {
                            observed_fraction: window.observed_fraction(col),
                        },
                    )
                    .on(as_of),
                );
                continue;
            }

            let (last, first) = (filled[[now, col]], filled[[base, col]]);
            if !last.is_finite() || !first.is_finite() || first <= 0.0 {
                scores.skipped.push(
                    SkipEvent::ticker(ticker.as_str(), SkipReason::MissingMomentum).on(as_of),
                );
                continue;
            }
            scores.tickers.push(ticker.clone());
            scores.raw.push(last / first - 1.0);
        }

        scores.scaled = min_max_scale(&scores.raw);
        tracing::debug!(
            date = %as_of,
            rows,
            scored = scores.tickers.len(),
            skipped = scores.skipped.len(),
            "computed momentum"
        );
        Ok(scores)
    }
}

impl Factor for PriceMomentumFactor {
    fn name(&self) -> &str {
        "price_momentum"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Momentum
    }

    fn neutral_score(&self) -> Option<f64> {
        None
    }
}

impl StyleFactor for PriceMomentumFactor {
    type Config = PriceMomentumConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};
    use ndarray::Array2;

    fn history(rows: usize, cols: &[fn(usize) -> f64]) -> PriceHistory {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = (0..rows).map(|i| start + Duration::days(i as i64)).collect();
        let tickers = (0..cols.len()).map(|i| format!("T{i}")).collect();
        let prices = Array2::from_shape_fn((rows, cols.len()), |(r, c)| cols[c](r));
        PriceHistory::new(dates, tickers, prices).unwrap()
    }

    fn factor(lookback: usize) -> PriceMomentumFactor {
        PriceMomentumFactor::with_config(PriceMomentumConfig {
            lookback,
            ..Default::default()
        })
    }

    #[test]
    fn test_factor_name() {
        let factor = PriceMomentumFactor::default();
        assert_eq!(factor.name(), "price_momentum");
        assert_eq!(factor.config().lookback, 126);
        assert_eq!(factor.neutral_score(), None);
    }

    #[test]
    fn test_insufficient_history() {
        let h = history(5, &[|r| 10.0 + r as f64]);
        let err = factor(5).compute(&h).unwrap_err();
        assert_eq!(
            err,
            FactorError::InsufficientHistory {
                required: 6,
                available: 5
            }
        );
    }

    #[test]
    fn test_momentum_and_scaling() {
        let h = history(
            6,
            &[
                |r| 10.0 + r as f64,       // 10 -> 15
                |_| 20.0,                  // flat
                |r| 40.0 - 2.0 * r as f64, // 40 -> 30
            ],
        );
        let scores = factor(5).compute(&h).unwrap();
        assert_relative_eq!(scores.raw[0], 0.5);
        assert_relative_eq!(scores.raw[1], 0.0);
        assert_relative_eq!(scores.raw[2], -0.25);
        assert_relative_eq!(scores.get("T0").unwrap(), 1.0);
        assert_relative_eq!(scores.get("T2").unwrap(), 0.0);
        assert_relative_eq!(scores.get("T1").unwrap(), 0.25 / 0.75);
    }

    #[test]
    fn test_constant_momentum_is_zero() {
        let h = history(4, &[|r| 1.0 + r as f64, |r| 2.0 + 2.0 * r as f64]);
        let scores = factor(3).compute(&h).unwrap();
        assert!(scores.scaled.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_sparse_ticker_dropped() {
        let h = history(10, &[|r| 10.0 + r as f64, |r| if r % 2 == 0 { 5.0 } else { f64::NAN }]);
        let scores = factor(3).compute(&h).unwrap();
        assert_eq!(scores.tickers, vec!["T0".to_string()]);
        assert_eq!(scores.skipped.len(), 1);
        assert_eq!(scores.skipped[0].ticker.as_deref(), Some("T1"));
    }

    #[test]
    fn test_min_observations_floor() {
        let factor = PriceMomentumFactor::default();
        assert_eq!(factor.min_observations(252), 201);
        assert_eq!(factor.min_observations(10), 8);
    }
}
