//! Core data model shared across the workspace.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Signed share counts keyed by ticker.
pub type Holdings = BTreeMap<String, i64>;

/// Fundamentals snapshot keyed by ticker.
pub type FundamentalsMap = BTreeMap<String, Fundamentals>;

/// Fundamentals snapshot for one instrument.
///
/// Both fields are optional; providers report what they have and the
/// scoring layer treats absence as neutral.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    /// Market capitalization in dollars
    pub market_cap: Option<f64>,
    /// Trailing price to earnings ratio
    pub pe_ratio: Option<f64>,
}

impl Fundamentals {
    /// Create a fundamentals snapshot.
    pub const fn new(market_cap: Option<f64>, pe_ratio: Option<f64>) -> Self {
        Self {
            market_cap,
            pe_ratio,
        }
    }

    /// Market cap if known, finite and non-negative.
    pub fn known_market_cap(&self) -> Option<f64> {
        self.market_cap.filter(|v| v.is_finite() && *v >= 0.0)
    }

    /// PE ratio if known and finite.
    pub fn known_pe_ratio(&self) -> Option<f64> {
        self.pe_ratio.filter(|v| v.is_finite())
    }
}

/// Ordered price observations for one ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<(NaiveDate, f64)>,
}

impl PriceSeries {
    /// Build a series, rejecting dates that are not strictly increasing.
    pub fn new(ticker: &str, points: Vec<(NaiveDate, f64)>) -> Result<Self> {
        if let Some(pair) = points.windows(2).find(|pair| pair[1].0 <= pair[0].0) {
            return Err(DataError::UnorderedDates {
                ticker: ticker.to_string(),
                date: pair[1].0.to_string(),
            });
        }
        Ok(Self { points })
    }

    /// Build a series from unsorted observations, keeping the last value seen per date.
    pub fn from_unsorted(points: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        let deduped: BTreeMap<NaiveDate, f64> = points.into_iter().collect();
        Self {
            points: deduped.into_iter().collect(),
        }
    }

    /// Observations in date order.
    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    /// Number of observations.
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no observations.
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent observation.
    pub fn last(&self) -> Option<(NaiveDate, f64)> {
        self.points.last().copied()
    }
}

/// Everything the core knows about one instrument for a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Ticker symbol
    pub ticker: String,
    /// Price history
    pub prices: PriceSeries,
    /// Fundamentals snapshot
    pub fundamentals: Fundamentals,
}

impl AssetRecord {
    /// Create a new asset record.
    pub fn new(ticker: impl Into<String>, prices: PriceSeries, fundamentals: Fundamentals) -> Self {
        Self {
            ticker: ticker.into(),
            prices,
            fundamentals,
        }
    }
}

/// Direction of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    /// Increase the position
    Buy,
    /// Decrease the position
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// A signed share delta for one ticker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Ticker symbol
    pub ticker: String,
    /// Signed share quantity, positive buys
    pub quantity: i64,
}

impl OrderIntent {
    /// Create a new order intent.
    pub fn new(ticker: impl Into<String>, quantity: i64) -> Self {
        Self {
            ticker: ticker.into(),
            quantity,
        }
    }

    /// Side implied by the sign of the quantity.
    pub const fn side(&self) -> OrderSide {
        if self.quantity >= 0 {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        }
    }

    /// Unsigned share count.
    pub const fn abs_quantity(&self) -> u64 {
        self.quantity.unsigned_abs()
    }
}

impl fmt::Display for OrderIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} shares of {}",
            self.side(),
            self.abs_quantity(),
            self.ticker
        )
    }
}
