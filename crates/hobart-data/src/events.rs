//! Structured skip and fallback events.
//!
//! Nothing in the core is fatal to a run. Whenever a ticker, an order or a
//! whole cycle is skipped, the component records a [`SkipEvent`] and logs it,
//! so the audit trail survives even when the caller ignores the return value.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why something was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Trailing window shorter than the momentum lookback requires
    InsufficientHistory {
        /// Rows required
        required: usize,
        /// Rows available
        available: usize,
    },
    /// Too many missing prices in the trailing window
    ExcessiveMissingPrices {
        /// Fraction of rows with an observation
        observed_fraction: f64,
    },
    /// No price at one end of the momentum lookback
    MissingMomentum,
    /// Optimizer could not produce weights
    OptimizationInfeasible(String),
    /// Price absent or non-positive
    MissingMarketData,
    /// Fundamentals provider failed for the ticker
    FundamentalsUnavailable(String),
    /// Price provider failed for the ticker
    HistoryUnavailable(String),
    /// Order sink rejected an order
    OrderRejected(String),
    /// Account reported no capital and no fallback was configured
    NoCapital,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientHistory {
                required,
                available,
            } => write!(
                f,
                "insufficient history: need {required} rows, have {available}"
            ),
            Self::ExcessiveMissingPrices { observed_fraction } => write!(
                f,
                "too many missing prices ({:.1}% observed)",
                observed_fraction * 100.0
            ),
            Self::MissingMomentum => write!(f, "no price at lookback boundary"),
            Self::OptimizationInfeasible(reason) => write!(f, "optimization infeasible: {reason}"),
            Self::MissingMarketData => write!(f, "missing or non-positive price"),
            Self::FundamentalsUnavailable(reason) => {
                write!(f, "fundamentals unavailable: {reason}")
            }
            Self::HistoryUnavailable(reason) => write!(f, "history unavailable: {reason}"),
            Self::OrderRejected(reason) => write!(f, "order rejected: {reason}"),
            Self::NoCapital => write!(f, "account reports no capital"),
        }
    }
}

/// Audit record for a skipped ticker, order or cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkipEvent {
    /// Cycle date, when known
    pub date: Option<NaiveDate>,
    /// Affected ticker, or `None` for a whole cycle
    pub ticker: Option<String>,
    /// Reason for the skip
    pub reason: SkipReason,
}

impl SkipEvent {
    /// Event affecting a single ticker.
    pub fn ticker(ticker: impl Into<String>, reason: SkipReason) -> Self {
        let event = Self {
            date: None,
            ticker: Some(ticker.into()),
            reason,
        };
        event.log();
        event
    }

    /// Event affecting a whole cycle.
    pub fn cycle(date: Option<NaiveDate>, reason: SkipReason) -> Self {
        let event = Self {
            date,
            ticker: None,
            reason,
        };
        event.log();
        event
    }

    /// Attach a cycle date to an event raised without one.
    pub const fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    fn log(&self) {
        match (&self.ticker, self.date) {
            (Some(ticker), _) => tracing::warn!(ticker = %ticker, reason = %self.reason, "ticker skipped"),
            (None, Some(date)) => tracing::warn!(date = %date, reason = %self.reason, "cycle skipped"),
            (None, None) => tracing::warn!(reason = %self.reason, "cycle skipped"),
        }
    }
}

impl fmt::Display for SkipEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(date) = self.date {
            write!(f, "[{date}] ")?;
        }
        if let Some(ticker) = &self.ticker {
            write!(f, "{ticker}: ")?;
        }
        write!(f, "{}", self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_event_display() {
        let event = SkipEvent::ticker("GME", SkipReason::MissingMarketData);
        assert_eq!(event.to_string(), "GME: missing or non-positive price");
    }

    #[test]
    fn test_cycle_event_with_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let event = SkipEvent::cycle(
            None,
            SkipReason::InsufficientHistory {
                required: 127,
                available: 40,
            },
        )
        .on(date);
        assert_eq!(event.date, Some(date));
        assert!(event.ticker.is_none());
        assert_eq!(
            event.to_string(),
            "[2024-03-01] insufficient history: need 127 rows, have 40"
        );
    }
}
