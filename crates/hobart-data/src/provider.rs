//! Collaborator interfaces for market data, accounts and order routing.
//!
//! The core never talks to a data vendor or a broker directly. Live runs hand
//! it implementations of these traits; tests and backtests hand it in-memory
//! ones.

use crate::error::Result;
use crate::events::{SkipEvent, SkipReason};
use crate::history::PriceHistory;
use crate::types::{Fundamentals, FundamentalsMap, Holdings, OrderIntent, PriceSeries};
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

/// Maximum number of provider requests in flight while gathering a universe.
pub const FETCH_CONCURRENCY: usize = 10;

/// Source of daily closing prices.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Daily closes for `ticker` between `start` and `end`, inclusive.
    async fn history(&self, ticker: &str, start: NaiveDate, end: NaiveDate)
    -> Result<PriceSeries>;
}

/// Source of fundamentals snapshots.
#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    /// Latest fundamentals for `ticker`.
    async fn fundamentals(&self, ticker: &str) -> Result<Fundamentals>;
}

/// Brokerage account state.
#[async_trait]
pub trait AccountProvider: Send + Sync {
    /// Total account value available to allocate.
    async fn capital(&self) -> Result<f64>;

    /// Current share positions.
    async fn holdings(&self) -> Result<Holdings>;
}

/// Destination for orders.
#[async_trait]
pub trait OrderSink: Send + Sync {
    /// Submit a single order.
    async fn submit(&self, order: &OrderIntent) -> Result<OrderAck>;
}

/// Acknowledgement returned by an [`OrderSink`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    /// Order as submitted
    pub order: OrderIntent,
    /// Identifier assigned by the sink
    pub id: String,
    /// Fill price, if the sink filled immediately
    pub fill_price: Option<f64>,
}

/// Fetch histories for several tickers concurrently and join them into a panel.
///
/// At most [`FETCH_CONCURRENCY`] requests run at once. Tickers whose fetch fails are dropped and reported as skip events.
pub async fn gather_history<P>(
    provider: &P,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> (PriceHistory, Vec<SkipEvent>)
where
    P: PriceProvider + ?Sized,
{
    let fetches: Vec<_> = stream::iter(tickers)
        .map(|ticker| async move { (ticker, provider.history(ticker, start, end).await) })
        .buffered(FETCH_CONCURRENCY)
        .collect()
        .await;

    let mut series = Vec::new();
    let mut skipped = Vec::new();
    for (ticker, result) in fetches {
        match result {
            Ok(s) if !s.is_empty() => series.push((ticker.as_str(), s)),
            Ok(_) => skipped.push(SkipEvent::ticker(
                ticker.as_str(),
                SkipReason::HistoryUnavailable("no observations".to_string()),
            )),
            Err(e) => skipped.push(SkipEvent::ticker(
                ticker.as_str(),
                SkipReason::HistoryUnavailable(e.to_string()),
            )),
        }
    }

    let history = PriceHistory::from_series(series.iter().map(|(t, s)| (*t, s)));
    (history, skipped)
}

/// Fetch fundamentals for several tickers, at most [`FETCH_CONCURRENCY`] at once.
///
/// A failed fetch yields an empty snapshot for that ticker plus a skip event,
/// so every requested ticker appears in the map.
pub async fn gather_fundamentals<F>(
    provider: &F,
    tickers: &[String],
) -> (FundamentalsMap, Vec<SkipEvent>)
where
    F: FundamentalsProvider + ?Sized,
{
    let fetches: Vec<_> = stream::iter(tickers)
        .map(|ticker| async move { (ticker, provider.fundamentals(ticker).await) })
        .buffered(FETCH_CONCURRENCY)
        .collect()
        .await;

    let mut map = FundamentalsMap::new();
    let mut skipped = Vec::new();
    for (ticker, result) in fetches {
        let fundamentals = result.unwrap_or_else(|e| {
            skipped.push(SkipEvent::ticker(
                ticker.as_str(),
                SkipReason::FundamentalsUnavailable(e.to_string()),
            ));
            Fundamentals::default()
        });
        map.insert(ticker.clone(), fundamentals);
    }
    (map, skipped)
}
