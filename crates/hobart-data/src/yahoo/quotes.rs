//! Daily quote fetching from Yahoo Finance.

use crate::error::{DataError, Result};
use crate::history::PriceHistory;
use crate::provider::PriceProvider;
use crate::types::PriceSeries;
use async_trait::async_trait;
use chrono::NaiveDate;
use polars::prelude::*;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use yahoo_finance_api as yahoo;

/// Yahoo Finance quote provider with rate limiting.
///
/// Request starts are spaced by the rate-limit delay across every caller
/// sharing the provider, however many fetches run concurrently.
pub struct YahooQuoteProvider {
    provider: yahoo::YahooConnector,
    rate_limit_delay: Duration,
    next_request: Mutex<Instant>,
}

impl std::fmt::Debug for YahooQuoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooQuoteProvider")
            .field("rate_limit_delay", &self.rate_limit_delay)
            .finish_non_exhaustive()
    }
}

impl YahooQuoteProvider {
    /// Create a provider with the default delay of one request per second.
    ///
    /// # Errors
    /// Returns an error if the HTTP connector cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_rate_limit(Duration::from_millis(1000))
    }

    /// Create a provider with a custom delay between requests.
    ///
    /// # Errors
    /// Returns an error if the HTTP connector cannot be built.
    pub fn with_rate_limit(rate_limit_delay: Duration) -> Result<Self> {
        Ok(Self {
            provider: yahoo::YahooConnector::new()?,
            rate_limit_delay,
            next_request: Mutex::new(Instant::now()),
        })
    }

    /// Wait for the next request slot and reserve the one after it.
    async fn pace(&self) {
        let mut slot = self.next_request.lock().await;
        sleep_until(*slot).await;
        *slot = Instant::now() + self.rate_limit_delay;
    }

    async fn fetch_raw(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(i64, f64)>> {
        if start > end {
            return Err(DataError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        if symbol.is_empty() {
            return Err(DataError::InvalidSymbol("Empty symbol".to_string()));
        }

        let start_time = to_offset(start)?;
        // The end bound is exclusive on the wire.
        let end_time = to_offset(end.succ_opt().unwrap_or(end))?;

        self.pace().await;
        let response = self
            .provider
            .get_quote_history(symbol, start_time, end_time)
            .await?;
        let quotes = response
            .quotes()
            .map_err(|e| DataError::YahooApi(e.to_string()))?;

        if quotes.is_empty() {
            return Err(DataError::MissingData {
                symbol: symbol.to_string(),
                reason: "No data returned from Yahoo Finance".to_string(),
            });
        }
        Ok(quotes
            .iter()
            .map(|q| (q.timestamp, q.adjclose))
            .collect())
    }

    /// Fetch adjusted closes for one symbol as a long frame.
    ///
    /// # Returns
    /// A Polars DataFrame with columns: symbol, date, close
    pub async fn fetch_quotes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataFrame> {
        let raw = self.fetch_raw(symbol, start, end).await?;
        let timestamps: Vec<i64> = raw.iter().map(|(t, _)| *t).collect();
        let closes: Vec<f64> = raw.iter().map(|(_, c)| *c).collect();

        let mut df = DataFrame::new(vec![
            Series::new("timestamp".into(), timestamps).into(),
            Series::new("close".into(), closes).into(),
        ])?;
        let symbol_col: Column = Series::new("symbol".into(), vec![symbol; df.height()]).into();
        df.with_column(symbol_col)?;

        let df = df
            .lazy()
            .with_column(
                (col("timestamp") * lit(1_000_000_000))
                    .cast(DataType::Datetime(TimeUnit::Nanoseconds, None))
                    .cast(DataType::Date)
                    .alias("date"),
            )
            .select(&[col("symbol"), col("date"), col("close")])
            .collect()?;
        Ok(df)
    }

    /// Fetch several symbols and concatenate them, skipping failures.
    pub async fn fetch_quotes_batch(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataFrame> {
        let mut dfs = Vec::new();
        for symbol in symbols {
            match self.fetch_quotes(symbol, start, end).await {
                Ok(df) => dfs.push(df.lazy()),
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "failed to fetch quotes");
                }
            }
        }

        if dfs.is_empty() {
            return Err(DataError::MissingData {
                symbol: "batch".to_string(),
                reason: "No data fetched for any symbol".to_string(),
            });
        }
        Ok(concat(dfs, UnionArgs::default())?.collect()?)
    }
}

#[async_trait]
impl PriceProvider for YahooQuoteProvider {
    async fn history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries> {
        let frame = self.fetch_quotes(ticker, start, end).await?;
        let panel = PriceHistory::from_frame(&frame, "close")?;
        let Some(closes) = panel.column(ticker) else {
            return Ok(PriceSeries::default());
        };
        let points = panel
            .dates()
            .iter()
            .copied()
            .zip(closes.iter().copied())
            .filter(|(date, close)| close.is_finite() && *date >= start && *date <= end)
            .collect();
        PriceSeries::new(ticker, points)
    }
}

fn to_offset(date: NaiveDate) -> Result<time::OffsetDateTime> {
    let timestamp = date
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .ok_or_else(|| DataError::TimeConversion(date.to_string()))?;
    time::OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|e| DataError::TimeConversion(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_to_offset_is_midnight_utc() {
        let offset = to_offset(date(2)).unwrap();
        assert_eq!(offset.unix_timestamp(), 1_704_153_600);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_pacing() {
        let provider = YahooQuoteProvider::with_rate_limit(Duration::from_millis(40)).unwrap();
        let started = Instant::now();
        tokio::join!(provider.pace(), provider.pace(), provider.pace(), provider.pace());
        // first slot is free, the other three wait one delay each
        assert!(started.elapsed() >= Duration::from_millis(120));
    }

    #[tokio::test]
    async fn test_invalid_date_range() {
        let provider = YahooQuoteProvider::new().unwrap();
        let result = provider.fetch_quotes("AAPL", date(10), date(1)).await;
        assert!(matches!(result, Err(DataError::InvalidDateRange { .. })));
    }

    #[tokio::test]
    async fn test_invalid_symbol() {
        let provider = YahooQuoteProvider::new().unwrap();
        let result = provider.history("", date(1), date(10)).await;
        assert!(matches!(result, Err(DataError::InvalidSymbol(_))));
    }
}
