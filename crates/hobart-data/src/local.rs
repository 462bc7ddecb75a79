//! File-backed and in-memory providers.
//!
//! These back the backtest CLI and the test suites. Price files are long
//! format with a `date,ticker,close` header; fundamentals files carry
//! `ticker,market_cap,pe_ratio` with empty cells for unknown values.

use crate::error::{DataError, Result};
use crate::history::PriceHistory;
use crate::provider::{FundamentalsProvider, PriceProvider};
use crate::types::{Fundamentals, FundamentalsMap, PriceSeries};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PriceRow {
    date: NaiveDate,
    ticker: String,
    close: f64,
}

#[derive(Debug, Deserialize)]
struct FundamentalsRow {
    ticker: String,
    market_cap: Option<f64>,
    pe_ratio: Option<f64>,
}

/// Daily closes loaded from a long-format CSV file.
#[derive(Debug, Clone, Default)]
pub struct CsvPriceLoader {
    series: BTreeMap<String, PriceSeries>,
}

impl CsvPriceLoader {
    /// Load prices from a CSV file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a row fails to parse.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Load prices from any CSV reader.
    ///
    /// # Errors
    /// Returns an error if a row fails to parse.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::Reader::from_reader(reader);
        let mut points: BTreeMap<String, Vec<(NaiveDate, f64)>> = BTreeMap::new();
        for row in csv.deserialize() {
            let row: PriceRow = row?;
            if !row.close.is_finite() {
                continue;
            }
            points
                .entry(row.ticker)
                .or_default()
                .push((row.date, row.close));
        }

        let series = points
            .into_iter()
            .map(|(ticker, pts)| (ticker, PriceSeries::from_unsorted(pts)))
            .collect::<BTreeMap<_, _>>();
        tracing::debug!(tickers = series.len(), "loaded price file");
        Ok(Self { series })
    }

    /// Tickers present in the file.
    pub fn tickers(&self) -> Vec<String> {
        self.series.keys().cloned().collect()
    }

    /// Series for one ticker.
    pub fn series(&self, ticker: &str) -> Option<&PriceSeries> {
        self.series.get(ticker)
    }

    /// All series joined into a panel.
    pub fn panel(&self) -> PriceHistory {
        PriceHistory::from_series(self.series.iter().map(|(t, s)| (t.as_str(), s)))
    }
}

#[async_trait]
impl PriceProvider for CsvPriceLoader {
    async fn history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries> {
        if start > end {
            return Err(DataError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        let series = self.series.get(ticker).ok_or_else(|| DataError::MissingData {
            symbol: ticker.to_string(),
            reason: "ticker not in price file".to_string(),
        })?;
        let points = series
            .points()
            .iter()
            .filter(|(d, _)| *d >= start && *d <= end)
            .copied()
            .collect();
        PriceSeries::new(ticker, points)
    }
}

/// Loader for fundamentals CSV files.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvFundamentals;

impl CsvFundamentals {
    /// Load fundamentals from a CSV file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a row fails to parse.
    pub fn open(path: impl AsRef<Path>) -> Result<StaticFundamentals> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Load fundamentals from any CSV reader.
    ///
    /// # Errors
    /// Returns an error if a row fails to parse.
    pub fn from_reader<R: Read>(reader: R) -> Result<StaticFundamentals> {
        let mut csv = csv::Reader::from_reader(reader);
        let mut map = FundamentalsMap::new();
        for row in csv.deserialize() {
            let row: FundamentalsRow = row?;
            map.insert(row.ticker, Fundamentals::new(row.market_cap, row.pe_ratio));
        }
        Ok(StaticFundamentals::new(map))
    }
}

/// Fixed fundamentals snapshot served from memory.
#[derive(Debug, Clone, Default)]
pub struct StaticFundamentals {
    map: FundamentalsMap,
}

impl StaticFundamentals {
    /// Wrap a fundamentals map.
    pub const fn new(map: FundamentalsMap) -> Self {
        Self { map }
    }

    /// The underlying snapshot.
    pub const fn snapshot(&self) -> &FundamentalsMap {
        &self.map
    }
}

#[async_trait]
impl FundamentalsProvider for StaticFundamentals {
    async fn fundamentals(&self, ticker: &str) -> Result<Fundamentals> {
        self.map
            .get(ticker)
            .copied()
            .ok_or_else(|| DataError::MissingData {
                symbol: ticker.to_string(),
                reason: "no fundamentals on file".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRICES: &str = "date,ticker,close\n\
        2024-01-03,AAPL,101.0\n\
        2024-01-02,AAPL,100.0\n\
        2024-01-02,MSFT,300.0\n\
        2024-01-04,MSFT,306.0\n";

    const FUNDAMENTALS: &str = "ticker,market_cap,pe_ratio\n\
        AAPL,3000000000000,29.5\n\
        TINY,,\n";

    #[test]
    fn test_price_loader_sorts_and_joins() {
        let loader = CsvPriceLoader::from_reader(PRICES.as_bytes()).unwrap();
        assert_eq!(loader.tickers(), vec!["AAPL".to_string(), "MSFT".to_string()]);

        let history = loader.panel();
        assert_eq!(history.len(), 3);
        assert_eq!(history.latest_prices()["AAPL"], 101.0);
    }

    #[tokio::test]
    async fn test_price_loader_filters_by_range() {
        let loader = CsvPriceLoader::from_reader(PRICES.as_bytes()).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        let series = loader.history("MSFT", day, end).await.unwrap();
        assert_eq!(series.points(), &[(end, 306.0)]);

        assert!(loader.history("NOPE", day, end).await.is_err());
        assert!(matches!(
            loader.history("MSFT", end, day).await,
            Err(DataError::InvalidDateRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_fundamentals_blank_cells_are_unknown() {
        let provider = CsvFundamentals::from_reader(FUNDAMENTALS.as_bytes()).unwrap();
        let tiny = provider.fundamentals("TINY").await.unwrap();
        assert_eq!(tiny, Fundamentals::default());

        let aapl = provider.fundamentals("AAPL").await.unwrap();
        assert_eq!(aapl.pe_ratio, Some(29.5));
        assert!(provider.fundamentals("NOPE").await.is_err());
    }
}
