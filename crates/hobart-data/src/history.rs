//! Date by ticker price panel.
//!
//! A [`PriceHistory`] is the union of several [`PriceSeries`] on a common date
//! axis. Missing observations are stored as `NaN`, mirroring how a wide price
//! frame looks once per-ticker series with gaps are outer-joined on date.

use crate::error::{DataError, Result};
use crate::types::{AssetRecord, PriceSeries};
use chrono::{Datelike, Duration, NaiveDate};
use ndarray::{Array2, ArrayView1, Axis, s};
use polars::prelude::*;
use std::collections::{BTreeSet, HashMap};

/// Days between 0001-01-01 and the Unix epoch, as counted by chrono.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Price panel with rows indexed by date and columns by ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistory {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    prices: Array2<f64>,
}

impl PriceHistory {
    /// Build a panel from its axes and values.
    ///
    /// # Errors
    /// Returns an error if the value shape does not match the axes or the
    /// dates are not strictly increasing.
    pub fn new(dates: Vec<NaiveDate>, tickers: Vec<String>, prices: Array2<f64>) -> Result<Self> {
        let (rows, cols) = prices.dim();
        if rows != dates.len() || cols != tickers.len() {
            return Err(DataError::ShapeMismatch {
                expected_rows: dates.len(),
                expected_cols: tickers.len(),
                rows,
                cols,
            });
        }
        if let Some(pair) = dates.windows(2).find(|pair| pair[1] <= pair[0]) {
            return Err(DataError::UnorderedDates {
                ticker: "<panel>".to_string(),
                date: pair[1].to_string(),
            });
        }
        Ok(Self {
            dates,
            tickers,
            prices,
        })
    }

    /// Outer-join several series on date.
    pub fn from_series<'a, I>(series: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a PriceSeries)>,
    {
        let series: Vec<(&str, &PriceSeries)> = series.into_iter().collect();

        let dates: Vec<NaiveDate> = series
            .iter()
            .flat_map(|(_, s)| s.points().iter().map(|(d, _)| *d))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let row_of: HashMap<NaiveDate, usize> =
            dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let mut prices = Array2::from_elem((dates.len(), series.len()), f64::NAN);
        for (col, (_, s)) in series.iter().enumerate() {
            for (date, price) in s.points() {
                prices[[row_of[date], col]] = *price;
            }
        }

        Self {
            dates,
            tickers: series.iter().map(|(t, _)| (*t).to_string()).collect(),
            prices,
        }
    }

    /// Outer-join the price series of several asset records.
    pub fn from_records(records: &[AssetRecord]) -> Self {
        Self::from_series(records.iter().map(|r| (r.ticker.as_str(), &r.prices)))
    }

    /// Build a panel from a long frame with `symbol`, `date` and a price column.
    ///
    /// # Errors
    /// Returns an error if a column is missing or has an unexpected type.
    pub fn from_frame(frame: &DataFrame, price_column: &str) -> Result<Self> {
        let symbols = frame.column("symbol")?.as_materialized_series().str()?;
        let days = frame
            .column("date")?
            .as_materialized_series()
            .cast(&DataType::Int32)?;
        let days = days.i32()?;
        let closes = frame
            .column(price_column)?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        let closes = closes.f64()?;

        let mut order: Vec<String> = Vec::new();
        let mut points: HashMap<String, Vec<(NaiveDate, f64)>> = HashMap::new();
        for ((symbol, day), close) in symbols.into_iter().zip(days).zip(closes) {
            let (Some(symbol), Some(day), Some(close)) = (symbol, day, close) else {
                continue;
            };
            let date = NaiveDate::from_num_days_from_ce_opt(day + UNIX_EPOCH_DAYS_FROM_CE)
                .ok_or_else(|| DataError::TimeConversion(format!("day offset {day}")))?;
            if !points.contains_key(symbol) {
                order.push(symbol.to_string());
            }
            points
                .entry(symbol.to_string())
                .or_default()
                .push((date, close));
        }

        let series: Vec<(String, PriceSeries)> = order
            .into_iter()
            .map(|t| {
                let s = PriceSeries::from_unsorted(points.remove(&t).unwrap_or_default());
                (t, s)
            })
            .collect();
        Ok(Self::from_series(
            series.iter().map(|(t, s)| (t.as_str(), s)),
        ))
    }

    /// Long frame with `symbol`, `date` and `close` columns, missing rows omitted.
    ///
    /// # Errors
    /// Returns an error if the frame cannot be assembled.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut symbols = Vec::new();
        let mut days = Vec::new();
        let mut closes = Vec::new();
        for (col, ticker) in self.tickers.iter().enumerate() {
            for (row, date) in self.dates.iter().enumerate() {
                let price = self.prices[[row, col]];
                if price.is_nan() {
                    continue;
                }
                symbols.push(ticker.as_str());
                days.push(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE);
                closes.push(price);
            }
        }

        let frame = DataFrame::new(vec![
            Series::new("symbol".into(), symbols).into(),
            Series::new("date".into(), days)
                .cast(&DataType::Date)?
                .into(),
            Series::new("close".into(), closes).into(),
        ])?;
        Ok(frame)
    }

    /// Row dates.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Column tickers.
    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Raw price values, `NaN` where missing.
    pub const fn prices(&self) -> &Array2<f64> {
        &self.prices
    }

    /// Number of dates.
    pub const fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the panel has no dates.
    pub const fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Last date in the panel.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Column index of a ticker.
    pub fn column_index(&self, ticker: &str) -> Option<usize> {
        self.tickers.iter().position(|t| t == ticker)
    }

    /// Prices for one ticker.
    pub fn column(&self, ticker: &str) -> Option<ArrayView1<'_, f64>> {
        self.column_index(ticker).map(|i| self.prices.column(i))
    }

    /// Rows `[start, end)` as a new panel.
    pub fn rows(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.len());
        let start = start.min(end);
        Self {
            dates: self.dates[start..end].to_vec(),
            tickers: self.tickers.clone(),
            prices: self.prices.slice(s![start..end, ..]).to_owned(),
        }
    }

    /// Rows dated on or before `as_of`.
    pub fn up_to(&self, as_of: NaiveDate) -> Self {
        let end = self.dates.partition_point(|d| *d <= as_of);
        self.rows(0, end)
    }

    /// Rows dated within `days` calendar days before `as_of`, inclusive at both ends.
    pub fn trailing_window(&self, as_of: NaiveDate, days: i64) -> Self {
        let from = as_of - Duration::days(days);
        let start = self.dates.partition_point(|d| *d < from);
        let end = self.dates.partition_point(|d| *d <= as_of);
        self.rows(start, end)
    }

    /// Keep the given tickers, in the given order, ignoring unknown ones.
    pub fn select(&self, tickers: &[String]) -> Self {
        let (kept, indices): (Vec<String>, Vec<usize>) = tickers
            .iter()
            .filter_map(|t| self.column_index(t).map(|i| (t.clone(), i)))
            .unzip();
        Self {
            dates: self.dates.clone(),
            tickers: kept,
            prices: self.prices.select(Axis(1), &indices),
        }
    }

    /// Fraction of rows carrying an observation for a column.
    pub fn observed_fraction(&self, col: usize) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let observed = self.prices.column(col).iter().filter(|p| !p.is_nan()).count();
        observed as f64 / self.len() as f64
    }

    /// Number of rows carrying an observation for a column.
    pub fn observed_count(&self, col: usize) -> usize {
        self.prices.column(col).iter().filter(|p| !p.is_nan()).count()
    }

    /// Prices with gaps filled from the previous observation.
    ///
    /// Leading gaps stay `NaN`.
    pub fn forward_filled(&self) -> Array2<f64> {
        let mut filled = self.prices.clone();
        for mut column in filled.columns_mut() {
            let mut last = f64::NAN;
            for value in column.iter_mut() {
                if value.is_nan() {
                    *value = last;
                } else {
                    last = *value;
                }
            }
        }
        filled
    }

    /// Observed prices on a row, missing tickers omitted.
    pub fn row_prices(&self, row: usize) -> HashMap<String, f64> {
        self.tickers
            .iter()
            .zip(self.prices.row(row))
            .filter(|(_, p)| !p.is_nan())
            .map(|(t, p)| (t.clone(), *p))
            .collect()
    }

    /// Most recent observed price per ticker.
    pub fn latest_prices(&self) -> HashMap<String, f64> {
        let filled = self.forward_filled();
        match filled.rows().into_iter().last() {
            Some(last) => self
                .tickers
                .iter()
                .zip(last)
                .filter(|(_, p)| !p.is_nan())
                .map(|(t, p)| (t.clone(), *p))
                .collect(),
            None => HashMap::new(),
        }
    }

    /// Simple daily returns on forward-filled prices.
    ///
    /// The first row and rows where every return is missing are dropped.
    pub fn returns(&self) -> Array2<f64> {
        let filled = self.forward_filled();
        let n_cols = self.tickers.len();
        let mut rows: Vec<f64> = Vec::new();
        let mut n_rows = 0;
        for t in 1..self.len() {
            let row: Vec<f64> = (0..n_cols)
                .map(|c| {
                    let prev = filled[[t - 1, c]];
                    let curr = filled[[t, c]];
                    if prev.is_nan() || curr.is_nan() || prev == 0.0 {
                        f64::NAN
                    } else {
                        curr / prev - 1.0
                    }
                })
                .collect();
            if row.iter().all(|r| r.is_nan()) {
                continue;
            }
            rows.extend(row);
            n_rows += 1;
        }
        Array2::from_shape_vec((n_rows, n_cols), rows)
            .unwrap_or_else(|_| Array2::zeros((0, n_cols)))
    }
}
