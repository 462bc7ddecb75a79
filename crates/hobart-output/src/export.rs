//! Allocation table export.
//!
//! One row per cycle: the date, the portfolio value and each ticker's weight
//! as a percentage. CSV output pivots tickers into columns; JSON keeps the
//! records as they are.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Writer produced invalid UTF-8.
    #[error("Invalid UTF-8 in output: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }

    /// Guess the format from a file extension, defaulting to CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::PrettyJson,
            _ => Self::Csv,
        }
    }
}

/// Portfolio state recorded for one cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationRecord {
    /// Cycle date.
    pub date: NaiveDate,

    /// Marked-to-market portfolio value, cash included.
    pub portfolio_value: f64,

    /// Ticker weights as fractions of the portfolio value.
    pub weights: BTreeMap<String, f64>,
}

impl AllocationRecord {
    /// Create a new allocation record.
    pub const fn new(date: NaiveDate, portfolio_value: f64, weights: BTreeMap<String, f64>) -> Self {
        Self {
            date,
            portfolio_value,
            weights,
        }
    }

    /// Fraction of the portfolio held in cash.
    pub fn cash_weight(&self) -> f64 {
        1.0 - self.weights.values().sum::<f64>()
    }
}

/// Dated allocation history.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AllocationTable {
    /// Rows in date order.
    pub records: Vec<AllocationRecord>,
}

impl AllocationTable {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Append a row.
    pub fn push(&mut self, record: AllocationRecord) {
        self.records.push(record);
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every ticker that ever held a weight, in sorted order.
    pub fn tickers(&self) -> Vec<String> {
        let mut tickers: Vec<String> = self
            .records
            .iter()
            .flat_map(|r| r.weights.keys().cloned())
            .collect();
        tickers.sort();
        tickers.dedup();
        tickers
    }

    fn to_csv(&self) -> Result<String, ExportError> {
        let tickers = self.tickers();
        let mut wtr = csv::Writer::from_writer(vec![]);

        let mut header = vec!["date".to_string(), "portfolio_value".to_string()];
        header.extend(tickers.iter().cloned());
        wtr.write_record(&header)?;

        for record in &self.records {
            let mut row = vec![
                record.date.to_string(),
                format!("{:.2}", record.portfolio_value),
            ];
            row.extend(tickers.iter().map(|t| {
                let weight = record.weights.get(t).copied().unwrap_or(0.0);
                format!("{:.2}%", weight * 100.0)
            }));
            wtr.write_record(&row)?;
        }

        let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8(bytes)?)
    }
}

impl FromIterator<AllocationRecord> for AllocationTable {
    fn from_iter<I: IntoIterator<Item = AllocationRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

impl Exporter for AllocationTable {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => self.to_csv(),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

impl Exporter for AllocationRecord {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => AllocationTable::from_iter([self.clone()]).to_csv(),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}
