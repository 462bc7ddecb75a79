//! Backtest performance summary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trading days used to annualize daily statistics.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Headline statistics for a portfolio value path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceSummary {
    /// Strategy or run name.
    pub name: String,

    /// First date in the path.
    pub period_start: Option<NaiveDate>,

    /// Last date in the path.
    pub period_end: Option<NaiveDate>,

    /// Starting portfolio value.
    pub initial_value: f64,

    /// Ending portfolio value.
    pub final_value: f64,

    /// `final / initial - 1`.
    pub total_return: f64,

    /// Geometric annualized return over the observed periods.
    pub annualized_return: f64,

    /// Annualized standard deviation of daily returns.
    pub annualized_volatility: f64,

    /// Largest peak-to-trough decline, as a positive fraction.
    pub max_drawdown: f64,

    /// Cycles that traded.
    pub rebalances: usize,

    /// Cycles skipped after a scoring or optimization failure.
    pub skipped_cycles: usize,
}

impl PerformanceSummary {
    /// Summarize a dated value path.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use hobart_output::PerformanceSummary;
    ///
    /// let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
    /// let path = [(d(2), 100.0), (d(3), 110.0), (d(4), 99.0)];
    /// let summary = PerformanceSummary::from_values("demo", &path, 1, 0);
    ///
    /// assert!((summary.total_return - -0.01).abs() < 1e-12);
    /// assert!((summary.max_drawdown - 0.1).abs() < 1e-12);
    /// ```
    pub fn from_values(
        name: impl Into<String>,
        values: &[(NaiveDate, f64)],
        rebalances: usize,
        skipped_cycles: usize,
    ) -> Self {
        let initial_value = values.first().map_or(0.0, |(_, v)| *v);
        let final_value = values.last().map_or(0.0, |(_, v)| *v);
        let total_return = if initial_value > 0.0 {
            final_value / initial_value - 1.0
        } else {
            0.0
        };

        let path: Vec<f64> = values.iter().map(|(_, v)| *v).collect();
        let returns: Vec<f64> = path
            .windows(2)
            .filter(|w| w[0] > 0.0)
            .map(|w| w[1] / w[0] - 1.0)
            .collect();

        let annualized_return = if returns.is_empty() || total_return <= -1.0 {
            0.0
        } else {
            (1.0 + total_return).powf(TRADING_DAYS_PER_YEAR / returns.len() as f64) - 1.0
        };

        Self {
            name: name.into(),
            period_start: values.first().map(|(d, _)| *d),
            period_end: values.last().map(|(d, _)| *d),
            initial_value,
            final_value,
            total_return,
            annualized_return,
            annualized_volatility: sample_std(&returns) * TRADING_DAYS_PER_YEAR.sqrt(),
            max_drawdown: max_drawdown(&path),
            rebalances,
            skipped_cycles,
        }
    }

    /// Annualized return per unit of annualized volatility.
    pub fn return_to_risk(&self) -> f64 {
        if self.annualized_volatility.abs() < 1e-10 {
            return 0.0;
        }
        self.annualized_return / self.annualized_volatility
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nPerformance Summary: {}\n", self.name));
        if let (Some(start), Some(end)) = (self.period_start, self.period_end) {
            output.push_str(&format!("Period: {start} to {end}\n"));
        }
        output.push_str(&"=".repeat(60));
        output.push('\n');
        output.push_str(&format!(
            "  Initial Value:            {:.2}\n",
            self.initial_value
        ));
        output.push_str(&format!("  Final Value:              {:.2}\n", self.final_value));
        output.push_str(&format!(
            "  Total Return:             {:.2}%\n",
            self.total_return * 100.0
        ));
        output.push_str(&format!(
            "  Annualized Return:        {:.2}%\n",
            self.annualized_return * 100.0
        ));
        output.push_str(&format!(
            "  Annualized Volatility:    {:.2}%\n",
            self.annualized_volatility * 100.0
        ));
        output.push_str(&format!(
            "  Max Drawdown:             {:.2}%\n",
            self.max_drawdown * 100.0
        ));
        output.push_str(&format!("  Rebalances:               {}\n", self.rebalances));
        output.push_str(&format!("  Skipped Cycles:           {}\n", self.skipped_cycles));
        output.push_str(&"=".repeat(60));
        output.push('\n');
        output
    }
}

impl fmt::Display for PerformanceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.2}% total, {:.2}% annualized, {:.2}% vol, {:.2}% max drawdown",
            self.name,
            self.total_return * 100.0,
            self.annualized_return * 100.0,
            self.annualized_volatility * 100.0,
            self.max_drawdown * 100.0
        )
    }
}

/// Largest peak-to-trough decline of a value path, as a positive fraction.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for v in values {
        peak = peak.max(*v);
        if peak > 0.0 {
            worst = worst.max((peak - v) / peak);
        }
    }
    worst
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn path(values: &[f64]) -> Vec<(NaiveDate, f64)> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + chrono::Duration::days(i as i64), *v))
            .collect()
    }

    #[rstest]
    #[case(&[100.0, 120.0, 90.0, 130.0], 0.25)]
    #[case(&[100.0, 101.0, 102.0], 0.0)]
    #[case(&[100.0, 50.0, 25.0], 0.75)]
    #[case(&[], 0.0)]
    fn test_max_drawdown(#[case] values: &[f64], #[case] expected: f64) {
        assert_relative_eq!(max_drawdown(values), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_flat_path() {
        let summary = PerformanceSummary::from_values("flat", &path(&[100.0; 10]), 0, 3);
        assert_eq!(summary.total_return, 0.0);
        assert_eq!(summary.annualized_volatility, 0.0);
        assert_eq!(summary.return_to_risk(), 0.0);
        assert_eq!(summary.skipped_cycles, 3);
    }

    #[test]
    fn test_constant_growth_annualizes() {
        let values: Vec<f64> = (0..=252).map(|i| 100.0 * 1.001_f64.powi(i)).collect();
        let summary = PerformanceSummary::from_values("growth", &path(&values), 1, 0);
        assert_relative_eq!(summary.annualized_return, summary.total_return, epsilon = 1e-9);
        assert_relative_eq!(summary.annualized_volatility, 0.0, epsilon = 1e-9);
        assert_eq!(summary.max_drawdown, 0.0);
    }

    #[test]
    fn test_empty_path() {
        let summary = PerformanceSummary::from_values("empty", &[], 0, 0);
        assert_eq!(summary.period_start, None);
        assert_eq!(summary.total_return, 0.0);
        assert!(summary.to_ascii_table().contains("Performance Summary: empty"));
    }
}
