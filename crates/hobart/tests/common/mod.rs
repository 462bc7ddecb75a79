//! Synthetic market data shared by the integration tests.

#![allow(dead_code, unreachable_pub)]

use chrono::{Duration, NaiveDate};
use hobart_data::{Fundamentals, FundamentalsMap, PriceHistory};
use ndarray::Array2;

pub const TICKERS: [&str; 6] = ["L1", "L2", "S1", "SPY", "M1", "N1"];
pub const DRIFTS: [f64; 6] = [0.0010, 0.0006, 0.0015, 0.0004, -0.0002, 0.0008];

pub fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

/// Geometric random walks with a fixed seed, one row per calendar day.
pub fn history(days: usize) -> PriceHistory {
    let mut state: u64 = 0x2545_F491_4F6C_DD1D;
    let mut noise = move || {
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        ((state >> 11) as f64 / (1u64 << 53) as f64 - 0.5) * 0.02
    };

    let mut log_prices = [0.0_f64; 6];
    let mut values = Vec::with_capacity(days * TICKERS.len());
    for _ in 0..days {
        for (i, lp) in log_prices.iter_mut().enumerate() {
            *lp += DRIFTS[i] + noise();
            values.push(100.0 * lp.exp());
        }
    }

    let dates = (0..days).map(|d| start() + Duration::days(d as i64)).collect();
    let prices = Array2::from_shape_vec((days, TICKERS.len()), values).unwrap();
    PriceHistory::new(dates, TICKERS.iter().map(|t| t.to_string()).collect(), prices).unwrap()
}

pub fn fundamentals() -> FundamentalsMap {
    [
        ("L1", Some(80e9), Some(28.0)),
        ("L2", Some(45e9), Some(15.0)),
        ("S1", Some(1.2e9), Some(40.0)),
        ("SPY", None, None),
        ("M1", Some(5e9), Some(22.0)),
        ("N1", None, None),
    ]
    .into_iter()
    .map(|(t, cap, pe)| (t.to_string(), Fundamentals::new(cap, pe)))
    .collect()
}

/// The panel as a long-format price CSV.
pub fn price_csv(history: &PriceHistory) -> String {
    let mut csv = String::from("date,ticker,close\n");
    for (row, date) in history.dates().iter().enumerate() {
        for (col, ticker) in history.tickers().iter().enumerate() {
            csv.push_str(&format!("{date},{ticker},{}\n", history.prices()[[row, col]]));
        }
    }
    csv
}
