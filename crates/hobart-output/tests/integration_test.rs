//! Integration tests for allocation export and performance summary.

use chrono::NaiveDate;
use hobart_output::{
    AllocationRecord, AllocationTable, ExportFormat, Exporter, PerformanceSummary,
};
use std::collections::BTreeMap;

fn table() -> AllocationTable {
    let start = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
    let values = [1_000_000.0, 1_004_000.0, 998_500.0, 1_010_200.0];
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let weights: BTreeMap<String, f64> = if i == 0 {
                BTreeMap::new()
            } else {
                [("AAPL".to_string(), 0.2), ("SPY".to_string(), 0.15)].into()
            };
            AllocationRecord::new(start + chrono::Duration::days(i as i64), *v, weights)
        })
        .collect()
}

#[test]
fn test_export_round_trip_through_file() {
    let table = table();
    let path = std::env::temp_dir().join(format!("hobart-alloc-{}.csv", std::process::id()));
    table.export_to_file(&path, ExportFormat::from_path(&path)).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let mut lines = written.lines();
    assert_eq!(lines.next(), Some("date,portfolio_value,AAPL,SPY"));
    assert_eq!(lines.next(), Some("2024-06-03,1000000.00,0.00%,0.00%"));
    assert_eq!(lines.last(), Some("2024-06-06,1010200.00,20.00%,15.00%"));
}

#[test]
fn test_summary_from_table() {
    let table = table();
    let path: Vec<(NaiveDate, f64)> = table
        .records
        .iter()
        .map(|r| (r.date, r.portfolio_value))
        .collect();
    let summary = PerformanceSummary::from_values("integration", &path, 1, 0);

    assert!((summary.total_return - 0.0102).abs() < 1e-9);
    assert!((summary.max_drawdown - 5_500.0 / 1_004_000.0).abs() < 1e-12);
    assert_eq!(summary.rebalances, 1);

    let text = summary.to_ascii_table();
    assert!(text.contains("Total Return:             1.02%"));
    assert!(summary.to_string().starts_with("integration: 1.02% total"));
}
