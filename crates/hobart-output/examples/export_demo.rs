//! Build a small allocation table, print it and summarize it.

use chrono::NaiveDate;
use hobart_output::{
    AllocationRecord, AllocationTable, ExportError, ExportFormat, Exporter, PerformanceSummary,
};

fn main() -> Result<(), ExportError> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap_or_default();
    let mut table = AllocationTable::new();
    let mut value = 1_000_000.0;
    for day in 0..10 {
        value *= 1.0 + 0.002 * ((day % 3) as f64 - 0.8);
        let weights = [("AAPL", 0.2), ("MSFT", 0.18), ("SPY", 0.12), ("PLUG", 0.1)]
            .into_iter()
            .map(|(t, w)| (t.to_string(), w))
            .collect();
        table.push(AllocationRecord::new(
            start + chrono::Duration::days(day),
            value,
            weights,
        ));
    }

    println!("{}", table.export_to_string(ExportFormat::Csv)?);

    let path: Vec<(NaiveDate, f64)> = table
        .records
        .iter()
        .map(|r| (r.date, r.portfolio_value))
        .collect();
    let summary = PerformanceSummary::from_values("export demo", &path, 1, 0);
    println!("{}", summary.to_ascii_table());
    Ok(())
}
