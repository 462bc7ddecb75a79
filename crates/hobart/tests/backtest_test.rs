//! Integration tests for the backtest loop.

mod common;

use approx::assert_relative_eq;
use hobart::{Backtest, CycleOutcome, HobartConfig, allocation_table, summarize};
use hobart_data::SkipReason;
use hobart_output::{ExportFormat, Exporter};
use hobart_portfolio::UniverseBucket;
use rstest::rstest;

const DAYS: usize = 200;
const LOOKBACK_ROWS: usize = 127;

fn backtest(config: HobartConfig) -> Backtest {
    Backtest::new(common::history(DAYS), common::fundamentals(), config).unwrap()
}

#[test]
fn test_classifies_universe() {
    let bt = backtest(HobartConfig::default());
    let buckets = bt.buckets();
    assert_eq!(buckets.bucket_of("SPY"), Some(UniverseBucket::Etf));
    assert_eq!(buckets.bucket_of("S1"), Some(UniverseBucket::SmallCap));
    assert_eq!(buckets.bucket_of("L1"), Some(UniverseBucket::LargeCap));
    assert_eq!(buckets.bucket_of("M1"), None);
    assert_eq!(buckets.bucket_of("N1"), None);
}

#[test]
fn test_skips_until_history_is_long_enough() {
    let bt = backtest(HobartConfig::default());
    let snapshots: Vec<_> = bt.run().collect();
    assert_eq!(snapshots.len(), DAYS);

    for snapshot in &snapshots[..LOOKBACK_ROWS - 1] {
        match &snapshot.outcome {
            CycleOutcome::Skipped(event) => assert!(matches!(
                event.reason,
                SkipReason::InsufficientHistory { required: LOOKBACK_ROWS, .. }
            )),
            other => panic!("expected skip on {}, got {other:?}", snapshot.date),
        }
        assert!(snapshot.holdings.is_empty());
        assert_eq!(snapshot.portfolio_value, 1_000_000.0);
    }
    assert!(snapshots[LOOKBACK_ROWS - 1].outcome.is_rebalanced());
}

#[test]
fn test_invested_book_respects_constraints() {
    let bt = backtest(HobartConfig::default());
    let first = bt
        .run()
        .find(|s| s.outcome.is_rebalanced())
        .expect("a rebalance");

    assert!(!first.holdings.is_empty());
    assert!(first.cash >= 0.0);
    assert_relative_eq!(first.portfolio_value, 1_000_000.0, epsilon = 1e-6);
    for (ticker, weight) in &first.weights {
        assert!(*weight <= 0.20 + 1e-9, "{ticker} at {weight}");
    }
    let invested: f64 = first.weights.values().sum();
    assert!(invested > 0.95 && invested <= 1.0 + 1e-9);
}

#[rstest]
#[case(0.20)]
#[case(0.25)]
#[case(0.50)]
fn test_cash_never_negative(#[case] cap: f64) {
    let mut config = HobartConfig::default();
    config.constraints.max_single_weight = cap;
    for snapshot in backtest(config).run() {
        assert!(snapshot.cash >= 0.0, "cash {} on {}", snapshot.cash, snapshot.date);
        let invested: f64 = snapshot.weights.values().sum();
        assert_relative_eq!(
            invested + snapshot.cash / snapshot.portfolio_value,
            1.0,
            epsilon = 1e-9
        );
    }
}

#[test]
fn test_run_is_restartable() {
    let bt = backtest(HobartConfig::default());
    let first: Vec<_> = bt.run().collect();
    let second: Vec<_> = bt.run().collect();
    assert_eq!(first, second);
    assert_eq!(bt.run().take(3).count(), 3);
    assert_eq!(bt.run().len(), DAYS);
}

#[test]
fn test_infeasible_cap_keeps_cash() {
    let mut config = HobartConfig::default();
    // six tickers cannot be fully invested under a 10% cap
    config.constraints.max_single_weight = 0.10;
    let snapshots: Vec<_> = backtest(config).run().collect();

    let last = snapshots.last().unwrap();
    assert!(last.holdings.is_empty());
    assert_eq!(last.portfolio_value, 1_000_000.0);
    assert!(matches!(
        &last.outcome,
        CycleOutcome::Skipped(event) if matches!(event.reason, SkipReason::OptimizationInfeasible(_))
    ));
}

#[test]
fn test_date_bounds_and_reporting() {
    let mut config = HobartConfig::default();
    config.backtest.start = Some(common::start() + chrono::Duration::days(150));
    config.backtest.end = Some(common::start() + chrono::Duration::days(159));
    let snapshots: Vec<_> = backtest(config).run().collect();

    assert_eq!(snapshots.len(), 10);
    assert!(snapshots[0].outcome.is_rebalanced());

    let summary = summarize("bounded", &snapshots);
    assert!(summary.rebalances >= 1);
    assert_eq!(summary.skipped_cycles, 0);
    assert_eq!(summary.period_start, Some(snapshots[0].date));

    let csv = allocation_table(&snapshots)
        .export_to_string(ExportFormat::Csv)
        .unwrap();
    assert_eq!(csv.lines().count(), 11);
    assert!(csv.starts_with("date,portfolio_value,"));
}
