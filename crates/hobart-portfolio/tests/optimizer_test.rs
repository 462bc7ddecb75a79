//! Integration tests for the constrained optimizer.

use hobart_factors::FactorScore;
use hobart_portfolio::{
    ConstraintSet, DriftMonitor, OptimizeError, OptimizerConfig, PortfolioOptimizer,
    UniverseBucket, UniverseBuckets,
};
use hobart_risk::CovarianceMatrix;
use ndarray::array;
use rstest::rstest;
use std::collections::BTreeSet;

const EPS: f64 = 1e-4;

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn six_asset_universe() -> (FactorScore, CovarianceMatrix, UniverseBuckets) {
    let scores = FactorScore::from_pairs([
        ("L1", 0.95),
        ("L2", 0.80),
        ("L3", 0.60),
        ("E1", 0.40),
        ("E2", 0.30),
        ("X1", 0.70),
    ]);
    let cov = CovarianceMatrix::diagonal([
        ("L1", 0.05),
        ("L2", 0.04),
        ("L3", 0.06),
        ("E1", 0.02),
        ("E2", 0.015),
        ("X1", 0.08),
    ]);
    let buckets = UniverseBuckets {
        small_caps: BTreeSet::new(),
        large_caps: set(&["L1", "L2", "L3"]),
        etfs: set(&["E1", "E2"]),
    };
    (scores, cov, buckets)
}

#[test]
fn test_three_asset_scenario_bounds() {
    let scores = FactorScore::from_pairs([("A", 0.9), ("B", 0.5), ("C", 0.1)]);
    let cov = CovarianceMatrix::diagonal([("A", 0.04), ("B", 0.09), ("C", 0.01)]);
    let constraints = ConstraintSet::with_max_weight(0.5);

    let weights = PortfolioOptimizer::default()
        .optimize_with_buckets(&scores, &cov, &UniverseBuckets::default(), &constraints)
        .unwrap();

    assert!(weights.total() <= 1.0 + EPS);
    for (_, w) in weights.iter() {
        assert!(w >= 0.0);
        assert!(w <= 0.5 + EPS);
    }
}

#[test]
fn test_empty_small_cap_bucket_is_not_infeasible() {
    let (scores, cov, buckets) = six_asset_universe();
    let weights = PortfolioOptimizer::default()
        .optimize_with_buckets(&scores, &cov, &buckets, &ConstraintSet::default())
        .unwrap();

    let map = weights.to_map();
    let large: f64 = buckets.large_caps.iter().map(|t| map[t]).sum();
    let etf: f64 = buckets.etfs.iter().map(|t| map[t]).sum();
    assert!(large >= 0.10 - EPS);
    assert!(etf >= 0.10 - EPS);
    assert!(weights.iter().all(|(_, w)| w <= 0.20 + EPS));
    assert!((weights.total() - 1.0).abs() < 1e-3);
}

#[rstest]
#[case(0.10)]
#[case(0.30)]
#[case(0.45)]
fn test_etf_floor_met(#[case] floor: f64) {
    let (scores, cov, buckets) = six_asset_universe();
    let mut constraints = ConstraintSet::with_max_weight(0.5);
    constraints.min_bucket_weight.insert(UniverseBucket::Etf, floor);

    let weights = PortfolioOptimizer::default()
        .optimize_with_buckets(&scores, &cov, &buckets, &constraints)
        .unwrap();
    let etf = weights.get("E1") + weights.get("E2");
    assert!(etf >= floor - EPS, "etf weight {etf} below {floor}");
}

#[test]
fn test_cap_and_floor_conflict() {
    let (scores, cov, buckets) = six_asset_universe();
    let mut constraints = ConstraintSet::with_max_weight(0.2);
    // two ETFs capped at 0.2 cannot reach 0.5
    constraints.min_bucket_weight.insert(UniverseBucket::Etf, 0.5);

    let result =
        PortfolioOptimizer::default().optimize_with_buckets(&scores, &cov, &buckets, &constraints);
    assert!(matches!(result, Err(OptimizeError::OptimizationInfeasible(_))));
}

#[test]
fn test_correlated_covariance_prefers_diversifier() {
    let scores = FactorScore::from_pairs([("A", 0.5), ("B", 0.5), ("C", 0.5)]);
    // A and B move together, C is independent
    let cov = CovarianceMatrix::new(
        vec!["A".to_string(), "B".to_string(), "C".to_string()],
        array![[0.04, 0.036, 0.0], [0.036, 0.04, 0.0], [0.0, 0.0, 0.04]],
    )
    .unwrap();

    let weights = PortfolioOptimizer::default()
        .optimize_with_buckets(&scores, &cov, &UniverseBuckets::default(), &ConstraintSet::with_max_weight(1.0))
        .unwrap();
    assert!(weights.get("C") > weights.get("A"));
    assert!((weights.get("A") - weights.get("B")).abs() < 1e-3);
}

#[test]
fn test_optimized_weights_satisfy_declared_constraints() {
    let (scores, cov, buckets) = six_asset_universe();
    let tickers = scores.tickers();
    let constraints = ConstraintSet::default().build(&buckets, &tickers);
    assert_eq!(constraints.len(), 3);

    let weights = PortfolioOptimizer::default()
        .optimize(&scores, &cov, &constraints)
        .unwrap();
    let map = weights.to_map();
    assert!(constraints.iter().all(|c| c.is_satisfied(&map, EPS)));

    // a clearly drifted book trips the monitor
    let mut drifted = map;
    drifted.insert("X1".to_string(), 0.6);
    assert!(DriftMonitor::new().needs_rebalance(&drifted, &buckets, &ConstraintSet::default()));
}

#[test]
fn test_scores_outside_covariance_are_dropped() {
    let scores = FactorScore::from_pairs([("A", 0.9), ("B", 0.5), ("GONE", 0.99)]);
    let cov = CovarianceMatrix::diagonal([("A", 0.04), ("B", 0.09), ("Z", 0.01)]);
    let weights = PortfolioOptimizer::default()
        .optimize_with_buckets(&scores, &cov, &UniverseBuckets::default(), &ConstraintSet::with_max_weight(1.0))
        .unwrap();
    assert_eq!(weights.len(), 2);
    assert_eq!(weights.get("GONE"), 0.0);
}

#[test]
fn test_unconverged_solve_is_infeasible() {
    let (scores, cov, buckets) = six_asset_universe();
    let optimizer = PortfolioOptimizer::new(OptimizerConfig {
        max_iter: 1,
        ..Default::default()
    });

    let result = optimizer.optimize_with_buckets(&scores, &cov, &buckets, &ConstraintSet::default());
    match result {
        Err(OptimizeError::OptimizationInfeasible(reason)) => {
            assert!(reason.contains("solver status"), "{reason}");
        }
        other => panic!("expected infeasible, got {other:?}"),
    }

    // same problem converges with the default iteration cap
    assert!(PortfolioOptimizer::default()
        .optimize_with_buckets(&scores, &cov, &buckets, &ConstraintSet::default())
        .is_ok());
}
