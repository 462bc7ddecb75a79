//! Classify a small universe, optimize it and reconcile against a book.

use hobart_data::{Fundamentals, FundamentalsMap, Holdings};
use hobart_factors::FactorScore;
use hobart_portfolio::{
    ConstraintSet, OptimizeError, PortfolioOptimizer, Reconciler, UniverseClassifier,
};
use hobart_risk::CovarianceMatrix;
use std::collections::HashMap;

fn main() -> Result<(), OptimizeError> {
    let fundamentals: FundamentalsMap = [
        ("AAPL", Some(3.0e12), Some(29.0)),
        ("MSFT", Some(2.8e12), Some(34.0)),
        ("PLUG", Some(1.5e9), None),
        ("RUN", Some(1.8e9), Some(-12.0)),
        ("SPY", None, None),
        ("XLE", None, None),
    ]
    .into_iter()
    .map(|(t, cap, pe)| (t.to_string(), Fundamentals::new(cap, pe)))
    .collect();

    let buckets = UniverseClassifier::default().classify(&fundamentals);
    println!("Small caps: {:?}", buckets.small_caps);
    println!("Large caps: {:?}", buckets.large_caps);
    println!("ETFs:       {:?}\n", buckets.etfs);

    let scores = FactorScore::from_pairs([
        ("AAPL", 0.72),
        ("MSFT", 0.81),
        ("PLUG", 0.15),
        ("RUN", 0.33),
        ("SPY", 0.45),
        ("XLE", 0.58),
    ]);
    let cov = CovarianceMatrix::diagonal([
        ("AAPL", 0.070),
        ("MSFT", 0.060),
        ("PLUG", 0.450),
        ("RUN", 0.380),
        ("SPY", 0.030),
        ("XLE", 0.090),
    ]);

    let optimizer = PortfolioOptimizer::default();
    let weights = optimizer.optimize_with_buckets(&scores, &cov, &buckets, &ConstraintSet::default())?;
    let (ret, vol, sharpe) = optimizer.performance(&weights, &scores, &cov);

    println!("{:<8} {:>8}", "Ticker", "Weight");
    for (ticker, weight) in weights.iter() {
        println!("{ticker:<8} {:>7.2}%", weight * 100.0);
    }
    println!("\nExpected {ret:.4}  Volatility {vol:.4}  Sharpe {sharpe:.3}\n");

    let prices: HashMap<String, f64> = [
        ("AAPL", 227.5),
        ("MSFT", 415.1),
        ("PLUG", 2.4),
        ("RUN", 11.9),
        ("SPY", 560.2),
        ("XLE", 91.3),
    ]
    .into_iter()
    .map(|(t, p)| (t.to_string(), p))
    .collect();
    let holdings: Holdings = [("SPY".to_string(), 40), ("PLUG".to_string(), 1000)].into();

    let reconciliation = Reconciler::default().delta(&weights, 100_000.0, &holdings, &prices);
    for order in &reconciliation.orders {
        println!("{order}");
    }
    Ok(())
}
