//! Constrained maximum-Sharpe optimizer.
//!
//! Maximizing `(μ - r_f)'w / sqrt(w'Σw)` is not convex in `w`, but with the
//! substitution `y = κw` it becomes the quadratic program
//!
//! ```text
//! minimize    y'Σy
//! subject to  (μ - r_f)'y = 1
//!             1'y = κ
//!             y >= 0, κ >= 0
//!             a'y <= b κ      for every linear constraint row a'w <= b
//! ```
//!
//! and the weights are recovered as `w = y / κ`. Clarabel solves the program
//! in the form `Ax + s = b, s ∈ K` over `x = [y, κ]`.

use crate::constraints::{ConstraintSet, LinearRow, PortfolioConstraint};
use crate::error::{OptimizeError, Result};
use crate::universe::UniverseBuckets;
use crate::weights::TargetWeights;
use hobart_factors::FactorScore;
use hobart_risk::CovarianceMatrix;
use clarabel::algebra::CscMatrix;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Configuration for the optimizer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Annual risk-free rate subtracted from expected returns (default: 0.02)
    pub risk_free_rate: f64,
    /// Weights below this snap to zero (default: 1e-4)
    pub weight_cutoff: f64,
    /// Decimal places kept after cleaning (default: 5)
    pub rounding: u32,
    /// Solver wall-clock limit in seconds (default: 10)
    pub time_limit_secs: Option<f64>,
    /// Solver iteration cap (default: 200)
    pub max_iter: u32,
    /// Tolerance when re-checking constraints on cleaned weights (default: 1e-3)
    pub feasibility_tolerance: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
            weight_cutoff: 1e-4,
            rounding: 5,
            time_limit_secs: Some(10.0),
            max_iter: 200,
            feasibility_tolerance: 1e-3,
        }
    }
}

/// Maximum-Sharpe optimizer over a scored universe.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortfolioOptimizer {
    config: OptimizerConfig,
}

impl PortfolioOptimizer {
    /// Create a new optimizer
    pub const fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Current configuration
    pub const fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Solve with constraints built from `constraints` and `buckets`.
    ///
    /// Bucket floors cover only bucket members that survive alignment, so a
    /// bucket with no such member adds no constraint.
    ///
    /// # Errors
    /// See [`optimize`](Self::optimize).
    pub fn optimize_with_buckets(
        &self,
        scores: &FactorScore,
        covariance: &CovarianceMatrix,
        buckets: &UniverseBuckets,
        constraints: &ConstraintSet,
    ) -> Result<TargetWeights> {
        let tickers = aligned_tickers(scores, covariance);
        let constraints = constraints.build(buckets, &tickers);
        self.optimize(scores, covariance, &constraints)
    }

    /// Solve for maximum-Sharpe weights.
    ///
    /// Tickers missing from either the scores or the covariance are dropped.
    /// Output weights follow score order and include zero weights.
    ///
    /// # Errors
    /// Returns [`OptimizeError::EmptyUniverse`] if no ticker remains, and
    /// [`OptimizeError::OptimizationInfeasible`] if the constraints cannot be
    /// met, no asset beats the risk-free rate, or the solver fails or times out.
    pub fn optimize(
        &self,
        scores: &FactorScore,
        covariance: &CovarianceMatrix,
        constraints: &[PortfolioConstraint],
    ) -> Result<TargetWeights> {
        let tickers = aligned_tickers(scores, covariance);
        if tickers.is_empty() {
            return Err(OptimizeError::EmptyUniverse);
        }
        let cov = covariance.align(&tickers);
        let mu: Array1<f64> = tickers
            .iter()
            .map(|t| scores.get(t).map_or(0.0, |s| s.combined))
            .collect();
        let excess = &mu - self.config.risk_free_rate;

        if excess.iter().all(|e| *e <= 0.0) {
            return Err(OptimizeError::OptimizationInfeasible(format!(
                "no asset has expected return above the risk-free rate {}",
                self.config.risk_free_rate
            )));
        }
        for constraint in constraints {
            if let PortfolioConstraint::MaxWeight { limit } = constraint {
                if limit * (tickers.len() as f64) < 1.0 {
                    return Err(OptimizeError::OptimizationInfeasible(format!(
                        "{} tickers cannot be fully invested under a {limit} weight cap",
                        tickers.len()
                    )));
                }
            }
        }

        let rows: Vec<LinearRow> = constraints
            .iter()
            .flat_map(|c| c.linear_rows(&tickers))
            .collect();
        let raw = self.solve(cov.matrix(), &excess, &rows)?;
        let cleaned = self.fit_budget(raw.iter().map(|w| self.clean(*w)).collect());
        let weights: Vec<(String, f64)> = tickers.into_iter().zip(cleaned).collect();
        let weights = TargetWeights::new(weights);

        let map = weights.to_map();
        if let Some(broken) = constraints
            .iter()
            .find(|c| !c.is_satisfied(&map, self.config.feasibility_tolerance))
        {
            return Err(OptimizeError::OptimizationInfeasible(format!(
                "solution violates {broken:?}"
            )));
        }

        tracing::debug!(
            tickers = weights.len(),
            invested = weights.total(),
            "optimized weights"
        );
        Ok(weights)
    }

    /// Expected return, volatility and Sharpe ratio of `weights`.
    pub fn performance(
        &self,
        weights: &TargetWeights,
        scores: &FactorScore,
        covariance: &CovarianceMatrix,
    ) -> (f64, f64, f64) {
        let w: Array1<f64> = covariance.tickers().iter().map(|t| weights.get(t)).collect();
        let expected: f64 = weights
            .iter()
            .map(|(t, w)| w * scores.get(t).map_or(0.0, |s| s.combined))
            .sum();
        let volatility = covariance.portfolio_variance(&w).max(0.0).sqrt();
        let sharpe = if volatility > 0.0 {
            (expected - self.config.risk_free_rate) / volatility
        } else {
            0.0
        };
        (expected, volatility, sharpe)
    }

    fn clean(&self, weight: f64) -> f64 {
        if weight < self.config.weight_cutoff {
            return 0.0;
        }
        let scale = 10f64.powi(self.config.rounding as i32);
        (weight * scale).round() / scale
    }

    /// Scale cleaned weights down until they fit a fully invested budget.
    ///
    /// Rounding can push the sum a hair above one. Shrunk weights are floored
    /// at the configured precision so the sum never exceeds one afterwards.
    fn fit_budget(&self, weights: Vec<f64>) -> Vec<f64> {
        let total: f64 = weights.iter().sum();
        if total <= 1.0 {
            return weights;
        }
        let scale = 10f64.powi(self.config.rounding as i32);
        weights
            .into_iter()
            .map(|w| (w / total * scale).floor() / scale)
            .collect()
    }

    fn solve(&self, sigma: &Array2<f64>, excess: &Array1<f64>, rows: &[LinearRow]) -> Result<Vec<f64>> {
        use clarabel::solver::*;

        let n = excess.len();
        let kappa = n;
        let n_vars = n + 1;

        // Upper triangle of Σ; κ has no quadratic term
        let p = upper_triangle_csc(sigma, n_vars);
        let q = vec![0.0; n_vars];

        let n_eq = 2;
        let n_ineq = n + 1 + rows.len();
        let mut a = Array2::<f64>::zeros((n_eq + n_ineq, n_vars));
        let mut b = vec![0.0; n_eq + n_ineq];

        // (μ - r_f)'y = 1
        for i in 0..n {
            a[[0, i]] = excess[i];
        }
        b[0] = 1.0;
        // 1'y - κ = 0
        for i in 0..n {
            a[[1, i]] = 1.0;
        }
        a[[1, kappa]] = -1.0;
        // -y <= 0, -κ <= 0
        for i in 0..=n {
            a[[n_eq + i, i]] = -1.0;
        }
        // a'y - bκ <= 0
        for (r, row) in rows.iter().enumerate() {
            let at = n_eq + n + 1 + r;
            for (i, coef) in &row.coefficients {
                a[[at, *i]] += coef;
            }
            a[[at, kappa]] = -row.bound;
        }
        let a = dense_csc(&a);
        let cones = [ZeroConeT(n_eq), NonnegativeConeT(n_ineq)];

        let mut builder = DefaultSettingsBuilder::default();
        builder.max_iter(self.config.max_iter).verbose(false);
        if let Some(limit) = self.config.time_limit_secs {
            builder.time_limit(limit);
        }
        let settings = builder.build().map_err(|e| {
            OptimizeError::InvalidConfig(format!("Failed to build settings: {e}"))
        })?;

        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let status = solver.solution.status;
        if !matches!(status, SolverStatus::Solved | SolverStatus::AlmostSolved) {
            tracing::warn!(status = ?status, "optimizer did not converge");
            return Err(OptimizeError::OptimizationInfeasible(format!(
                "solver status {status:?}"
            )));
        }

        let x = &solver.solution.x;
        let k = x[kappa];
        if !(k.is_finite() && k > 1e-12) {
            return Err(OptimizeError::OptimizationInfeasible(
                "degenerate scaling in solution".to_string(),
            ));
        }
        Ok(x[..n].iter().map(|y| (y / k).max(0.0)).collect())
    }
}

/// Score tickers that also appear in the covariance, in score order.
fn aligned_tickers(scores: &FactorScore, covariance: &CovarianceMatrix) -> Vec<String> {
    scores
        .tickers()
        .into_iter()
        .filter(|t| covariance.tickers().contains(t))
        .collect()
}

/// Upper triangle of a square matrix as an `n_vars x n_vars` CSC matrix.
fn upper_triangle_csc(matrix: &Array2<f64>, n_vars: usize) -> CscMatrix<f64> {
    let n = matrix.nrows();
    let mut colptr = vec![0];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();
    for j in 0..n_vars {
        if j < n {
            for i in 0..=j {
                let v = matrix[[i, j]];
                if v != 0.0 {
                    rowval.push(i);
                    nzval.push(v);
                }
            }
        }
        colptr.push(nzval.len());
    }
    CscMatrix::new(n_vars, n_vars, colptr, rowval, nzval)
}

/// Dense matrix as CSC, dropping exact zeros.
fn dense_csc(matrix: &Array2<f64>) -> CscMatrix<f64> {
    let (m, n) = matrix.dim();
    let mut colptr = vec![0];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();
    for j in 0..n {
        for i in 0..m {
            let v = matrix[[i, j]];
            if v != 0.0 {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr.push(nzval.len());
    }
    CscMatrix::new(m, n, colptr, rowval, nzval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe::UniverseBucket;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn scores() -> FactorScore {
        FactorScore::from_pairs([("A", 0.9), ("B", 0.5), ("C", 0.1)])
    }

    fn cov() -> CovarianceMatrix {
        CovarianceMatrix::diagonal([("A", 0.04), ("B", 0.09), ("C", 0.01)])
    }

    #[test]
    fn test_diagonal_universe_respects_cap() {
        let constraints = [PortfolioConstraint::MaxWeight { limit: 0.5 }];
        let weights = PortfolioOptimizer::default()
            .optimize(&scores(), &cov(), &constraints)
            .unwrap();

        assert_eq!(weights.len(), 3);
        assert!(weights.total() <= 1.0 + 1e-6);
        for (_, w) in weights.iter() {
            assert!((0.0..=0.5 + 1e-6).contains(&w));
        }
    }

    #[test]
    fn test_unconstrained_tangency_on_diagonal() {
        // Tangency weights are proportional to (μ - r_f) / σ²
        let constraints = [PortfolioConstraint::MaxWeight { limit: 1.0 }];
        let weights = PortfolioOptimizer::default()
            .optimize(&scores(), &cov(), &constraints)
            .unwrap();

        let raw = [0.88 / 0.04, 0.48 / 0.09, 0.08 / 0.01];
        let total: f64 = raw.iter().sum();
        assert_relative_eq!(weights.get("A"), raw[0] / total, epsilon = 1e-3);
        assert_relative_eq!(weights.get("B"), raw[1] / total, epsilon = 1e-3);
        assert_relative_eq!(weights.get("C"), raw[2] / total, epsilon = 1e-3);
    }

    #[test]
    fn test_bucket_floor_enforced() {
        let constraints = [
            PortfolioConstraint::MaxWeight { limit: 0.8 },
            PortfolioConstraint::MinBucketWeight {
                bucket: UniverseBucket::SmallCap,
                members: vec!["B".to_string()],
                floor: 0.3,
            },
        ];
        let weights = PortfolioOptimizer::default()
            .optimize(&scores(), &cov(), &constraints)
            .unwrap();
        assert!(weights.get("B") >= 0.3 - 1e-3);
    }

    #[test]
    fn test_cap_too_tight_is_infeasible() {
        let constraints = [PortfolioConstraint::MaxWeight { limit: 0.2 }];
        let result = PortfolioOptimizer::default().optimize(&scores(), &cov(), &constraints);
        assert!(matches!(result, Err(OptimizeError::OptimizationInfeasible(_))));
    }

    #[test]
    fn test_conflicting_floors_are_infeasible() {
        let constraints = [
            PortfolioConstraint::MaxWeight { limit: 0.5 },
            PortfolioConstraint::MinBucketWeight {
                bucket: UniverseBucket::SmallCap,
                members: vec!["A".to_string()],
                floor: 0.6,
            },
        ];
        let result = PortfolioOptimizer::default().optimize(&scores(), &cov(), &constraints);
        assert!(matches!(result, Err(OptimizeError::OptimizationInfeasible(_))));
    }

    #[test]
    fn test_no_excess_return_is_infeasible() {
        let scores = FactorScore::from_pairs([("A", 0.01), ("B", 0.0)]);
        let cov = CovarianceMatrix::diagonal([("A", 0.04), ("B", 0.09)]);
        let result = PortfolioOptimizer::default().optimize(&scores, &cov, &[]);
        assert!(matches!(result, Err(OptimizeError::OptimizationInfeasible(_))));
    }

    #[test]
    fn test_disjoint_universe() {
        let cov = CovarianceMatrix::diagonal([("X", 0.04)]);
        let result = PortfolioOptimizer::default().optimize(&scores(), &cov, &[]);
        assert_eq!(result, Err(OptimizeError::EmptyUniverse));
    }

    #[test]
    fn test_cleaning_snaps_and_rounds() {
        let optimizer = PortfolioOptimizer::default();
        assert_eq!(optimizer.clean(0.00009), 0.0);
        assert_eq!(optimizer.clean(0.123456789), 0.12346);
    }

    #[test]
    fn test_rounded_weights_never_exceed_budget() {
        let optimizer = PortfolioOptimizer::default();
        let fitted = optimizer.fit_budget(vec![0.33334, 0.33334, 0.33334]);
        assert!(fitted.iter().sum::<f64>() <= 1.0);
        assert_relative_eq!(fitted[0], 0.33333);

        let untouched = vec![0.2, 0.3, 0.5];
        assert_eq!(optimizer.fit_budget(untouched.clone()), untouched);
    }

    #[test]
    fn test_csc_layout() {
        let p = upper_triangle_csc(&array![[1.0, 2.0], [2.0, 3.0]], 3);
        assert_eq!(p.colptr, vec![0, 1, 3, 3]);
        assert_eq!(p.rowval, vec![0, 0, 1]);
        assert_eq!(p.nzval, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_performance() {
        let weights: TargetWeights = [("A", 1.0), ("B", 0.0), ("C", 0.0)].into_iter().collect();
        let (ret, vol, sharpe) = PortfolioOptimizer::default().performance(&weights, &scores(), &cov());
        assert_relative_eq!(ret, 0.9);
        assert_relative_eq!(vol, 0.2);
        assert_relative_eq!(sharpe, 0.88 / 0.2);
    }
}
