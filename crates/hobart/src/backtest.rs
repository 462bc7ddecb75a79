//! Historical simulation.
//!
//! [`Backtest::run`] returns a lazy iterator that walks the panel one date at
//! a time. Each step marks holdings to market, checks drift and, when a
//! constraint is breached or the book is all cash, re-optimizes and fills the
//! reconciled orders at that day's prices. Only holdings, cash and the last
//! seen prices carry from one step to the next.

use crate::config::HobartConfig;
use crate::error::Result;
use crate::pipeline::{CycleOutcome, Pipeline, is_uninvested};
use chrono::NaiveDate;
use hobart_data::{FundamentalsMap, Holdings, OrderIntent, PriceHistory, SkipEvent};
use hobart_output::{AllocationRecord, AllocationTable, PerformanceSummary};
use hobart_portfolio::{UniverseBuckets, current_weights};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Portfolio state at the end of one simulated day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSnapshot {
    /// Simulated date
    pub date: NaiveDate,
    /// Holdings at last prices plus cash
    pub portfolio_value: f64,
    /// Uninvested cash
    pub cash: f64,
    /// Holding weights against the portfolio value
    pub weights: BTreeMap<String, f64>,
    /// Share counts after the day's fills
    pub holdings: Holdings,
    /// What the cycle did
    pub outcome: CycleOutcome,
    /// Tickers skipped during the cycle
    pub skipped: Vec<SkipEvent>,
}

impl From<&BacktestSnapshot> for AllocationRecord {
    fn from(snapshot: &BacktestSnapshot) -> Self {
        Self::new(snapshot.date, snapshot.portfolio_value, snapshot.weights.clone())
    }
}

/// A configured simulation over a fixed panel.
#[derive(Debug, Clone)]
pub struct Backtest {
    pipeline: Pipeline,
    history: PriceHistory,
    fundamentals: FundamentalsMap,
    buckets: UniverseBuckets,
}

impl Backtest {
    /// Prepare a backtest.
    ///
    /// Tickers in the panel without fundamentals get an empty snapshot, so
    /// they score neutral on value and fall in no bucket.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(
        history: PriceHistory,
        mut fundamentals: FundamentalsMap,
        config: HobartConfig,
    ) -> Result<Self> {
        let pipeline = Pipeline::new(config)?;
        for ticker in history.tickers() {
            fundamentals.entry(ticker.clone()).or_default();
        }
        let buckets = pipeline.classify(&fundamentals);
        Ok(Self {
            pipeline,
            history,
            fundamentals,
            buckets,
        })
    }

    /// Buckets the universe was classified into.
    pub const fn buckets(&self) -> &UniverseBuckets {
        &self.buckets
    }

    /// Configuration in use.
    pub const fn config(&self) -> &HobartConfig {
        self.pipeline.config()
    }

    /// Start a fresh run.
    pub fn run(&self) -> BacktestRun<'_> {
        let dates = self.history.dates();
        let config = &self.config().backtest;
        let start = config
            .start
            .map_or(0, |d| dates.partition_point(|x| *x < d));
        let end = config
            .end
            .map_or(dates.len(), |d| dates.partition_point(|x| *x <= d));

        // seed last prices with anything observed before the first simulated day
        let last_prices = if start > 0 {
            self.history.rows(0, start).latest_prices()
        } else {
            HashMap::new()
        };

        BacktestRun {
            backtest: self,
            row: start,
            end,
            cash: config.initial_capital,
            holdings: Holdings::new(),
            last_prices,
        }
    }
}

/// Lazy iterator over a backtest's daily snapshots.
#[derive(Debug)]
pub struct BacktestRun<'a> {
    backtest: &'a Backtest,
    row: usize,
    end: usize,
    cash: f64,
    holdings: Holdings,
    last_prices: HashMap<String, f64>,
}

impl BacktestRun<'_> {
    fn step(&mut self, row: usize) -> BacktestSnapshot {
        let backtest = self.backtest;
        let pipeline = &backtest.pipeline;
        let date = backtest.history.dates()[row];

        for (ticker, price) in backtest.history.row_prices(row) {
            if price.is_finite() && price > 0.0 {
                self.last_prices.insert(ticker, price);
            }
        }

        let (weights, value) = current_weights(&self.holdings, &self.last_prices, self.cash);
        let drift = pipeline.drift(&weights, &backtest.buckets);
        if !drift.is_violated() && !is_uninvested(&self.holdings) {
            return self.snapshot(date, CycleOutcome::InBounds, Vec::new());
        }

        let window = backtest.history.trailing_window(date, pipeline.window_days());
        let targets = match pipeline.target_weights(&window, &backtest.fundamentals, &backtest.buckets)
        {
            Ok(targets) => targets,
            Err(e) => {
                let event = SkipEvent::cycle(Some(date), e.skip_reason());
                return self.snapshot(date, CycleOutcome::Skipped(event), Vec::new());
            }
        };

        let mut skipped: Vec<SkipEvent> = targets
            .scores
            .skipped()
            .iter()
            .cloned()
            .map(|e| e.on(date))
            .collect();
        let reconciliation =
            pipeline.reconcile(&targets.weights, value, &self.holdings, &self.last_prices);
        skipped.extend(reconciliation.skipped.into_iter().map(|e| e.on(date)));

        let filled: Vec<OrderIntent> = reconciliation
            .orders
            .into_iter()
            .filter_map(|order| self.fill(order))
            .collect();
        tracing::info!(
            date = %date,
            orders = filled.len(),
            value,
            "rebalanced"
        );
        self.snapshot(date, CycleOutcome::Rebalanced { orders: filled }, skipped)
    }

    /// Fill at the last price. Buys are cut to the shares cash can pay for.
    fn fill(&mut self, mut order: OrderIntent) -> Option<OrderIntent> {
        let price = self.last_prices.get(&order.ticker).copied()?;
        if order.quantity > 0 {
            let affordable = (self.cash / price).floor().max(0.0) as i64;
            if affordable < order.quantity {
                tracing::debug!(ticker = %order.ticker, wanted = order.quantity, affordable, "buy cut to cash");
                order.quantity = affordable;
            }
        }
        if order.quantity == 0 {
            return None;
        }

        let cost = order.quantity as f64 * price;
        // a buy of floor(cash / price) shares may undershoot zero by rounding
        self.cash = if order.quantity > 0 {
            (self.cash - cost).max(0.0)
        } else {
            self.cash - cost
        };
        let held = self.holdings.entry(order.ticker.clone()).or_insert(0);
        *held += order.quantity;
        if *held == 0 {
            self.holdings.remove(&order.ticker);
        }
        Some(order)
    }

    fn snapshot(
        &self,
        date: NaiveDate,
        outcome: CycleOutcome,
        skipped: Vec<SkipEvent>,
    ) -> BacktestSnapshot {
        let (weights, portfolio_value) =
            current_weights(&self.holdings, &self.last_prices, self.cash);
        BacktestSnapshot {
            date,
            portfolio_value,
            cash: self.cash,
            weights,
            holdings: self.holdings.clone(),
            outcome,
            skipped,
        }
    }
}

impl Iterator for BacktestRun<'_> {
    type Item = BacktestSnapshot;

    fn next(&mut self) -> Option<Self::Item> {
        if self.row >= self.end {
            return None;
        }
        let row = self.row;
        self.row += 1;
        Some(self.step(row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end.saturating_sub(self.row);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BacktestRun<'_> {}

/// Allocation table of a finished run.
pub fn allocation_table(snapshots: &[BacktestSnapshot]) -> AllocationTable {
    snapshots.iter().map(AllocationRecord::from).collect()
}

/// Performance summary of a finished run.
pub fn summarize(name: &str, snapshots: &[BacktestSnapshot]) -> PerformanceSummary {
    let path: Vec<(NaiveDate, f64)> = snapshots
        .iter()
        .map(|s| (s.date, s.portfolio_value))
        .collect();
    let rebalances = snapshots.iter().filter(|s| s.outcome.is_rebalanced()).count();
    let skipped = snapshots.iter().filter(|s| s.outcome.is_skipped()).count();
    PerformanceSummary::from_values(name, &path, rebalances, skipped)
}
