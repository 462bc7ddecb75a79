//! Live and paper rebalancing.
//!
//! A [`Rebalancer`] runs one cycle against the collaborator traits: fetch
//! prices and fundamentals, check drift, and if needed re-optimize,
//! reconcile and submit orders. Collaborator failures for individual tickers
//! or orders become skip events; only account failures abort the cycle.

use crate::config::HobartConfig;
use crate::error::Result;
use crate::pipeline::{CycleOutcome, Pipeline, holdings_value, is_uninvested};
use chrono::{Duration, NaiveDate};
use hobart_data::{
    AccountProvider, FundamentalsProvider, OrderAck, OrderSink, PriceProvider, SkipEvent,
    SkipReason, gather_fundamentals, gather_history,
};
use hobart_portfolio::{TargetWeights, current_weights};

/// Result of one live cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceReport {
    /// Cycle date
    pub as_of: NaiveDate,
    /// Capital the targets were sized against
    pub capital: f64,
    /// What the cycle did
    pub outcome: CycleOutcome,
    /// Optimized weights, when the cycle re-optimized
    pub targets: Option<TargetWeights>,
    /// Acknowledged orders
    pub acks: Vec<OrderAck>,
    /// Tickers and orders skipped along the way
    pub skipped: Vec<SkipEvent>,
}

/// Drives live or paper rebalance cycles.
#[derive(Debug, Clone)]
pub struct Rebalancer {
    pipeline: Pipeline,
}

impl Rebalancer {
    /// Create a rebalancer.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: HobartConfig) -> Result<Self> {
        Ok(Self {
            pipeline: Pipeline::new(config)?,
        })
    }

    /// Configuration in use.
    pub const fn config(&self) -> &HobartConfig {
        self.pipeline.config()
    }

    /// Run one cycle for `universe` as of `as_of`.
    ///
    /// # Errors
    /// Returns an error only if the account cannot report capital or
    /// holdings. Every other failure is recorded in the report.
    pub async fn run<P, F, A, O>(
        &self,
        universe: &[String],
        as_of: NaiveDate,
        prices: &P,
        fundamentals: &F,
        account: &A,
        sink: &O,
    ) -> Result<RebalanceReport>
    where
        P: PriceProvider + ?Sized,
        F: FundamentalsProvider + ?Sized,
        A: AccountProvider + ?Sized,
        O: OrderSink + ?Sized,
    {
        let start = as_of - Duration::days(self.pipeline.window_days());
        let (history, history_skips) = gather_history(prices, universe, start, as_of).await;
        let (fundamentals, fundamental_skips) = gather_fundamentals(fundamentals, universe).await;
        let mut skipped: Vec<SkipEvent> = history_skips
            .into_iter()
            .chain(fundamental_skips)
            .map(|e| e.on(as_of))
            .collect();

        let buckets = self.pipeline.classify(&fundamentals);
        let latest = history.latest_prices();

        let holdings = account.holdings().await?;
        let mut capital = account.capital().await?;
        if capital <= 0.0 {
            match self.config().rebalance.fallback_capital {
                Some(fallback) => {
                    tracing::warn!(reported = capital, fallback, "account reports no capital, using fallback");
                    capital = fallback;
                }
                None => {
                    tracing::warn!(date = %as_of, reported = capital, "account reports no capital, skipping cycle");
                    let event = SkipEvent::cycle(Some(as_of), SkipReason::NoCapital);
                    return Ok(RebalanceReport {
                        as_of,
                        capital,
                        outcome: CycleOutcome::Skipped(event),
                        targets: None,
                        acks: Vec::new(),
                        skipped,
                    });
                }
            }
        }

        let cash = (capital - holdings_value(&holdings, &latest)).max(0.0);
        let (weights, _) = current_weights(&holdings, &latest, cash);
        let drift = self.pipeline.drift(&weights, &buckets);

        let report = |outcome: CycleOutcome,
                      targets: Option<TargetWeights>,
                      acks: Vec<OrderAck>,
                      skipped: Vec<SkipEvent>| RebalanceReport {
            as_of,
            capital,
            outcome,
            targets,
            acks,
            skipped,
        };

        if !self.config().rebalance.force && !drift.is_violated() && !is_uninvested(&holdings) {
            tracing::info!(date = %as_of, "weights in bounds, no rebalance");
            return Ok(report(CycleOutcome::InBounds, None, Vec::new(), skipped));
        }

        let targets = match self.pipeline.target_weights(&history, &fundamentals, &buckets) {
            Ok(targets) => targets,
            Err(e) => {
                let event = SkipEvent::cycle(Some(as_of), e.skip_reason());
                return Ok(report(CycleOutcome::Skipped(event), None, Vec::new(), skipped));
            }
        };
        skipped.extend(targets.scores.skipped().iter().cloned().map(|e| e.on(as_of)));

        let reconciliation = self
            .pipeline
            .reconcile(&targets.weights, capital, &holdings, &latest);
        skipped.extend(reconciliation.skipped.into_iter().map(|e| e.on(as_of)));

        let mut acks = Vec::with_capacity(reconciliation.orders.len());
        for order in &reconciliation.orders {
            match sink.submit(order).await {
                Ok(ack) => {
                    tracing::info!(ticker = %order.ticker, quantity = order.quantity, id = %ack.id, "order submitted");
                    acks.push(ack);
                }
                Err(e) => skipped.push(
                    SkipEvent::ticker(order.ticker.as_str(), SkipReason::OrderRejected(e.to_string()))
                        .on(as_of),
                ),
            }
        }

        Ok(report(
            CycleOutcome::Rebalanced {
                orders: reconciliation.orders,
            },
            Some(targets.weights),
            acks,
            skipped,
        ))
    }
}
