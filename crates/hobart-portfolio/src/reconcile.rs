//! Target weights to share deltas.

use crate::weights::TargetWeights;
use hobart_data::{Holdings, OrderIntent, SkipEvent, SkipReason};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Order in which reconciled intents are emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSequencing {
    /// Insertion order of the target weights
    #[default]
    TargetOrder,
    /// All sells, then all buys, each in target order
    SellsFirst,
}

/// Configuration for the reconciler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Emission order (default: target order)
    pub sequencing: OrderSequencing,
    /// Close held tickers absent from the targets (default: false)
    pub liquidate_untargeted: bool,
}

/// Orders produced by one reconciliation, plus skipped tickers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Signed share deltas, never zero
    pub orders: Vec<OrderIntent>,
    /// Tickers left untouched for lack of a usable price
    pub skipped: Vec<SkipEvent>,
}

impl Reconciliation {
    /// Whether no order was produced.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// Converts target weights into share deltas.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    config: ReconcilerConfig,
}

impl Reconciler {
    /// Create a reconciler.
    pub const fn new(config: ReconcilerConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Share counts implied by `targets` at `prices`.
    ///
    /// Each is `floor(capital * weight / price)`. Tickers without a positive
    /// price are left out and reported.
    pub fn target_shares(
        &self,
        targets: &TargetWeights,
        capital: f64,
        prices: &HashMap<String, f64>,
    ) -> (Vec<(String, i64)>, Vec<SkipEvent>) {
        let mut shares = Vec::with_capacity(targets.len());
        let mut skipped = Vec::new();
        for (ticker, weight) in targets.iter() {
            match prices.get(ticker).copied().filter(|p| p.is_finite() && *p > 0.0) {
                Some(price) => {
                    let count = (capital * weight / price).floor() as i64;
                    shares.push((ticker.to_string(), count));
                }
                None => skipped.push(SkipEvent::ticker(ticker, SkipReason::MissingMarketData)),
            }
        }
        (shares, skipped)
    }

    /// Signed share deltas moving `holdings` to `targets`.
    pub fn delta(
        &self,
        targets: &TargetWeights,
        capital: f64,
        holdings: &Holdings,
        prices: &HashMap<String, f64>,
    ) -> Reconciliation {
        let (shares, skipped) = self.target_shares(targets, capital, prices);

        let mut orders: Vec<OrderIntent> = shares
            .into_iter()
            .filter_map(|(ticker, target)| {
                let held = holdings.get(&ticker).copied().unwrap_or(0);
                let quantity = target - held;
                (quantity != 0).then(|| OrderIntent::new(ticker, quantity))
            })
            .collect();

        if self.config.liquidate_untargeted {
            let mut untargeted: Vec<(&String, &i64)> = holdings
                .iter()
                .filter(|(t, q)| **q != 0 && !targets.iter().any(|(target, _)| target == t.as_str()))
                .collect();
            untargeted.sort();
            orders.extend(untargeted.into_iter().map(|(t, q)| OrderIntent::new(t.clone(), -q)));
        }

        if self.config.sequencing == OrderSequencing::SellsFirst {
            // stable sort keeps target order within each side
            orders.sort_by_key(|o| o.quantity > 0);
        }

        for order in &orders {
            tracing::debug!(ticker = %order.ticker, quantity = order.quantity, "reconciled order");
        }
        Reconciliation { orders, skipped }
    }
}
