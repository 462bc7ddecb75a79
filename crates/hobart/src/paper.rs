//! In-memory brokerage account for paper trading.

use async_trait::async_trait;
use hobart_data::{
    AccountProvider, DataError, Holdings, OrderAck, OrderIntent, OrderSink, Result,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
struct Book {
    cash: f64,
    holdings: Holdings,
    prices: HashMap<String, f64>,
    next_id: u64,
}

/// Account and order sink that fills immediately at the last known price.
///
/// Buys need enough cash and sells cannot exceed the position, so the book
/// never goes short or into margin. Orders for tickers without a price are
/// rejected.
#[derive(Debug)]
pub struct PaperAccount {
    book: Mutex<Book>,
}

impl PaperAccount {
    /// An all-cash account.
    pub fn new(cash: f64) -> Self {
        Self::with_holdings(cash, Holdings::new())
    }

    /// An account with existing positions.
    pub fn with_holdings(cash: f64, holdings: Holdings) -> Self {
        Self {
            book: Mutex::new(Book {
                cash,
                holdings,
                prices: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Replace the prices used for valuation and fills.
    ///
    /// # Errors
    /// Returns an error if the book lock is poisoned.
    pub fn set_prices(&self, prices: HashMap<String, f64>) -> Result<()> {
        self.lock()?.prices = prices;
        Ok(())
    }

    /// Uninvested cash.
    ///
    /// # Errors
    /// Returns an error if the book lock is poisoned.
    pub fn cash(&self) -> Result<f64> {
        Ok(self.lock()?.cash)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Book>> {
        self.book
            .lock()
            .map_err(|_| DataError::Broker("paper book lock poisoned".to_string()))
    }
}

#[async_trait]
impl AccountProvider for PaperAccount {
    async fn capital(&self) -> Result<f64> {
        let book = self.lock()?;
        let invested: f64 = book
            .holdings
            .iter()
            .filter_map(|(t, q)| book.prices.get(t).map(|p| *q as f64 * p))
            .sum();
        Ok(book.cash + invested)
    }

    async fn holdings(&self) -> Result<Holdings> {
        Ok(self.lock()?.holdings.clone())
    }
}

#[async_trait]
impl OrderSink for PaperAccount {
    async fn submit(&self, order: &OrderIntent) -> Result<OrderAck> {
        let mut book = self.lock()?;
        let price = book
            .prices
            .get(&order.ticker)
            .copied()
            .filter(|p| *p > 0.0)
            .ok_or_else(|| DataError::Broker(format!("no price for {}", order.ticker)))?;

        let held = book.holdings.get(&order.ticker).copied().unwrap_or(0);
        let cost = order.quantity as f64 * price;
        if cost > book.cash + 1e-6 {
            return Err(DataError::Broker(format!(
                "insufficient cash for {order}: need {cost:.2}, have {:.2}",
                book.cash
            )));
        }
        if held + order.quantity < 0 {
            return Err(DataError::Broker(format!(
                "cannot {order}: only {held} held"
            )));
        }

        book.cash -= cost;
        let position = held + order.quantity;
        if position == 0 {
            book.holdings.remove(&order.ticker);
        } else {
            book.holdings.insert(order.ticker.clone(), position);
        }
        let id = format!("paper-{}", book.next_id);
        book.next_id += 1;

        tracing::info!(id = %id, ticker = %order.ticker, quantity = order.quantity, price, "paper fill");
        Ok(OrderAck {
            order: order.clone(),
            id,
            fill_price: Some(price),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices() -> HashMap<String, f64> {
        [("AAPL".to_string(), 100.0), ("SPY".to_string(), 500.0)].into()
    }

    #[tokio::test]
    async fn test_fills_and_values() {
        let account = PaperAccount::new(10_000.0);
        account.set_prices(prices()).unwrap();

        let ack = account.submit(&OrderIntent::new("AAPL", 30)).await.unwrap();
        assert_eq!(ack.id, "paper-1");
        assert_eq!(ack.fill_price, Some(100.0));
        assert_eq!(account.cash().unwrap(), 7_000.0);
        assert_eq!(account.capital().await.unwrap(), 10_000.0);

        account.submit(&OrderIntent::new("AAPL", -30)).await.unwrap();
        assert!(account.holdings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejections() {
        let account = PaperAccount::with_holdings(1_000.0, [("SPY".to_string(), 1)].into());
        account.set_prices(prices()).unwrap();

        assert!(account.submit(&OrderIntent::new("SPY", 3)).await.is_err());
        assert!(account.submit(&OrderIntent::new("SPY", -2)).await.is_err());
        assert!(account.submit(&OrderIntent::new("NOPE", 1)).await.is_err());
        assert_eq!(account.capital().await.unwrap(), 1_500.0);
    }
}
