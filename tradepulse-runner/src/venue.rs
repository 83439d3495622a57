//! Execution venues for the live loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tradepulse_core::domain::OrderRequest;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VenueError {
    #[error("venue unavailable: {0}")]
    Unavailable(String),

    #[error("order rejected: {0}")]
    Rejected(String),
}

/// Account and order capability of a broker.
pub trait ExecutionVenue {
    fn equity(&mut self) -> Result<f64, VenueError>;

    /// Submit a market order at `at`; returns the venue's order id.
    fn place_order(
        &mut self,
        order: &OrderRequest,
        at: DateTime<Utc>,
    ) -> Result<String, VenueError>;
}

impl<V: ExecutionVenue + ?Sized> ExecutionVenue for Box<V> {
    fn equity(&mut self) -> Result<f64, VenueError> {
        (**self).equity()
    }

    fn place_order(
        &mut self,
        order: &OrderRequest,
        at: DateTime<Utc>,
    ) -> Result<String, VenueError> {
        (**self).place_order(order, at)
    }
}

/// An order as recorded by [`PaperVenue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub id: String,
    pub placed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub request: OrderRequest,
}

/// In-memory account: accepts every order and never moves equity on its own.
#[derive(Debug, Clone)]
pub struct PaperVenue {
    equity: f64,
    orders: Vec<PlacedOrder>,
}

impl PaperVenue {
    pub fn new(equity: f64) -> Self {
        Self {
            equity,
            orders: Vec::new(),
        }
    }

    /// Move equity, e.g. to simulate marked-to-market losses.
    pub fn set_equity(&mut self, equity: f64) {
        self.equity = equity;
    }

    pub fn orders(&self) -> &[PlacedOrder] {
        &self.orders
    }
}

impl ExecutionVenue for PaperVenue {
    fn equity(&mut self) -> Result<f64, VenueError> {
        Ok(self.equity)
    }

    fn place_order(
        &mut self,
        order: &OrderRequest,
        at: DateTime<Utc>,
    ) -> Result<String, VenueError> {
        if order.units == 0 {
            return Err(VenueError::Rejected("zero units".into()));
        }
        let id = format!("paper-{}", self.orders.len() + 1);
        self.orders.push(PlacedOrder {
            id: id.clone(),
            placed_at: at,
            request: order.clone(),
        });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tradepulse_core::domain::OrderSide;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 10, minute, 0).unwrap()
    }

    #[test]
    fn records_orders_with_sequential_ids() {
        let mut venue = PaperVenue::new(10_000.0);
        let order = OrderRequest::new("EUR_USD", OrderSide::Buy, 1_000, Some(1.09));
        assert_eq!(venue.place_order(&order, at(1)).unwrap(), "paper-1");
        assert_eq!(venue.place_order(&order, at(2)).unwrap(), "paper-2");
        assert_eq!(venue.orders().len(), 2);
        assert_eq!(venue.orders()[0].request, order);
        assert_eq!(venue.orders()[0].placed_at, at(1));
        assert_eq!(venue.orders()[1].placed_at, at(2));
    }

    #[test]
    fn rejects_empty_orders() {
        let mut venue = PaperVenue::new(10_000.0);
        let order = OrderRequest::new("EUR_USD", OrderSide::Sell, 0, None);
        assert!(matches!(venue.place_order(&order, at(0)), Err(VenueError::Rejected(_))));
        assert!(venue.orders().is_empty());
    }

    #[test]
    fn equity_is_settable() {
        let mut venue = PaperVenue::new(10_000.0);
        venue.set_equity(9_500.0);
        assert_eq!(venue.equity().unwrap(), 9_500.0);
    }
}
