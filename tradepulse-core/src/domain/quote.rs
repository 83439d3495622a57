//! Quote: one observation from a live price feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-of-book quote. Last-price feeds produce quotes with `bid == ask`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub timestamp: DateTime<Utc>,
    pub bid: f64,
    pub ask: f64,
}

impl Quote {
    pub fn new(timestamp: DateTime<Utc>, bid: f64, ask: f64) -> Self {
        Self { timestamp, bid, ask }
    }

    /// Quote from a single traded/last price.
    pub fn last_price(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self::new(timestamp, price, price)
    }

    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }
}
