//! Outbound sizing decision handed to the execution collaborator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// A sized market order with an attached protective stop.
///
/// The core never talks to a venue; the broker layer translates this into
/// whatever calls its API needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub instrument: String,
    pub side: OrderSide,
    pub units: u64,
    pub stop_price: Option<f64>,
}

impl OrderRequest {
    pub fn new(
        instrument: impl Into<String>,
        side: OrderSide,
        units: u64,
        stop_price: Option<f64>,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            side,
            units,
            stop_price,
        }
    }
}
