//! Streaming candle aggregation.
//!
//! Turns a live price feed into closed fixed-width OHLC bars. One aggregator
//! per instrument stream; it holds exactly one partial candle at a time and
//! emits the finished bar when the first tick of a later bucket arrives.

pub mod granularity;

pub use granularity::Granularity;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::Bar;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregatorError {
    /// The tick maps to a bucket before the one currently open. The tick is
    /// dropped and the partial candle is left untouched.
    #[error("tick for bucket {bucket} arrived after bucket {current} was opened")]
    OutOfOrderTick {
        bucket: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("tick price must be finite (got {0})")]
    InvalidPrice(f64),
}

/// The candle currently being built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartialCandle {
    pub bucket_start: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub ticks: u32,
}

impl PartialCandle {
    fn open_at(bucket_start: DateTime<Utc>, price: f64) -> Self {
        Self {
            bucket_start,
            open: price,
            high: price,
            low: price,
            close: price,
            ticks: 1,
        }
    }

    fn absorb(&mut self, price: f64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.ticks += 1;
    }

    fn to_bar(self) -> Bar {
        Bar::new(self.bucket_start, self.open, self.high, self.low, self.close)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Empty,
    Accumulating(PartialCandle),
}

/// Tick → bar state machine: `Empty` → `Accumulating` → (rollover) `Accumulating`.
#[derive(Debug, Clone)]
pub struct CandleAggregator {
    granularity: Granularity,
    state: State,
}

impl CandleAggregator {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            state: State::Empty,
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn partial(&self) -> Option<&PartialCandle> {
        match &self.state {
            State::Empty => None,
            State::Accumulating(candle) => Some(candle),
        }
    }

    /// Feed one tick. Returns the closed bar when the tick opens a new bucket.
    ///
    /// Ticks must arrive in non-decreasing bucket order; a tick for an earlier
    /// bucket yields [`AggregatorError::OutOfOrderTick`] and changes nothing.
    pub fn update(
        &mut self,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<Bar>, AggregatorError> {
        if !price.is_finite() {
            return Err(AggregatorError::InvalidPrice(price));
        }
        let bucket = self.granularity.bucket_start(timestamp);

        match &mut self.state {
            State::Empty => {
                self.state = State::Accumulating(PartialCandle::open_at(bucket, price));
                Ok(None)
            }
            State::Accumulating(candle) if bucket == candle.bucket_start => {
                candle.absorb(price);
                Ok(None)
            }
            State::Accumulating(candle) if bucket < candle.bucket_start => {
                Err(AggregatorError::OutOfOrderTick {
                    bucket,
                    current: candle.bucket_start,
                })
            }
            State::Accumulating(candle) => {
                let closed = candle.to_bar();
                debug!(
                    bucket = %closed.timestamp,
                    open = closed.open,
                    high = closed.high,
                    low = closed.low,
                    close = closed.close,
                    ticks = candle.ticks,
                    "candle closed"
                );
                *candle = PartialCandle::open_at(bucket, price);
                Ok(Some(closed))
            }
        }
    }
}
