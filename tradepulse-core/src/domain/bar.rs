//! Bars, the fundamental market data unit, and the rolling bar history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLC bar at a single timestamp.
///
/// For aggregated bars the timestamp is the bucket start. Volume is optional
/// because quote-driven feeds (FX) carry none.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl Bar {
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    /// Bar seeded from a single price: O = H = L = C.
    pub fn flat(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self::new(timestamp, price, price, price, price)
    }

    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low and both bracket open and close.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("bar timestamp {next} is not after previous bar at {previous}")]
    NonIncreasingTimestamp {
        previous: DateTime<Utc>,
        next: DateTime<Utc>,
    },

    #[error("invalid granularity: {0}")]
    InvalidGranularity(String),
}

/// Time-ordered bar history for one instrument.
///
/// Timestamps are strictly increasing; `push` rejects anything else, so every
/// windowed computation downstream can assume a well-formed series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from pre-loaded bars, validating the ordering invariant.
    pub fn from_bars(bars: Vec<Bar>) -> Result<Self, BarError> {
        for pair in bars.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(BarError::NonIncreasingTimestamp {
                    previous: pair[0].timestamp,
                    next: pair[1].timestamp,
                });
            }
        }
        Ok(Self { bars })
    }

    /// Append a bar. Fails if its timestamp does not advance the series.
    pub fn push(&mut self, bar: Bar) -> Result<(), BarError> {
        if let Some(last) = self.bars.last() {
            if bar.timestamp <= last.timestamp {
                return Err(BarError::NonIncreasingTimestamp {
                    previous: last.timestamp,
                    next: bar.timestamp,
                });
            }
        }
        self.bars.push(bar);
        Ok(())
    }

    /// Keep only the most recent `cap` bars.
    pub fn trim_to(&mut self, cap: usize) {
        if self.bars.len() > cap {
            let excess = self.bars.len() - cap;
            self.bars.drain(..excess);
        }
    }

    pub fn as_slice(&self) -> &[Bar] {
        &self.bars
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }
}

impl AsRef<[Bar]> for BarSeries {
    fn as_ref(&self) -> &[Bar] {
        &self.bars
    }
}
