//! ATR stop prices.
//!
//! long_stop = close - mult * ATR, short_stop = close + mult * ATR. ATR's
//! warm-up NaNs flow through unchanged: there is no stop before ATR exists.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::error::EngineError;
use crate::indicators::{Atr, Indicator};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopRow {
    pub long_stop: f64,
    pub short_stop: f64,
    pub atr: f64,
}

/// Validated ATR stop calculator.
#[derive(Debug, Clone)]
pub struct AtrStops {
    atr: Atr,
    multiplier: f64,
}

impl AtrStops {
    pub fn new(atr_window: usize, multiplier: f64) -> Result<Self, EngineError> {
        let atr = Atr::new(atr_window)?;
        check_multiplier(multiplier)?;
        Ok(Self { atr, multiplier })
    }

    pub fn atr_window(&self) -> usize {
        self.atr.period()
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn compute(&self, bars: &[Bar]) -> Vec<StopRow> {
        let atr = self.atr.compute(bars);
        bars.iter()
            .zip(atr)
            .map(|(bar, atr)| {
                let offset = self.multiplier * atr;
                StopRow {
                    long_stop: bar.close - offset,
                    short_stop: bar.close + offset,
                    atr,
                }
            })
            .collect()
    }
}

pub(crate) fn check_multiplier(multiplier: f64) -> Result<(), EngineError> {
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return Err(EngineError::InvalidMultiplier(multiplier));
    }
    Ok(())
}

/// Long/short stop candidates and the ATR they were derived from, per bar.
pub fn stop_prices(
    bars: &[Bar],
    atr_window: usize,
    atr_mult: f64,
) -> Result<Vec<StopRow>, EngineError> {
    Ok(AtrStops::new(atr_window, atr_mult)?.compute(bars))
}
