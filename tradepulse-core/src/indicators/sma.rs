//! Simple Moving Average (SMA).
//!
//! Rolling mean over a trailing window. The first `period - 1` values are NaN
//! (insufficient history), and any NaN inside a window makes that output NaN.

use super::Indicator;
use crate::domain::Bar;
use crate::error::{check_window, EngineError};

/// SMA of close prices.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, EngineError> {
        check_window("sma", period)?;
        Ok(Self {
            period,
            name: format!("sma_{period}"),
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        rolling_mean(&closes, self.period)
    }
}

/// Trailing mean of `values` over `period` samples, aligned index-for-index.
///
/// Each output is summed from its own window, so rounding from samples that
/// have already left the window never leaks into later values. A window whose
/// samples are all equal returns that sample exactly.
///
/// `period` must be >= 1; callers validate through [`Sma::new`] or
/// [`super::atr`]. A zero period yields an all-NaN series.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return result;
    }

    for (i, window) in values.windows(period).enumerate() {
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        let first = window[0];
        result[i + period - 1] = if window.iter().all(|&v| v == first) {
            first
        } else {
            window.iter().sum::<f64>() / period as f64
        };
    }

    result
}
