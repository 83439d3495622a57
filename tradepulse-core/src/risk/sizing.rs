//! Risk-bounded position sizing.
//!
//! Risk a fixed fraction of equity per trade, with the loss at the stop
//! defining how many units that budget buys:
//!
//! ```text
//! risk_amount   = equity * risk_per_trade
//! stop_distance = |entry - stop|
//! units         = floor(risk_amount / (stop_distance * pip_value_per_unit))
//! ```
//!
//! Degenerate inputs (zero or undefined stop distance, non-positive equity)
//! size to zero instead of failing, so a live loop survives transient bad data.

use serde::{Deserialize, Serialize};

/// Point-in-time risk budget supplied with each sizing call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskParams {
    /// Account equity in quote currency.
    pub equity: f64,
    /// Fraction of equity at risk per trade, e.g. 0.005 = 0.5%.
    pub risk_per_trade: f64,
    /// Upper bound on units regardless of the risk budget.
    pub max_position_size: Option<f64>,
}

impl RiskParams {
    pub fn new(equity: f64, risk_per_trade: f64) -> Self {
        Self {
            equity,
            risk_per_trade,
            max_position_size: None,
        }
    }

    pub fn with_max_position_size(mut self, max_position_size: f64) -> Self {
        self.max_position_size = Some(max_position_size);
        self
    }

    pub fn risk_amount(&self) -> f64 {
        self.equity * self.risk_per_trade
    }
}

/// Relative tolerance for snapping a raw unit count onto an integer.
const SNAP_TOLERANCE: f64 = 1e-9;

/// Floor a raw unit count, treating values within [`SNAP_TOLERANCE`] of the
/// next integer as that integer. Prices like 1.10 - 1.09 are not exact in
/// binary and would otherwise lose a whole unit.
fn floor_units(raw: f64) -> f64 {
    let nearest = raw.round();
    if (raw - nearest).abs() <= SNAP_TOLERANCE * nearest.abs().max(1.0) {
        nearest
    } else {
        raw.floor()
    }
}

/// Whole units to trade so that a stop-out loses `equity * risk_per_trade`.
///
/// The result is clamped to `units_cap` and to `params.max_position_size`
/// when given; the most restrictive bound wins.
pub fn position_size_by_risk(
    entry_price: f64,
    stop_price: f64,
    pip_value_per_unit: f64,
    params: &RiskParams,
    units_cap: Option<u64>,
) -> u64 {
    let stop_distance = (entry_price - stop_price).abs();
    if !stop_distance.is_finite() || stop_distance <= 0.0 {
        return 0;
    }

    let risk_amount = params.risk_amount();
    let loss_per_unit = stop_distance * pip_value_per_unit;
    if risk_amount.is_nan() || risk_amount <= 0.0 || loss_per_unit.is_nan() || loss_per_unit <= 0.0
    {
        return 0;
    }

    // Float-to-int casts saturate: +inf -> u64::MAX, negatives -> 0.
    let mut units = floor_units(risk_amount / loss_per_unit) as u64;

    if let Some(cap) = units_cap {
        units = units.min(cap);
    }
    if let Some(max) = params.max_position_size {
        units = units.min(max.floor() as u64);
    }
    units
}

/// Stop distance implied by an ATR reading.
pub fn stop_distance_from_atr(atr: f64, atr_multiplier: f64) -> f64 {
    atr * atr_multiplier
}

/// Size a long entry whose stop sits `atr * atr_multiplier` below `entry_price`.
pub fn position_size_by_atr(
    entry_price: f64,
    atr: f64,
    atr_multiplier: f64,
    pip_value_per_unit: f64,
    params: &RiskParams,
    units_cap: Option<u64>,
) -> u64 {
    let distance = stop_distance_from_atr(atr, atr_multiplier);
    position_size_by_risk(
        entry_price,
        entry_price - distance,
        pip_value_per_unit,
        params,
        units_cap,
    )
}
