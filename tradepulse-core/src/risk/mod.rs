//! Risk management: sizing and loss limits.
//!
//! Everything here is account-aware (equity) but signal-agnostic: the sizer
//! does not care why a stop sits where it does.

pub mod drawdown;
pub mod sizing;

pub use drawdown::{DailyDrawdownGuard, DrawdownStatus};
pub use sizing::{
    position_size_by_atr, position_size_by_risk, stop_distance_from_atr, RiskParams,
};
