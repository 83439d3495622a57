//! TradePulse Core: bars, indicators, crossover signals, ATR stops, risk sizing.
//!
//! This crate holds the pure, deterministic half of the trading system:
//! - Domain types (bars, quotes, order requests, instrument specs)
//! - Rolling indicators (SMA, ATR) with NaN warm-up
//! - SMA crossover signal engine joined with ATR protective stops
//! - Risk-bounded position sizing and the daily drawdown guard
//! - Streaming tick-to-candle aggregation
//!
//! Nothing here touches the network or the clock; the runner crate wires these
//! pieces to feeds and venues.

pub mod aggregator;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod params;
pub mod risk;
pub mod signals;

pub use aggregator::{AggregatorError, CandleAggregator, Granularity};
pub use domain::{Bar, BarError, BarSeries, OrderRequest, OrderSide, Quote};
pub use error::{ConfigWarning, EngineError};
pub use params::StrategyParams;
pub use risk::{position_size_by_risk, DailyDrawdownGuard, RiskParams};
pub use signals::{LastSignal, SignalDirection, SignalEngine, SignalRow};
