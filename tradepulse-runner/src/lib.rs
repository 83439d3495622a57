//! TradePulse Runner: configuration, data loading, live loop, backtests, artifacts.
//!
//! This crate builds on `tradepulse-core` to provide:
//! - TOML configuration with environment-style overrides
//! - CSV bar/tick loading and deterministic synthetic data
//! - The live trading loop over pluggable price sources and execution venues
//! - A bar-by-bar backtest harness with performance metrics
//! - Parallel multi-instrument backtests and artifact export

pub mod backtest;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod feed;
pub mod live;
pub mod metrics;
pub mod venue;

pub use backtest::{
    run_backtest, run_portfolio, BacktestError, BacktestResult, Backtester, EquityPoint,
    ExitReason, Trade,
};
pub use config::{BacktestConfig, ConfigError, LiveConfig, RiskConfig, TradingConfig};
pub use data_loader::{
    generate_synthetic_bars, load_bars_csv, load_ticks_csv, LoadError,
};
pub use export::{save_artifacts, ArtifactPaths, RunManifest};
pub use feed::{FeedError, PriceSource, ReplayFeed};
pub use live::{LiveError, LiveSummary, LiveTrader, Pacing, StepOutcome};
pub use metrics::PerformanceMetrics;
pub use venue::{ExecutionVenue, PaperVenue, PlacedOrder, VenueError};
