//! Serializable trading configuration.
//!
//! One TOML document drives both the live loop and the backtest harness.
//! Every field has a default, so a file only needs the values it changes.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tradepulse_core::aggregator::Granularity;
use tradepulse_core::params::StrategyParams;
use tradepulse_core::EngineError;

/// Unique identifier for a configuration (content-addressable hash).
pub type RunId = String;

/// Prefix for environment-style overrides.
pub const OVERRIDE_PREFIX: &str = "TRADEPULSE_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{field} out of range: {value} ({expected})")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("invalid override {key}={value}")]
    InvalidOverride { key: String, value: String },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TradingConfig {
    pub instrument: String,
    pub granularity: Granularity,
    pub strategy: StrategyParams,
    pub risk: RiskConfig,
    pub live: LiveConfig,
    pub backtest: BacktestConfig,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            instrument: "EUR_USD".to_string(),
            granularity: Granularity::default(),
            strategy: StrategyParams::default(),
            risk: RiskConfig::default(),
            live: LiveConfig::default(),
            backtest: BacktestConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskConfig {
    /// Fraction of equity risked per trade, in (0, 1].
    pub risk_per_trade: f64,
    /// Daily loss fraction that halts new entries, in (0, 1).
    pub max_daily_drawdown: f64,
    pub units_cap: Option<u64>,
    pub max_position_size: Option<f64>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_per_trade: 0.005,
            max_daily_drawdown: 0.02,
            units_cap: Some(20_000),
            max_position_size: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LiveConfig {
    /// Closed bars kept in the rolling history.
    pub history_cap: usize,
    /// Closed bars required before signals are evaluated.
    pub min_history: usize,
    /// Quotes with a wider bid/ask spread are skipped.
    pub max_spread: Option<f64>,
    pub poll_interval_ms: u64,
    pub error_backoff_ms: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            history_cap: 400,
            min_history: 60,
            max_spread: Some(0.0001),
            poll_interval_ms: 1_000,
            error_backoff_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Proportional commission charged on each fill's notional.
    pub commission: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            commission: 0.0002,
        }
    }
}

impl TradingConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy.validate()?;

        let risk = &self.risk;
        if risk.risk_per_trade.is_nan() || risk.risk_per_trade <= 0.0 || risk.risk_per_trade > 1.0 {
            return Err(out_of_range("risk_per_trade", risk.risk_per_trade, "(0, 1]"));
        }
        if risk.max_daily_drawdown.is_nan()
            || risk.max_daily_drawdown <= 0.0
            || risk.max_daily_drawdown >= 1.0
        {
            return Err(out_of_range(
                "max_daily_drawdown",
                risk.max_daily_drawdown,
                "(0, 1)",
            ));
        }
        if let Some(max) = risk.max_position_size {
            if max.is_nan() || max <= 0.0 {
                return Err(out_of_range("max_position_size", max, "> 0"));
            }
        }

        let live = &self.live;
        if live.history_cap < live.min_history {
            return Err(out_of_range(
                "history_cap",
                live.history_cap,
                "must be >= min_history",
            ));
        }
        if live.min_history < self.strategy.min_history() {
            return Err(out_of_range(
                "min_history",
                live.min_history,
                "must cover the longest strategy window",
            ));
        }
        if let Some(spread) = live.max_spread {
            if spread.is_nan() || spread < 0.0 {
                return Err(out_of_range("max_spread", spread, ">= 0"));
            }
        }

        let bt = &self.backtest;
        if bt.initial_capital.is_nan() || bt.initial_capital <= 0.0 {
            return Err(out_of_range("initial_capital", bt.initial_capital, "> 0"));
        }
        if !(0.0..1.0).contains(&bt.commission) {
            return Err(out_of_range("commission", bt.commission, "[0, 1)"));
        }
        Ok(())
    }

    /// Apply `TRADEPULSE_*` overrides looked up through `lookup`, then revalidate.
    ///
    /// `lookup` is usually `|k| std::env::var(k).ok()`; tests pass a map.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            let key = format!("{OVERRIDE_PREFIX}{name}");
            lookup(&key).map(|value| (key, value))
        };

        if let Some((_, v)) = get("INSTRUMENT") {
            self.instrument = v;
        }
        if let Some((k, v)) = get("GRANULARITY") {
            self.granularity = v.parse().map_err(|_| invalid(&k, &v))?;
        }
        if let Some((k, v)) = get("RISK_PER_TRADE") {
            self.risk.risk_per_trade = parse(&k, &v)?;
        }
        if let Some((k, v)) = get("MAX_DAILY_DRAWDOWN") {
            self.risk.max_daily_drawdown = parse(&k, &v)?;
        }
        if let Some((k, v)) = get("UNITS_CAP") {
            self.risk.units_cap = Some(parse(&k, &v)?);
        }
        if let Some((k, v)) = get("FAST_SMA") {
            self.strategy.fast = parse(&k, &v)?;
        }
        if let Some((k, v)) = get("SLOW_SMA") {
            self.strategy.slow = parse(&k, &v)?;
        }
        if let Some((k, v)) = get("ATR_WINDOW") {
            self.strategy.atr_window = parse(&k, &v)?;
        }
        if let Some((k, v)) = get("ATR_MULTIPLIER") {
            self.strategy.atr_mult = parse(&k, &v)?;
        }
        self.validate()
    }

    /// Deterministic hash of the full configuration.
    pub fn run_id(&self) -> RunId {
        // Plain structs of numbers and strings; serialization cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

fn out_of_range(field: &'static str, value: impl ToString, expected: &'static str) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        value: value.to_string(),
        expected,
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidOverride {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}
