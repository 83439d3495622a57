//! Bar-by-bar backtest of the SMA crossover / ATR stop strategy.
//!
//! Signals are read on each bar's close and acted on at the next bar's open,
//! so a decision never sees the bar it trades on. Stops are checked against
//! each bar's range; a bar that opens through the stop fills at the open.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use tradepulse_core::domain::{Bar, BarError, InstrumentTable, OrderSide};
use tradepulse_core::risk::{position_size_by_risk, RiskParams};
use tradepulse_core::signals::{SignalDirection, SignalEngine};
use tradepulse_core::StrategyParams;

use crate::config::{ConfigError, RunId, TradingConfig};
use crate::data_loader::dataset_hash;
use crate::metrics::{periods_per_year, PerformanceMetrics};

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("{symbol}: need at least {need} bars, got {have}")]
    InsufficientData {
        symbol: String,
        have: usize,
        need: usize,
    },

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("bad bar series: {0}")]
    Bars(#[from] BarError),
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Stop,
    Signal,
    EndOfData,
}

/// A completed round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub side: OrderSide,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub units: u64,
    pub stop_price: f64,
    pub exit_reason: ExitReason,
    pub gross_pnl: f64,
    /// Entry plus exit commission.
    pub commission: f64,
    pub net_pnl: f64,
    pub bars_held: usize,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }
}

/// Equity marked to market at a bar's close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

/// Complete result of a single-instrument backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub schema_version: u32,
    pub symbol: String,
    pub run_id: RunId,
    pub dataset_hash: String,
    pub params: StrategyParams,
    pub initial_capital: f64,
    pub bar_count: usize,
    pub signal_count: usize,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: PerformanceMetrics,
}

impl BacktestResult {
    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map_or(self.initial_capital, |p| p.equity)
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenPosition {
    side: OrderSide,
    entry_index: usize,
    entry_time: DateTime<Utc>,
    entry_price: f64,
    units: u64,
    stop: f64,
    entry_commission: f64,
}

impl OpenPosition {
    fn direction(&self) -> f64 {
        match self.side {
            OrderSide::Buy => 1.0,
            OrderSide::Sell => -1.0,
        }
    }

    fn signal(&self) -> SignalDirection {
        match self.side {
            OrderSide::Buy => SignalDirection::Long,
            OrderSide::Sell => SignalDirection::Short,
        }
    }

    /// Fill price if `bar` touches the stop.
    fn stop_fill(&self, bar: &Bar) -> Option<f64> {
        match self.side {
            OrderSide::Buy if bar.low <= self.stop => Some(bar.open.min(self.stop)),
            OrderSide::Sell if bar.high >= self.stop => Some(bar.open.max(self.stop)),
            _ => None,
        }
    }
}

/// Order scheduled on a close, filled at the next open.
#[derive(Debug, Clone, Copy)]
enum Pending {
    Enter { side: OrderSide, stop: f64 },
    Exit,
}

/// Reusable backtest harness for one configuration.
#[derive(Debug, Clone)]
pub struct Backtester {
    config: TradingConfig,
    engine: SignalEngine,
    instruments: InstrumentTable,
}

impl Backtester {
    pub fn new(config: TradingConfig) -> Result<Self, BacktestError> {
        config.validate()?;
        let engine = SignalEngine::new(config.strategy).map_err(ConfigError::from)?;
        Ok(Self {
            config,
            engine,
            instruments: InstrumentTable::new(),
        })
    }

    /// Use explicit pip values instead of the symbol heuristic.
    pub fn with_instruments(mut self, instruments: InstrumentTable) -> Self {
        self.instruments = instruments;
        self
    }

    pub fn config(&self) -> &TradingConfig {
        &self.config
    }

    /// Simulate the strategy over `bars`, which must be strictly time-ordered.
    pub fn run(&self, symbol: &str, bars: &[Bar]) -> Result<BacktestResult, BacktestError> {
        let need = self.engine.min_history() + 1;
        if bars.len() < need {
            return Err(BacktestError::InsufficientData {
                symbol: symbol.to_string(),
                have: bars.len(),
                need,
            });
        }
        for w in bars.windows(2) {
            if w[1].timestamp <= w[0].timestamp {
                return Err(BarError::NonIncreasingTimestamp {
                    previous: w[0].timestamp,
                    next: w[1].timestamp,
                }
                .into());
            }
        }

        let instrument = self.instruments.resolve(symbol);
        let pip_value = instrument.pip_value_per_unit;
        debug!(symbol, asset_class = ?instrument.asset_class, pip_value, "instrument resolved");
        let commission_rate = self.config.backtest.commission;
        let rows = self.engine.get_signals(bars);
        let signal_count = rows.iter().filter(|r| !r.signal.is_flat()).count();

        let mut cash = self.config.backtest.initial_capital;
        let mut position: Option<OpenPosition> = None;
        let mut pending: Option<Pending> = None;
        let mut trades = Vec::new();
        let mut equity_curve = Vec::with_capacity(bars.len());

        let close_out = |pos: OpenPosition, price: f64, bar: &Bar, i: usize, reason: ExitReason| {
            let gross = pos.direction() * (price - pos.entry_price) * pos.units as f64 * pip_value;
            let exit_commission = commission_rate * price * pos.units as f64 * pip_value;
            let commission = pos.entry_commission + exit_commission;
            let trade = Trade {
                symbol: symbol.to_string(),
                side: pos.side,
                entry_time: pos.entry_time,
                entry_price: pos.entry_price,
                exit_time: bar.timestamp,
                exit_price: price,
                units: pos.units,
                stop_price: pos.stop,
                exit_reason: reason,
                gross_pnl: gross,
                commission,
                net_pnl: gross - commission,
                bars_held: i - pos.entry_index,
            };
            debug!(symbol, ?reason, net_pnl = trade.net_pnl, "position closed");
            (trade, gross - exit_commission)
        };

        for (i, bar) in bars.iter().enumerate() {
            match pending.take() {
                Some(Pending::Exit) => {
                    if let Some(pos) = position.take() {
                        let (trade, cash_delta) = close_out(pos, bar.open, bar, i, ExitReason::Signal);
                        cash += cash_delta;
                        trades.push(trade);
                    }
                }
                Some(Pending::Enter { side, stop }) if position.is_none() => {
                    let entry = bar.open;
                    let stop_is_protective = match side {
                        OrderSide::Buy => entry > stop,
                        OrderSide::Sell => entry < stop,
                    };
                    if stop_is_protective {
                        let risk = RiskParams {
                            equity: cash,
                            risk_per_trade: self.config.risk.risk_per_trade,
                            max_position_size: self.config.risk.max_position_size,
                        };
                        let units = position_size_by_risk(
                            entry,
                            stop,
                            pip_value,
                            &risk,
                            self.config.risk.units_cap,
                        );
                        if units > 0 {
                            let entry_commission =
                                commission_rate * entry * units as f64 * pip_value;
                            cash -= entry_commission;
                            position = Some(OpenPosition {
                                side,
                                entry_index: i,
                                entry_time: bar.timestamp,
                                entry_price: entry,
                                units,
                                stop,
                                entry_commission,
                            });
                        }
                    } else {
                        debug!(symbol, %side, entry, stop, "entry skipped: open already through stop");
                    }
                }
                _ => {}
            }

            if let Some(pos) = position {
                if let Some(fill) = pos.stop_fill(bar) {
                    position = None;
                    let (trade, cash_delta) = close_out(pos, fill, bar, i, ExitReason::Stop);
                    cash += cash_delta;
                    trades.push(trade);
                }
            }

            let row = &rows[i];
            match position {
                None => {
                    let side = match row.signal {
                        SignalDirection::Long => Some((OrderSide::Buy, row.long_stop)),
                        SignalDirection::Short => Some((OrderSide::Sell, row.short_stop)),
                        SignalDirection::Flat => None,
                    };
                    if let Some((side, stop)) = side {
                        if stop.is_finite() {
                            pending = Some(Pending::Enter { side, stop });
                        }
                    }
                }
                Some(pos) if row.signal == pos.signal().opposite() => {
                    pending = Some(Pending::Exit);
                }
                Some(_) => {}
            }

            let unrealized = position.map_or(0.0, |pos| {
                pos.direction() * (bar.close - pos.entry_price) * pos.units as f64 * pip_value
            });
            equity_curve.push(EquityPoint {
                timestamp: bar.timestamp,
                equity: cash + unrealized,
            });
        }

        if let (Some(pos), Some(last)) = (position.take(), bars.last()) {
            let (trade, cash_delta) =
                close_out(pos, last.close, last, bars.len() - 1, ExitReason::EndOfData);
            cash += cash_delta;
            trades.push(trade);
            if let Some(point) = equity_curve.last_mut() {
                point.equity = cash;
            }
        }

        let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        let metrics =
            PerformanceMetrics::compute(&equity, &trades, periods_per_year(self.config.granularity));

        info!(
            symbol,
            bars = bars.len(),
            trades = trades.len(),
            total_return = metrics.total_return,
            "backtest complete"
        );

        Ok(BacktestResult {
            schema_version: SCHEMA_VERSION,
            symbol: symbol.to_string(),
            run_id: self.config.run_id(),
            dataset_hash: dataset_hash(bars),
            params: self.config.strategy,
            initial_capital: self.config.backtest.initial_capital,
            bar_count: bars.len(),
            signal_count,
            trades,
            equity_curve,
            metrics,
        })
    }
}

/// Backtest one instrument with the heuristic pip table.
pub fn run_backtest(
    symbol: &str,
    bars: &[Bar],
    config: &TradingConfig,
) -> Result<BacktestResult, BacktestError> {
    Backtester::new(config.clone())?.run(symbol, bars)
}

/// Backtest independent instruments in parallel, preserving input order.
pub fn run_portfolio(
    backtester: &Backtester,
    series: &[(String, Vec<Bar>)],
) -> Vec<(String, Result<BacktestResult, BacktestError>)> {
    series
        .par_iter()
        .map(|(symbol, bars)| (symbol.clone(), backtester.run(symbol, bars)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tradepulse_core::domain::{AssetClass, InstrumentSpec};

    fn config(atr_mult: f64, commission: f64) -> TradingConfig {
        let mut config = TradingConfig::default();
        config.strategy = StrategyParams::new(2, 3, 2, atr_mult);
        config.backtest.commission = commission;
        config
    }

    /// Open at the previous close, half a point of wick either side.
    fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let o = if i == 0 { c } else { closes[i - 1] };
                Bar::new(
                    t0 + Duration::days(i as i64),
                    o,
                    o.max(c) + 0.5,
                    o.min(c) - 0.5,
                    c,
                )
            })
            .collect()
    }

    #[test]
    fn golden_cross_enters_next_open_and_exits_on_death_cross() {
        let bars = bars_from_closes(&[
            5.0, 4.0, 3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 6.0, 5.0, 4.0, 3.0,
        ]);
        let result = run_backtest("TEST", &bars, &config(2.0, 0.0)).unwrap();

        assert_eq!(result.trades.len(), 1);
        let t = &result.trades[0];
        assert_eq!(t.side, OrderSide::Buy);
        assert_eq!(t.entry_time, bars[7].timestamp);
        assert_eq!(t.entry_price, 3.0);
        // ATR 2, stop 3 - 2*2; risk 50 / distance 4 floors to 12 units
        assert_eq!(t.stop_price, -1.0);
        assert_eq!(t.units, 12);
        assert_eq!(t.exit_reason, ExitReason::Signal);
        assert_eq!(t.exit_time, bars[13].timestamp);
        assert_eq!(t.exit_price, 5.0);
        assert_eq!(t.net_pnl, 24.0);
        assert_eq!(t.bars_held, 6);

        assert_eq!(result.equity_curve.len(), bars.len());
        assert_eq!(result.final_equity(), 10_024.0);
        assert_eq!(result.signal_count, 2);
        assert_eq!(result.metrics.trade_count, 1);
        assert_eq!(result.metrics.win_rate, 1.0);
    }

    #[test]
    fn stop_out_loses_exactly_the_risk_budget() {
        let bars = bars_from_closes(&[5.0, 4.0, 3.0, 2.0, 1.0, 2.0, 3.0, 1.0]);
        let result = run_backtest("TEST", &bars, &config(0.5, 0.0)).unwrap();

        let t = &result.trades[0];
        assert_eq!(t.stop_price, 2.0);
        assert_eq!(t.units, 50);
        assert_eq!(t.exit_reason, ExitReason::Stop);
        assert_eq!(t.exit_price, 2.0);
        assert_eq!(t.net_pnl, -50.0);
        assert_eq!(t.bars_held, 0);
        assert_eq!(result.final_equity(), 9_950.0);
    }

    #[test]
    fn gap_through_stop_fills_at_open() {
        let mut bars = bars_from_closes(&[5.0, 4.0, 3.0, 2.0, 1.0, 2.0, 3.0, 3.5]);
        let t = bars[7].timestamp + Duration::days(1);
        bars.push(Bar::new(t, 1.5, 1.8, 1.0, 1.2));

        let result = run_backtest("TEST", &bars, &config(0.5, 0.0)).unwrap();
        let trade = &result.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::Stop);
        assert_eq!(trade.exit_price, 1.5);
        assert_eq!(trade.net_pnl, -75.0);
    }

    #[test]
    fn open_position_closed_at_last_close() {
        let bars = bars_from_closes(&[5.0, 4.0, 3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let result = run_backtest("TEST", &bars, &config(2.0, 0.0)).unwrap();
        let t = &result.trades[0];
        assert_eq!(t.exit_reason, ExitReason::EndOfData);
        assert_eq!(t.exit_price, 5.0);
        assert_eq!(t.net_pnl, 24.0);
        assert_eq!(result.final_equity(), 10_024.0);
    }

    #[test]
    fn death_cross_opens_short() {
        let bars = bars_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
        let result = run_backtest("TEST", &bars, &config(2.0, 0.0)).unwrap();
        let t = &result.trades[0];
        assert_eq!(t.side, OrderSide::Sell);
        assert_eq!(t.stop_price, 7.0);
        assert_eq!(t.units, 12);
        assert_eq!(t.net_pnl, 24.0);
    }

    #[test]
    fn commission_charged_on_both_fills() {
        let bars = bars_from_closes(&[5.0, 4.0, 3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let result = run_backtest("TEST", &bars, &config(2.0, 0.001)).unwrap();
        let t = &result.trades[0];
        let expected = 0.001 * 3.0 * 12.0 + 0.001 * 5.0 * 12.0;
        assert!((t.commission - expected).abs() < 1e-12);
        assert!((t.net_pnl - (24.0 - expected)).abs() < 1e-12);
        assert!((result.final_equity() - (10_000.0 + t.net_pnl)).abs() < 1e-9);
    }

    #[test]
    fn instrument_table_scales_pnl() {
        let bars = bars_from_closes(&[5.0, 4.0, 3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let table: InstrumentTable = [InstrumentSpec::new("TEST", 2.0, AssetClass::Equity)]
            .into_iter()
            .collect();
        let result = Backtester::new(config(2.0, 0.0))
            .unwrap()
            .with_instruments(table)
            .run("TEST", &bars)
            .unwrap();
        let t = &result.trades[0];
        // 50 / (4 * 2) floors to 6 units; each unit moves 2 per point
        assert_eq!(t.units, 6);
        assert_eq!(t.net_pnl, 24.0);
    }

    #[test]
    fn flat_market_never_trades() {
        let bars = bars_from_closes(&[10.0; 30]);
        let result = run_backtest("TEST", &bars, &config(2.0, 0.0)).unwrap();
        assert!(result.trades.is_empty());
        assert!(result.equity_curve.iter().all(|p| p.equity == 10_000.0));
        assert_eq!(result.metrics.total_return, 0.0);
    }

    #[test]
    fn rejects_short_and_unordered_series() {
        let cfg = config(2.0, 0.0);
        let bars = bars_from_closes(&[1.0, 2.0, 3.0]);
        assert!(matches!(
            run_backtest("TEST", &bars, &cfg),
            Err(BacktestError::InsufficientData { have: 3, need: 4, .. })
        ));

        let mut bars = bars_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        bars[3].timestamp = bars[2].timestamp;
        assert!(matches!(
            run_backtest("TEST", &bars, &cfg),
            Err(BacktestError::Bars(BarError::NonIncreasingTimestamp { .. }))
        ));
    }

    #[test]
    fn invalid_config_rejected() {
        let mut cfg = config(2.0, 0.0);
        cfg.risk.risk_per_trade = 0.0;
        assert!(matches!(Backtester::new(cfg), Err(BacktestError::Config(_))));
    }

    #[test]
    fn portfolio_matches_sequential_runs() {
        let backtester = Backtester::new(config(2.0, 0.0)).unwrap();
        let series = vec![
            ("A".to_string(), bars_from_closes(&[5.0, 4.0, 3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 5.0])),
            ("B".to_string(), bars_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0, 2.0, 1.0])),
            ("C".to_string(), bars_from_closes(&[1.0, 2.0])),
        ];
        let results = run_portfolio(&backtester, &series);

        assert_eq!(results.len(), 3);
        for ((symbol, result), (expected_symbol, bars)) in results.iter().zip(&series) {
            assert_eq!(symbol, expected_symbol);
            match backtester.run(symbol, bars) {
                Ok(sequential) => {
                    let parallel = result.as_ref().unwrap();
                    assert_eq!(parallel.trades, sequential.trades);
                    assert_eq!(parallel.equity_curve, sequential.equity_curve);
                }
                Err(_) => assert!(result.is_err()),
            }
        }
    }
}
