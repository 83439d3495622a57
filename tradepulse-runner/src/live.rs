//! Live trading loop.
//!
//! One loop serves every venue: quotes come from a [`PriceSource`], orders go
//! to an [`ExecutionVenue`]. Per quote:
//!
//! 1. skip quotes whose spread exceeds `max_spread`
//! 2. feed the mid price to the candle aggregator
//! 3. on a closed bar, append it to the capped rolling history
//! 4. once `min_history` bars exist, refresh the daily drawdown guard and
//!    evaluate the latest signal
//! 5. on a crossover, size against the matching stop and place the order
//!
//! Transient feed and venue failures are logged and retried after the backoff;
//! only a fatal feed error ends the loop early.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use tradepulse_core::aggregator::{AggregatorError, CandleAggregator};
use tradepulse_core::domain::{
    get_pip_value_per_unit, Bar, BarSeries, InstrumentTable, OrderRequest, OrderSide, Quote,
};
use tradepulse_core::risk::{position_size_by_risk, DailyDrawdownGuard, RiskParams};
use tradepulse_core::signals::{SignalDirection, SignalEngine};

use crate::config::{ConfigError, LiveConfig, TradingConfig};
use crate::feed::{FeedError, PriceSource};
use crate::venue::ExecutionVenue;

#[derive(Debug, Error)]
pub enum LiveError {
    #[error("invalid live configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("price feed stopped: {0}")]
    Feed(FeedError),
}

/// Sleep schedule between loop iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub poll_interval: Duration,
    pub error_backoff: Duration,
}

impl Pacing {
    pub fn from_config(live: &LiveConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(live.poll_interval_ms),
            error_backoff: Duration::from_millis(live.error_backoff_ms),
        }
    }

    /// No sleeping at all; for replays and tests.
    pub fn none() -> Self {
        Self {
            poll_interval: Duration::ZERO,
            error_backoff: Duration::ZERO,
        }
    }
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSummary {
    pub quotes_seen: usize,
    pub quotes_skipped: usize,
    pub bars_closed: usize,
    pub signals: usize,
    pub orders_placed: usize,
    pub feed_errors: usize,
    pub venue_errors: usize,
}

/// What one call to [`LiveTrader::step`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The feed has no more quotes.
    Exhausted,
    /// A transient feed failure; the caller should back off.
    Backoff,
    /// The quote was rejected (wide spread, out of order, bad price).
    Skipped,
    /// The quote updated the open candle.
    Accumulated,
    /// A bar closed; carries the order placed on it, if any.
    BarClosed { order: Option<OrderRequest> },
}

pub struct LiveTrader<F, V> {
    config: TradingConfig,
    feed: F,
    venue: V,
    engine: SignalEngine,
    aggregator: CandleAggregator,
    history: BarSeries,
    guard: DailyDrawdownGuard,
    pip_value: f64,
    pacing: Pacing,
    summary: LiveSummary,
}

impl<F: PriceSource, V: ExecutionVenue> LiveTrader<F, V> {
    pub fn new(config: TradingConfig, feed: F, venue: V) -> Result<Self, LiveError> {
        config.validate()?;
        let engine = SignalEngine::new(config.strategy).map_err(ConfigError::from)?;
        Ok(Self {
            aggregator: CandleAggregator::new(config.granularity),
            history: BarSeries::new(),
            guard: DailyDrawdownGuard::new(config.risk.max_daily_drawdown),
            pip_value: get_pip_value_per_unit(&config.instrument),
            pacing: Pacing::from_config(&config.live),
            summary: LiveSummary::default(),
            engine,
            config,
            feed,
            venue,
        })
    }

    /// Take the pip value from `table` instead of the symbol heuristic.
    pub fn with_instruments(mut self, table: &InstrumentTable) -> Self {
        self.pip_value = table.pip_value_per_unit(&self.config.instrument);
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn summary(&self) -> &LiveSummary {
        &self.summary
    }

    pub fn history(&self) -> &BarSeries {
        &self.history
    }

    pub fn venue(&self) -> &V {
        &self.venue
    }

    pub fn venue_mut(&mut self) -> &mut V {
        &mut self.venue
    }

    pub fn is_halted(&self) -> bool {
        self.guard.is_halted()
    }

    /// Drive the loop until the feed is exhausted or fails fatally.
    pub fn run(&mut self) -> Result<LiveSummary, LiveError> {
        info!(
            instrument = %self.config.instrument,
            granularity = %self.config.granularity,
            fast = self.config.strategy.fast,
            slow = self.config.strategy.slow,
            "starting live trading"
        );
        loop {
            match self.step()? {
                StepOutcome::Exhausted => break,
                StepOutcome::Backoff => pause(self.pacing.error_backoff),
                _ => pause(self.pacing.poll_interval),
            }
        }
        info!(summary = ?self.summary, "live trading stopped");
        Ok(self.summary.clone())
    }

    /// Pull and process a single quote.
    pub fn step(&mut self) -> Result<StepOutcome, LiveError> {
        let quote = match self.feed.next_quote() {
            Ok(Some(quote)) => quote,
            Ok(None) => return Ok(StepOutcome::Exhausted),
            Err(e) if e.is_transient() => {
                self.summary.feed_errors += 1;
                warn!(error = %e, "price feed error, backing off");
                return Ok(StepOutcome::Backoff);
            }
            Err(e) => {
                self.summary.feed_errors += 1;
                error!(error = %e, "price feed failed");
                return Err(LiveError::Feed(e));
            }
        };
        self.summary.quotes_seen += 1;

        if let Some(max_spread) = self.config.live.max_spread {
            let spread = quote.spread();
            if spread > max_spread {
                self.summary.quotes_skipped += 1;
                warn!(spread, max_spread, "skipping wide-spread quote");
                return Ok(StepOutcome::Skipped);
            }
        }

        match self.aggregator.update(quote.mid(), quote.timestamp) {
            Ok(None) => Ok(StepOutcome::Accumulated),
            Ok(Some(bar)) => Ok(StepOutcome::BarClosed {
                order: self.on_bar_closed(bar, &quote),
            }),
            Err(e @ AggregatorError::OutOfOrderTick { .. }) => {
                self.summary.quotes_skipped += 1;
                warn!(error = %e, "dropping out-of-order tick");
                Ok(StepOutcome::Skipped)
            }
            Err(e) => {
                self.summary.quotes_skipped += 1;
                debug!(error = %e, "dropping unusable quote");
                Ok(StepOutcome::Skipped)
            }
        }
    }

    fn on_bar_closed(&mut self, bar: Bar, quote: &Quote) -> Option<OrderRequest> {
        self.summary.bars_closed += 1;
        if let Err(e) = self.history.push(bar) {
            warn!(error = %e, "closed bar rejected by history");
            return None;
        }
        self.history.trim_to(self.config.live.history_cap);
        if self.history.len() < self.config.live.min_history {
            debug!(
                have = self.history.len(),
                need = self.config.live.min_history,
                "warming up"
            );
            return None;
        }

        let equity = match self.venue.equity() {
            Ok(equity) => equity,
            Err(e) => {
                self.summary.venue_errors += 1;
                warn!(error = %e, "could not read equity");
                return None;
            }
        };
        let status = self.guard.check(equity, quote.timestamp);
        if status.newly_halted {
            warn!(
                drawdown = status.drawdown,
                "daily drawdown limit hit, halting new entries for today"
            );
        }

        let last = self.engine.get_last_signal(self.history.as_slice());
        let (side, entry, label) = match last.signal {
            SignalDirection::Flat => return None,
            SignalDirection::Long => (OrderSide::Buy, quote.ask, "LONG"),
            SignalDirection::Short => (OrderSide::Sell, quote.bid, "SHORT"),
        };
        self.summary.signals += 1;
        if status.halted {
            debug!(signal = label, "entries halted, ignoring signal");
            return None;
        }

        let stop = last.stop_for_signal()?;
        let stop_side_ok = match side {
            OrderSide::Buy => entry > stop,
            OrderSide::Sell => entry < stop,
        };
        if !stop_side_ok {
            debug!(signal = label, entry, stop, "price already through stop");
            return None;
        }

        let params = RiskParams {
            equity,
            risk_per_trade: self.config.risk.risk_per_trade,
            max_position_size: self.config.risk.max_position_size,
        };
        let units = position_size_by_risk(
            entry,
            stop,
            self.pip_value,
            &params,
            self.config.risk.units_cap,
        );
        if units == 0 {
            debug!(signal = label, entry, stop, "sized to zero");
            return None;
        }

        let order = OrderRequest::new(self.config.instrument.clone(), side, units, Some(stop));
        match self.venue.place_order(&order, quote.timestamp) {
            Ok(id) => {
                self.summary.orders_placed += 1;
                info!(order_id = %id, "{label} {units} units @ {entry} | SL {stop}");
                Some(order)
            }
            Err(e) => {
                self.summary.venue_errors += 1;
                warn!(error = %e, "order placement failed");
                None
            }
        }
    }
}

fn pause(d: Duration) {
    if !d.is_zero() {
        std::thread::sleep(d);
    }
}
