//! Signal engine: joins crossover signals and ATR stops into one record per bar.
//!
//! Both halves are computed from the same bar slice, so rows line up
//! index-for-index and the join never drops anything. The engine never fails
//! for lack of data: short histories surface as NaN in [`SignalRow`] and as
//! `None` in [`LastSignal`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::crossover::{MaCrossover, SignalDirection};
use super::stops::AtrStops;
use crate::domain::Bar;
use crate::error::EngineError;
use crate::params::StrategyParams;

/// Full per-bar record. NaN marks values still in warm-up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub fast_ma: f64,
    pub slow_ma: f64,
    pub signal: SignalDirection,
    pub long_stop: f64,
    pub short_stop: f64,
    pub atr: f64,
}

/// Most recent signal, with warm-up NaNs surfaced as `None`.
///
/// This is the shape consumed by the risk sizer and the order layer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LastSignal {
    pub signal: SignalDirection,
    pub long_stop: Option<f64>,
    pub short_stop: Option<f64>,
    pub atr: Option<f64>,
}

impl LastSignal {
    /// Stop matching the signal's direction: long stop for +1, short stop for -1.
    pub fn stop_for_signal(&self) -> Option<f64> {
        match self.signal {
            SignalDirection::Long => self.long_stop,
            SignalDirection::Short => self.short_stop,
            SignalDirection::Flat => None,
        }
    }
}

impl From<&SignalRow> for LastSignal {
    fn from(row: &SignalRow) -> Self {
        Self {
            signal: row.signal,
            long_stop: defined(row.long_stop),
            short_stop: defined(row.short_stop),
            atr: defined(row.atr),
        }
    }
}

fn defined(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// SMA crossover + ATR stop engine for one instrument stream.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    params: StrategyParams,
    crossover: MaCrossover,
    stops: AtrStops,
}

impl SignalEngine {
    pub fn new(params: StrategyParams) -> Result<Self, EngineError> {
        params.validate()?;
        for warning in params.warnings() {
            warn!(%warning, "signal engine misconfiguration");
        }
        Ok(Self {
            crossover: MaCrossover::new(params.fast, params.slow)?,
            stops: AtrStops::new(params.atr_window, params.atr_mult)?,
            params,
        })
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    /// Bars needed before every column of the latest row is defined.
    pub fn min_history(&self) -> usize {
        self.params.min_history()
    }

    pub fn get_signals(&self, bars: &[Bar]) -> Vec<SignalRow> {
        let crosses = self.crossover.generate(bars);
        let stops = self.stops.compute(bars);

        bars.iter()
            .zip(crosses)
            .zip(stops)
            .map(|((bar, cross), stop)| SignalRow {
                timestamp: bar.timestamp,
                close: bar.close,
                fast_ma: cross.fast_ma,
                slow_ma: cross.slow_ma,
                signal: cross.signal,
                long_stop: stop.long_stop,
                short_stop: stop.short_stop,
                atr: stop.atr,
            })
            .collect()
    }

    /// Latest row of [`Self::get_signals`]; all-absent and flat for empty input.
    pub fn get_last_signal(&self, bars: &[Bar]) -> LastSignal {
        self.get_signals(bars)
            .last()
            .map(LastSignal::from)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn engine(fast: usize, slow: usize, atr_window: usize) -> SignalEngine {
        SignalEngine::new(StrategyParams::new(fast, slow, atr_window, 2.0)).unwrap()
    }

    #[test]
    fn empty_history_gives_absent_record() {
        let last = engine(2, 3, 2).get_last_signal(&[]);
        assert_eq!(last, LastSignal::default());
        assert_eq!(last.signal, SignalDirection::Flat);
        assert!(last.long_stop.is_none() && last.short_stop.is_none() && last.atr.is_none());
    }

    #[test]
    fn warmup_surfaces_as_none() {
        let bars = make_bars(&[1.0, 2.0]);
        let last = engine(2, 3, 5).get_last_signal(&bars);
        assert_eq!(last.signal, SignalDirection::Flat);
        assert!(last.atr.is_none());
    }

    #[test]
    fn rows_align_with_bars() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
        let rows = engine(2, 3, 3).get_signals(&bars);
        assert_eq!(rows.len(), bars.len());
        for (row, bar) in rows.iter().zip(&bars) {
            assert_eq!(row.timestamp, bar.timestamp);
            assert_eq!(row.close, bar.close);
        }
        assert_eq!(rows[6].signal, SignalDirection::Short);
    }

    #[test]
    fn last_signal_reports_death_cross_with_stops() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0]);
        let last = engine(2, 3, 3).get_last_signal(&bars);
        assert_eq!(last.signal, SignalDirection::Short);
        let atr = last.atr.unwrap();
        // make_bars: every bar spans |close - prev_close| + 2 → TR = 3 on the last three.
        assert!((atr - 3.0).abs() < 1e-10);
        assert!((last.short_stop.unwrap() - 9.0).abs() < 1e-10);
        assert!((last.long_stop.unwrap() + 3.0).abs() < 1e-10);
        assert_eq!(last.stop_for_signal(), last.short_stop);
    }

    #[test]
    fn invalid_params_rejected() {
        assert!(SignalEngine::new(StrategyParams::new(2, 3, 0, 2.0)).is_err());
        assert!(SignalEngine::new(StrategyParams::new(2, 3, 3, 0.0)).is_err());
    }

    #[test]
    fn last_signal_json_uses_null_for_missing() {
        let json = serde_json::to_string(&LastSignal::default()).unwrap();
        assert_eq!(
            json,
            r#"{"signal":0,"long_stop":null,"short_stop":null,"atr":null}"#
        );
    }
}
