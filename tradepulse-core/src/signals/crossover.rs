//! Moving average crossover signal: golden cross and death cross detection.
//!
//! Long (+1) when the fast SMA crosses above the slow SMA (golden cross).
//! Short (-1) when the fast SMA crosses below the slow SMA (death cross).

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::error::{ConfigWarning, EngineError};
use crate::indicators::{Indicator, Sma};

/// Signal value carried by every row: -1, 0 or +1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum SignalDirection {
    Short,
    #[default]
    Flat,
    Long,
}

impl SignalDirection {
    pub fn as_i8(self) -> i8 {
        match self {
            SignalDirection::Short => -1,
            SignalDirection::Flat => 0,
            SignalDirection::Long => 1,
        }
    }

    pub fn is_flat(self) -> bool {
        self == SignalDirection::Flat
    }

    pub fn opposite(self) -> Self {
        match self {
            SignalDirection::Short => SignalDirection::Long,
            SignalDirection::Flat => SignalDirection::Flat,
            SignalDirection::Long => SignalDirection::Short,
        }
    }
}

impl From<SignalDirection> for i8 {
    fn from(d: SignalDirection) -> i8 {
        d.as_i8()
    }
}

impl TryFrom<i8> for SignalDirection {
    type Error = String;

    fn try_from(v: i8) -> Result<Self, Self::Error> {
        match v {
            -1 => Ok(SignalDirection::Short),
            0 => Ok(SignalDirection::Flat),
            1 => Ok(SignalDirection::Long),
            other => Err(format!("signal must be -1, 0 or 1 (got {other})")),
        }
    }
}

/// Per-bar output of the crossover generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossoverRow {
    pub fast_ma: f64,
    pub slow_ma: f64,
    pub signal: SignalDirection,
}

/// Classify the move from the previous bar's fast/slow relation to the current one.
///
/// Any NaN input yields `Flat`: an undefined average never fabricates a cross.
pub fn detect_cross(fast_cur: f64, slow_cur: f64, fast_prev: f64, slow_prev: f64) -> SignalDirection {
    if fast_cur.is_nan() || slow_cur.is_nan() || fast_prev.is_nan() || slow_prev.is_nan() {
        return SignalDirection::Flat;
    }
    if fast_cur > slow_cur && fast_prev <= slow_prev {
        SignalDirection::Long
    } else if fast_cur < slow_cur && fast_prev >= slow_prev {
        SignalDirection::Short
    } else {
        SignalDirection::Flat
    }
}

/// SMA crossover generator over close prices.
#[derive(Debug, Clone)]
pub struct MaCrossover {
    fast: Sma,
    slow: Sma,
}

impl MaCrossover {
    pub fn new(fast_period: usize, slow_period: usize) -> Result<Self, EngineError> {
        Ok(Self {
            fast: Sma::new(fast_period)?,
            slow: Sma::new(slow_period)?,
        })
    }

    pub fn fast_period(&self) -> usize {
        self.fast.period()
    }

    pub fn slow_period(&self) -> usize {
        self.slow.period()
    }

    /// `fast >= slow` is tolerated but reported.
    pub fn warning(&self) -> Option<ConfigWarning> {
        (self.fast_period() >= self.slow_period()).then_some(ConfigWarning::FastNotBelowSlow {
            fast: self.fast_period(),
            slow: self.slow_period(),
        })
    }

    /// Bars needed before the first cross can possibly fire.
    pub fn warmup_bars(&self) -> usize {
        self.fast_period().max(self.slow_period())
    }

    pub fn generate(&self, bars: &[Bar]) -> Vec<CrossoverRow> {
        let fast = self.fast.compute(bars);
        let slow = self.slow.compute(bars);

        (0..bars.len())
            .map(|i| {
                let signal = if i == 0 {
                    SignalDirection::Flat
                } else {
                    detect_cross(fast[i], slow[i], fast[i - 1], slow[i - 1])
                };
                CrossoverRow {
                    fast_ma: fast[i],
                    slow_ma: slow[i],
                    signal,
                }
            })
            .collect()
    }
}

/// Fast/slow SMAs and the crossover signal for every bar.
pub fn generate_signals(
    bars: &[Bar],
    fast: usize,
    slow: usize,
) -> Result<Vec<CrossoverRow>, EngineError> {
    Ok(MaCrossover::new(fast, slow)?.generate(bars))
}
