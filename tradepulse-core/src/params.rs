//! Strategy parameters: the immutable configuration of one signal engine.
//!
//! Each engine instance owns its own copy; nothing is shared or reassigned
//! between runs. `fingerprint()` gives a stable identity for caching and
//! artifact naming.

use serde::{Deserialize, Serialize};

use crate::error::{check_window, ConfigWarning, EngineError};
use crate::signals::stops::check_multiplier;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    pub fast: usize,
    pub slow: usize,
    pub atr_window: usize,
    pub atr_mult: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            fast: 20,
            slow: 50,
            atr_window: 14,
            atr_mult: 2.0,
        }
    }
}

impl StrategyParams {
    pub fn new(fast: usize, slow: usize, atr_window: usize, atr_mult: f64) -> Self {
        Self {
            fast,
            slow,
            atr_window,
            atr_mult,
        }
    }

    /// Hard errors only; `fast >= slow` is reported by [`Self::warnings`].
    pub fn validate(&self) -> Result<(), EngineError> {
        check_window("fast", self.fast)?;
        check_window("slow", self.slow)?;
        check_window("atr", self.atr_window)?;
        check_multiplier(self.atr_mult)
    }

    pub fn warnings(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if self.fast >= self.slow {
            warnings.push(ConfigWarning::FastNotBelowSlow {
                fast: self.fast,
                slow: self.slow,
            });
        }
        warnings
    }

    /// Bars of history needed for every column to be defined.
    pub fn min_history(&self) -> usize {
        self.fast.max(self.slow).max(self.atr_window)
    }

    /// BLAKE3 hex digest over the canonical parameter text.
    pub fn fingerprint(&self) -> String {
        let canonical = format!(
            "fast={};slow={};atr_window={};atr_mult={:?}",
            self.fast, self.slow, self.atr_window, self.atr_mult
        );
        blake3::hash(canonical.as_bytes()).to_hex().to_string()
    }
}
