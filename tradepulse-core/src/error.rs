//! Engine configuration errors and warnings.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Invalid engine parameters. Raised at construction, never per bar.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("{name} window must be >= 1 (got {window})")]
    InvalidWindow { name: &'static str, window: usize },

    #[error("ATR multiplier must be a finite value > 0 (got {0})")]
    InvalidMultiplier(f64),
}

/// Recognised misconfigurations that keep the math well-defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigWarning {
    /// The "fast" average is not shorter than the "slow" one; crossovers
    /// still compute but the roles are inverted or degenerate.
    FastNotBelowSlow { fast: usize, slow: usize },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::FastNotBelowSlow { fast, slow } => {
                write!(f, "fast window {fast} is not below slow window {slow}")
            }
        }
    }
}

/// Reject a zero-length rolling window.
pub(crate) fn check_window(name: &'static str, window: usize) -> Result<(), EngineError> {
    if window == 0 {
        return Err(EngineError::InvalidWindow { name, window });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_window_rejected() {
        assert_eq!(
            check_window("atr", 0),
            Err(EngineError::InvalidWindow {
                name: "atr",
                window: 0
            })
        );
        assert!(check_window("atr", 1).is_ok());
    }

    #[test]
    fn warning_display() {
        let w = ConfigWarning::FastNotBelowSlow { fast: 50, slow: 20 };
        assert_eq!(w.to_string(), "fast window 50 is not below slow window 20");
    }
}
