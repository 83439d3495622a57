//! Daily drawdown circuit breaker.
//!
//! The first equity reading on a UTC date becomes that day's baseline. Once
//! equity falls `max_daily_drawdown` below it, new entries halt until the
//! date changes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one drawdown check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownStatus {
    /// Fractional loss from the day's starting equity (negative when up).
    pub drawdown: f64,
    pub halted: bool,
    /// True only on the check that tripped the halt.
    pub newly_halted: bool,
}

#[derive(Debug, Clone)]
pub struct DailyDrawdownGuard {
    max_daily_drawdown: f64,
    day: Option<NaiveDate>,
    start_equity: f64,
    halted: bool,
}

impl DailyDrawdownGuard {
    pub fn new(max_daily_drawdown: f64) -> Self {
        Self {
            max_daily_drawdown,
            day: None,
            start_equity: 0.0,
            halted: false,
        }
    }

    pub fn max_daily_drawdown(&self) -> f64 {
        self.max_daily_drawdown
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn start_equity(&self) -> Option<f64> {
        self.day.map(|_| self.start_equity)
    }

    /// Record an equity reading taken at `now`.
    pub fn check(&mut self, equity: f64, now: DateTime<Utc>) -> DrawdownStatus {
        let today = now.date_naive();
        if self.day != Some(today) {
            self.day = Some(today);
            self.start_equity = equity;
            self.halted = false;
            return DrawdownStatus {
                drawdown: 0.0,
                halted: false,
                newly_halted: false,
            };
        }

        let drawdown = if self.start_equity > 0.0 {
            (self.start_equity - equity) / self.start_equity
        } else {
            0.0
        };

        let mut newly_halted = false;
        if drawdown >= self.max_daily_drawdown && !self.halted {
            self.halted = true;
            newly_halted = true;
        }

        DrawdownStatus {
            drawdown,
            halted: self.halted,
            newly_halted,
        }
    }
}
