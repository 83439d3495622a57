//! Bucket width for candle aggregation.
//!
//! Widths are restricted to values that tile the next larger unit (seconds and
//! minutes dividing 60, hours dividing 24, or a whole day), so flooring a UTC
//! timestamp on the epoch grid lands on the same boundary as truncating the
//! wall clock.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::BarError;

const MINUTE: u32 = 60;
const HOUR: u32 = 60 * MINUTE;
const DAY: u32 = 24 * HOUR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Granularity {
    seconds: u32,
}

impl Granularity {
    pub fn seconds(n: u32) -> Result<Self, BarError> {
        Self::tiled(n, 60, "S", 1)
    }

    pub fn minutes(n: u32) -> Result<Self, BarError> {
        Self::tiled(n, 60, "M", MINUTE)
    }

    pub fn hours(n: u32) -> Result<Self, BarError> {
        Self::tiled(n, 24, "H", HOUR)
    }

    pub fn day() -> Self {
        Self { seconds: DAY }
    }

    fn tiled(n: u32, whole: u32, code: &str, unit: u32) -> Result<Self, BarError> {
        if n == 0 || whole % n != 0 {
            return Err(BarError::InvalidGranularity(format!(
                "{code}{n}: width must divide {whole}"
            )));
        }
        Ok(Self { seconds: n * unit })
    }

    pub fn as_seconds(&self) -> u32 {
        self.seconds
    }

    pub fn as_duration(&self) -> Duration {
        Duration::seconds(i64::from(self.seconds))
    }

    /// Floor `ts` to the start of its bucket.
    pub fn bucket_start(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let rem = ts.timestamp().rem_euclid(i64::from(self.seconds));
        ts - Duration::seconds(rem) - Duration::nanoseconds(i64::from(ts.timestamp_subsec_nanos()))
    }
}

impl Default for Granularity {
    fn default() -> Self {
        Self { seconds: MINUTE }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.seconds;
        if s == DAY {
            write!(f, "D")
        } else if s % HOUR == 0 {
            write!(f, "H{}", s / HOUR)
        } else if s % MINUTE == 0 {
            write!(f, "M{}", s / MINUTE)
        } else {
            write!(f, "S{s}")
        }
    }
}

/// Venue-style codes: `S5`, `M1`, `M15`, `H4`, `D`.
impl FromStr for Granularity {
    type Err = BarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        if code == "D" || code == "D1" {
            return Ok(Self::day());
        }
        let invalid = || BarError::InvalidGranularity(s.to_string());
        let mut chars = code.chars();
        let unit = chars.next().ok_or_else(invalid)?;
        let n: u32 = chars.as_str().parse().map_err(|_| invalid())?;
        match unit {
            'S' => Self::seconds(n),
            'M' => Self::minutes(n),
            'H' => Self::hours(n),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Granularity {
    type Error = BarError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Granularity> for String {
    fn from(g: Granularity) -> String {
        g.to_string()
    }
}
