//! Bar and tick loading for the runner.
//!
//! Sources:
//! - CSV bar files: `timestamp,open,high,low,close[,volume]`
//! - CSV tick files: `timestamp,bid,ask` or `timestamp,price`
//! - Synthetic random-walk bars, seeded from the symbol so every run of the
//!   same symbol sees the same series
//!
//! Timestamps may be RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC), a bare date, or
//! integer epoch seconds. Synthetic data is a developer aid; results computed
//! on it are tagged by the caller.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tradepulse_core::aggregator::Granularity;
use tradepulse_core::domain::{Bar, BarError, BarSeries, Quote};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: unrecognised timestamp '{value}'")]
    InvalidTimestamp { row: usize, value: String },

    #[error("row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    #[error("bars out of order: {0}")]
    Bars(#[from] BarError),

    #[error("no rows in input")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct BarRecord {
    #[serde(alias = "Timestamp", alias = "time", alias = "date", alias = "Date", alias = "Datetime")]
    timestamp: String,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(default, alias = "Volume")]
    volume: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TickRecord {
    #[serde(alias = "Timestamp", alias = "time")]
    timestamp: String,
    #[serde(default)]
    bid: Option<f64>,
    #[serde(default)]
    ask: Option<f64>,
    #[serde(default)]
    price: Option<f64>,
}

fn open(path: &Path) -> Result<std::fs::File, LoadError> {
    std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Load a bar CSV file into a validated, strictly increasing series.
pub fn load_bars_csv(path: &Path) -> Result<BarSeries, LoadError> {
    read_bars(open(path)?)
}

pub fn read_bars<R: Read>(reader: R) -> Result<BarSeries, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    for (i, record) in rdr.deserialize::<BarRecord>().enumerate() {
        let row = i + 1;
        let record = record?;
        let mut bar = Bar::new(
            parse_timestamp(&record.timestamp, row)?,
            record.open,
            record.high,
            record.low,
            record.close,
        );
        bar.volume = record.volume;
        if !bar.is_sane() {
            return Err(LoadError::InvalidRow {
                row,
                reason: "high/low do not bracket open/close".into(),
            });
        }
        bars.push(bar);
    }
    if bars.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(BarSeries::from_bars(bars)?)
}

/// Load a tick CSV file as quotes, in file order.
pub fn load_ticks_csv(path: &Path) -> Result<Vec<Quote>, LoadError> {
    read_ticks(open(path)?)
}

pub fn read_ticks<R: Read>(reader: R) -> Result<Vec<Quote>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut quotes = Vec::new();
    for (i, record) in rdr.deserialize::<TickRecord>().enumerate() {
        let row = i + 1;
        let record = record?;
        let ts = parse_timestamp(&record.timestamp, row)?;
        let quote = match (record.bid, record.ask, record.price) {
            (Some(bid), Some(ask), _) => Quote::new(ts, bid, ask),
            (_, _, Some(price)) => Quote::last_price(ts, price),
            _ => {
                return Err(LoadError::InvalidRow {
                    row,
                    reason: "need bid and ask, or price".into(),
                })
            }
        };
        quotes.push(quote);
    }
    if quotes.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(quotes)
}

fn parse_timestamp(raw: &str, row: usize) -> Result<DateTime<Utc>, LoadError> {
    let s = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)));
    }
    if let Ok(secs) = s.parse::<i64>() {
        if let Some(ts) = DateTime::from_timestamp(secs, 0) {
            return Ok(ts);
        }
    }
    Err(LoadError::InvalidTimestamp {
        row,
        value: raw.to_string(),
    })
}

/// Compute a deterministic BLAKE3 hash over a bar series.
///
/// Covers timestamps and OHLC values so any edit to the data changes the hash.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.timestamp.timestamp().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        if let Some(volume) = bar.volume {
            hasher.update(&volume.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// Generate synthetic bars for testing/development.
///
/// A multiplicative random walk from 100.0, one bar per `granularity` step
/// starting at `start`. Same symbol, same bars.
pub fn generate_synthetic_bars(
    symbol: &str,
    start: DateTime<Utc>,
    count: usize,
    granularity: Granularity,
) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    // Deterministic seed from symbol name
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let step = granularity.as_duration();
    let mut ts = granularity.bucket_start(start);
    let mut price = 100.0_f64;
    let mut bars = Vec::with_capacity(count);

    for _ in 0..count {
        let ret: f64 = rng.gen_range(-0.01..0.01);
        let open = price;
        let close = price * (1.0 + ret);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.004));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.004));
        let mut bar = Bar::new(ts, open, high, low, close);
        bar.volume = Some(rng.gen_range(1_000.0..50_000.0_f64).round());
        bars.push(bar);

        price = close;
        ts += step;
    }
    bars
}
