//! Instrument metadata and pip-value lookup.
//!
//! Sizing needs the monetary value of one minimum price increment per unit.
//! Known instruments are listed explicitly in an [`InstrumentTable`]; anything
//! not listed falls back to [`heuristic_pip_value`], which classifies by
//! ticker shape. The heuristic is an approximation, not a contract-spec source.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equity,
    Forex,
    Crypto,
}

/// Per-instrument sizing metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    pub symbol: String,
    pub pip_value_per_unit: f64,
    pub asset_class: AssetClass,
}

impl InstrumentSpec {
    pub fn new(symbol: impl Into<String>, pip_value_per_unit: f64, asset_class: AssetClass) -> Self {
        Self {
            symbol: symbol.into(),
            pip_value_per_unit,
            asset_class,
        }
    }

    /// Spec guessed from the ticker alone.
    pub fn from_ticker(symbol: &str) -> Self {
        Self::new(symbol, heuristic_pip_value(symbol), classify(symbol))
    }
}

/// Explicit symbol → spec lookup with heuristic fallback.
#[derive(Debug, Clone, Default)]
pub struct InstrumentTable {
    specs: HashMap<String, InstrumentSpec>,
}

impl InstrumentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a spec. Symbols are matched case-insensitively.
    pub fn insert(&mut self, spec: InstrumentSpec) {
        self.specs.insert(spec.symbol.to_ascii_uppercase(), spec);
    }

    pub fn get(&self, symbol: &str) -> Option<&InstrumentSpec> {
        self.specs.get(&symbol.to_ascii_uppercase())
    }

    /// Table entry for `symbol`, or a ticker-derived spec when it is not listed.
    pub fn resolve(&self, symbol: &str) -> InstrumentSpec {
        self.get(symbol)
            .cloned()
            .unwrap_or_else(|| InstrumentSpec::from_ticker(symbol))
    }

    /// Pip value for `symbol`: table entry if present, heuristic otherwise.
    pub fn pip_value_per_unit(&self, symbol: &str) -> f64 {
        self.get(symbol)
            .map(|spec| spec.pip_value_per_unit)
            .unwrap_or_else(|| heuristic_pip_value(symbol))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl FromIterator<InstrumentSpec> for InstrumentTable {
    fn from_iter<I: IntoIterator<Item = InstrumentSpec>>(iter: I) -> Self {
        let mut table = Self::new();
        for spec in iter {
            table.insert(spec);
        }
        table
    }
}

const CRYPTO_TICKERS: [&str; 4] = ["BTC", "ETH", "ADA", "DOT"];

/// Guess the asset class from the ticker text alone.
pub fn classify(symbol: &str) -> AssetClass {
    let upper = symbol.to_ascii_uppercase();
    if upper.contains("JPY") || (upper.contains("USD") && upper.len() == 7) {
        AssetClass::Forex
    } else if CRYPTO_TICKERS.iter().any(|c| upper.contains(c)) {
        AssetClass::Crypto
    } else {
        AssetClass::Equity
    }
}

/// Ticker-shape pip value heuristic.
///
/// - JPY-quoted pairs: 0.01
/// - seven-character USD pairs (`EUR_USD`, `GBP/USD`): 0.0001
/// - crypto and everything else: 1.0 per unit
pub fn heuristic_pip_value(symbol: &str) -> f64 {
    let upper = symbol.to_ascii_uppercase();
    if upper.contains("JPY") {
        0.01
    } else if upper.contains("USD") && upper.len() == 7 {
        0.0001
    } else {
        1.0
    }
}

/// Heuristic-only pip value lookup, for callers without an instrument table.
pub fn get_pip_value_per_unit(symbol: &str) -> f64 {
    heuristic_pip_value(symbol)
}
