//! Signal generation: market-data-only timing logic.
//!
//! Signals never see account state (equity, positions). They are deterministic
//! functions of the bar sequence they are given.

pub mod crossover;
pub mod engine;
pub mod stops;

pub use crossover::{detect_cross, generate_signals, CrossoverRow, MaCrossover, SignalDirection};
pub use engine::{LastSignal, SignalEngine, SignalRow};
pub use stops::{stop_prices, AtrStops, StopRow};
