//! Domain types for TradePulse

pub mod bar;
pub mod instrument;
pub mod order;
pub mod quote;

pub use bar::{Bar, BarError, BarSeries};
pub use instrument::{
    classify, get_pip_value_per_unit, heuristic_pip_value, AssetClass, InstrumentSpec,
    InstrumentTable,
};
pub use order::{OrderRequest, OrderSide};
pub use quote::Quote;
