//! Domain types for MarketLab

pub mod asset;
pub mod bar;
pub mod date_range;
pub mod interval;
pub mod symbol;

pub use asset::AssetClass;
pub use bar::{MultiSymbolPriceMap, PriceBar, PriceSeries};
pub use date_range::DateRange;
pub use interval::Interval;
pub use symbol::{normalize_ticker, MarketIndex, SymbolRecord, SymbolTable};
