//! MarketLab Core: market data acquisition and caching.
//!
//! This crate turns index names and ticker lists into ready-to-use price tables:
//! - Domain types (price bars and series, intervals, date ranges, index symbol tables)
//! - Symbol list loader that parses public index constituent tables
//! - Provider price clients (Tiingo, Financial Modeling Prep) behind one trait
//! - Batch orchestrator with per-symbol failure isolation
//! - Parquet file cache keyed by provider, symbol, interval and date range

pub mod batch;
pub mod config;
pub mod data;
pub mod domain;
pub mod providers;
pub mod symbols;

pub use batch::{fetch_batch, BatchResult, FetchProgress, LogProgress, SymbolFailure};
pub use config::{CacheOptions, ConfigError, DataConfig};
pub use data::{DataError, HttpTransport, LocalCache, ReqwestTransport, StubTransport};
pub use domain::{
    AssetClass, DateRange, Interval, MarketIndex, MultiSymbolPriceMap, PriceBar, PriceSeries,
    SymbolRecord, SymbolTable,
};
pub use providers::{FmpClient, PriceProvider, PriceRequest, TiingoClient};
pub use symbols::SymbolListLoader;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: public types can be shared across threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<PriceBar>();
        require_sync::<PriceBar>();
        require_send::<PriceSeries>();
        require_sync::<PriceSeries>();
        require_send::<MultiSymbolPriceMap>();
        require_sync::<MultiSymbolPriceMap>();
        require_send::<SymbolTable>();
        require_sync::<SymbolTable>();
        require_send::<DateRange>();
        require_sync::<DateRange>();

        // Errors and results
        require_send::<DataError>();
        require_sync::<DataError>();
        require_send::<BatchResult>();
        require_sync::<BatchResult>();

        // Clients and infrastructure
        require_send::<LocalCache>();
        require_sync::<LocalCache>();
        require_send::<SymbolListLoader>();
        require_sync::<SymbolListLoader>();
        require_send::<TiingoClient>();
        require_sync::<TiingoClient>();
        require_send::<FmpClient>();
        require_sync::<FmpClient>();
        require_send::<ReqwestTransport>();
        require_sync::<ReqwestTransport>();
        require_send::<StubTransport>();
        require_sync::<StubTransport>();
        require_send::<DataConfig>();
        require_sync::<DataConfig>();
    }

    /// Providers are usable as trait objects.
    #[test]
    fn providers_are_object_safe() {
        let transport: std::sync::Arc<dyn HttpTransport> = std::sync::Arc::new(StubTransport::new());
        let providers: Vec<Box<dyn PriceProvider>> = vec![
            Box::new(TiingoClient::new(transport.clone(), None)),
            Box::new(FmpClient::new(transport, None)),
        ];
        let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["tiingo", "fmp"]);
    }
}
