//! Index constituents with optional local caching.

use super::index::{source, IndexSource};
use super::parser::parse_symbol_table;
use crate::config::CacheOptions;
use crate::data::{CacheKey, DataError, HttpRequest, HttpTransport};
use crate::domain::{MarketIndex, SymbolTable};
use chrono::{SubsecRound, Utc};
use std::sync::Arc;

/// Resolves a market index to its current member list.
///
/// A cached table is returned as-is without touching the network. There are
/// no retries; a failed download surfaces as `SourceUnavailable`.
#[derive(Clone)]
pub struct SymbolListLoader {
    transport: Arc<dyn HttpTransport>,
}

impl SymbolListLoader {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Fetch the member list of `index`.
    ///
    /// `file_name` overrides the default cache file name (`symbols_{index}.parquet`).
    pub fn fetch_symbols(
        &self,
        index: MarketIndex,
        options: &CacheOptions,
        file_name: Option<&str>,
    ) -> Result<SymbolTable, DataError> {
        let src = source(index)?;

        let mut key = CacheKey::symbols(index);
        if let Some(name) = file_name {
            key = key.with_file_name(name);
        }

        let cache = options.cache();
        if let Some(table) = cache.as_ref().and_then(|c| c.load::<SymbolTable>(&key)) {
            tracing::debug!(index = %index, symbols = table.len(), "symbol list from cache");
            return Ok(table);
        }

        let table = self.download(index, src)?;

        if let Some(cache) = &cache {
            cache.store(&key, &table)?;
        }
        tracing::info!(index = %index, symbols = table.len(), "fetched symbol list");
        Ok(table)
    }

    pub fn fetch_nasdaq100(&self, options: &CacheOptions) -> Result<SymbolTable, DataError> {
        self.fetch_symbols(MarketIndex::Nasdaq100, options, None)
    }

    pub fn fetch_sp500(&self, options: &CacheOptions) -> Result<SymbolTable, DataError> {
        self.fetch_symbols(MarketIndex::Sp500, options, None)
    }

    pub fn fetch_dow_jones(&self, options: &CacheOptions) -> Result<SymbolTable, DataError> {
        self.fetch_symbols(MarketIndex::DowJones, options, None)
    }

    pub fn fetch_russell1000(&self, options: &CacheOptions) -> Result<SymbolTable, DataError> {
        self.fetch_symbols(MarketIndex::Russell1000, options, None)
    }

    fn download(&self, index: MarketIndex, src: &IndexSource) -> Result<SymbolTable, DataError> {
        let request = HttpRequest::get(src.url);
        tracing::debug!(url = request.redacted_url(), "GET symbol source");

        let response = self
            .transport
            .get(&request)
            .map_err(|e| DataError::SourceUnavailable(format!("{}: {e}", src.url)))?;
        if !response.is_success() {
            return Err(DataError::SourceUnavailable(format!(
                "{}: HTTP {}",
                src.url, response.status
            )));
        }

        let records = parse_symbol_table(&response.body, &src.signature, src.default_exchange)?;
        let fetched_at = Utc::now().trunc_subsecs(0).naive_utc();
        Ok(SymbolTable::new(index, fetched_at, records))
    }
}
