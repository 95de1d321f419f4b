//! Batch fetch orchestrator: multi-symbol fetches with failure isolation.

use crate::data::DataError;
use crate::domain::{MultiSymbolPriceMap, PriceSeries};
use std::collections::HashSet;

/// Progress callback for multi-symbol operations.
pub trait FetchProgress {
    /// Called when starting to fetch a symbol.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called when a symbol fetch completes.
    fn on_complete(
        &self,
        symbol: &str,
        index: usize,
        total: usize,
        result: Result<&PriceSeries, &DataError>,
    );

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that logs through `tracing`.
pub struct LogProgress;

impl FetchProgress for LogProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        tracing::debug!(symbol, "[{}/{}] fetching", index + 1, total);
    }

    fn on_complete(
        &self,
        symbol: &str,
        _index: usize,
        _total: usize,
        result: Result<&PriceSeries, &DataError>,
    ) {
        match result {
            Ok(series) => tracing::debug!(symbol, bars = series.len(), "fetched"),
            Err(e) => tracing::warn!(symbol, error = %e, "fetch failed"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        tracing::info!(succeeded, failed, total, "batch complete");
    }
}

/// A symbol that could not be fetched, and why.
#[derive(Debug)]
pub struct SymbolFailure {
    pub symbol: String,
    pub error: DataError,
}

/// Outcome of a batch: series for the symbols that succeeded, in input order,
/// plus one failure record per symbol that did not.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub prices: MultiSymbolPriceMap,
    pub failures: Vec<SymbolFailure>,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.prices.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn total(&self) -> usize {
        self.succeeded() + self.failed()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// True when at least one symbol was requested and none succeeded.
    pub fn all_failed(&self) -> bool {
        self.prices.is_empty() && !self.failures.is_empty()
    }
}

/// Fetch every distinct symbol in order with `fetch`.
///
/// Duplicates are fetched once. A failing symbol is recorded and the batch
/// moves on, unless the error is fatal (see [`DataError::is_fatal`]), which
/// aborts the whole call.
pub fn fetch_batch<S, F>(
    symbols: &[S],
    mut fetch: F,
    progress: Option<&dyn FetchProgress>,
) -> Result<BatchResult, DataError>
where
    S: AsRef<str>,
    F: FnMut(&str) -> Result<PriceSeries, DataError>,
{
    let mut seen = HashSet::new();
    let unique: Vec<&str> = symbols
        .iter()
        .map(|s| s.as_ref())
        .filter(|s| seen.insert(*s))
        .collect();

    let total = unique.len();
    let mut result = BatchResult::default();

    for (i, symbol) in unique.into_iter().enumerate() {
        if let Some(p) = progress {
            p.on_start(symbol, i, total);
        }

        let outcome = fetch(symbol);
        if let Some(p) = progress {
            p.on_complete(symbol, i, total, outcome.as_ref());
        }

        match outcome {
            Ok(series) => result.prices.insert(symbol, series),
            Err(e) if e.is_fatal() => {
                tracing::error!(symbol, error = %e, "aborting batch");
                return Err(e);
            }
            Err(e) => result.failures.push(SymbolFailure {
                symbol: symbol.to_string(),
                error: e,
            }),
        }
    }

    if let Some(p) = progress {
        p.on_batch_complete(result.succeeded(), result.failed(), total);
    }
    tracing::info!(
        succeeded = result.succeeded(),
        failed = result.failed(),
        "batch fetch finished"
    );

    Ok(result)
}
