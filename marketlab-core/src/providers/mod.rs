//! Price provider trait and shared response handling.
//!
//! Each provider is one type implementing [`PriceProvider`]. The trait's
//! provided methods own the common flow (date validation, cache lookup,
//! consistency warnings, persistence); implementors only translate a
//! [`PriceRequest`] into HTTP calls and normalized bars.

pub mod fmp;
pub mod tiingo;

pub use fmp::FmpClient;
pub use tiingo::TiingoClient;

use crate::batch::{fetch_batch, BatchResult, LogProgress};
use crate::config::CacheOptions;
use crate::data::{CacheKey, DataError, HttpRequest, HttpResponse, HttpTransport};
use crate::domain::{AssetClass, DateRange, Interval, PriceBar, PriceSeries};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;

/// One normalized download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRequest {
    pub symbol: String,
    pub range: DateRange,
    pub interval: Interval,
    pub asset: AssetClass,
}

/// A historical price source.
pub trait PriceProvider: Send + Sync {
    /// Stable identifier, also used in cache file names.
    fn name(&self) -> &str;

    fn supports(&self, interval: Interval) -> bool;

    /// Asset classes this provider can download. Equities only by default.
    fn supports_asset(&self, asset: AssetClass) -> bool {
        asset == AssetClass::Equity
    }

    /// Download and normalize one series. No caching.
    fn download(&self, request: &PriceRequest) -> Result<PriceSeries, DataError>;

    /// Fetch one symbol between `start` and `end` (`YYYY-MM-DD`, inclusive).
    ///
    /// The date range is validated before anything else; a cache hit makes
    /// no network calls.
    fn fetch_single(
        &self,
        symbol: &str,
        start: &str,
        end: &str,
        interval: Interval,
        options: &CacheOptions,
    ) -> Result<PriceSeries, DataError> {
        let range = DateRange::parse(start, end)?;
        self.fetch_range(symbol, range, interval, options)
    }

    /// Crypto counterpart of [`fetch_single`](Self::fetch_single), e.g. `BTCUSD`.
    fn fetch_crypto(
        &self,
        symbol: &str,
        start: &str,
        end: &str,
        interval: Interval,
        options: &CacheOptions,
    ) -> Result<PriceSeries, DataError> {
        let range = DateRange::parse(start, end)?;
        self.fetch_asset_range(AssetClass::Crypto, symbol, range, interval, options)
    }

    /// [`fetch_single`](Self::fetch_single) with an already validated range.
    fn fetch_range(
        &self,
        symbol: &str,
        range: DateRange,
        interval: Interval,
        options: &CacheOptions,
    ) -> Result<PriceSeries, DataError> {
        self.fetch_asset_range(AssetClass::Equity, symbol, range, interval, options)
    }

    /// Cache lookup, download, consistency check and persistence for one series.
    fn fetch_asset_range(
        &self,
        asset: AssetClass,
        symbol: &str,
        range: DateRange,
        interval: Interval,
        options: &CacheOptions,
    ) -> Result<PriceSeries, DataError> {
        if !self.supports_asset(asset) {
            return Err(DataError::UnsupportedAsset {
                provider: self.name().to_string(),
                asset: asset.to_string(),
            });
        }
        if !self.supports(interval) {
            return Err(DataError::UnsupportedInterval {
                provider: self.name().to_string(),
                interval: interval.to_string(),
            });
        }

        let symbol = canonical_symbol(symbol);
        let key = match asset {
            AssetClass::Equity => CacheKey::prices(self.name(), &symbol, range, interval),
            AssetClass::Crypto => CacheKey::crypto_prices(self.name(), &symbol, range, interval),
        };
        let cache = options.cache();

        if let Some(series) = cache.as_ref().and_then(|c| c.load::<PriceSeries>(&key)) {
            return Ok(series);
        }

        let request = PriceRequest {
            symbol,
            range,
            interval,
            asset,
        };
        let series = self.download(&request)?;

        let inconsistent = series.inconsistent_bars();
        if !inconsistent.is_empty() {
            tracing::warn!(
                symbol = %request.symbol,
                provider = self.name(),
                count = inconsistent.len(),
                first = ?series.bars()[inconsistent[0]].timestamp,
                "inconsistent OHLC bars"
            );
        }

        if let Some(cache) = &cache {
            if let Err(e) = cache.store(&key, &series) {
                tracing::warn!(key = %key, error = %e, "failed to cache downloaded series");
            }
        }
        Ok(series)
    }

    /// Fetch many symbols, isolating per-symbol failures.
    ///
    /// The date range is validated once, before any symbol is attempted.
    /// Symbols are trimmed and uppercased first, so `aapl` and `AAPL` are one
    /// fetch and one key in the result.
    fn fetch_multiple(
        &self,
        symbols: &[&str],
        start: &str,
        end: &str,
        interval: Interval,
        options: &CacheOptions,
    ) -> Result<BatchResult, DataError> {
        self.fetch_multiple_of(AssetClass::Equity, symbols, start, end, interval, options)
    }

    /// [`fetch_multiple`](Self::fetch_multiple) for any asset class.
    fn fetch_multiple_of(
        &self,
        asset: AssetClass,
        symbols: &[&str],
        start: &str,
        end: &str,
        interval: Interval,
        options: &CacheOptions,
    ) -> Result<BatchResult, DataError> {
        let range = DateRange::parse(start, end)?;
        let symbols: Vec<String> = symbols.iter().map(|s| canonical_symbol(s)).collect();
        fetch_batch(
            &symbols,
            |symbol| self.fetch_asset_range(asset, symbol, range, interval, options),
            Some(&LogProgress),
        )
    }
}

/// Request form of a user-supplied symbol.
pub(crate) fn canonical_symbol(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

// ── shared HTTP handling ────────────────────────────────────────────

/// Perform `request` and map transport and status failures.
pub(crate) fn send(
    transport: &dyn HttpTransport,
    provider: &str,
    request: &HttpRequest,
) -> Result<HttpResponse, DataError> {
    tracing::debug!(provider, url = request.redacted_url(), "GET");

    let response = transport
        .get(request)
        .map_err(|e| DataError::HttpTransport(format!("{provider}: {e}")))?;

    match response.status {
        401 | 403 => Err(DataError::auth(
            provider,
            format!("HTTP {} (check the API key)", response.status),
        )),
        429 => Err(DataError::RateLimit {
            provider: provider.to_string(),
            retry_after_secs: response
                .header("retry-after")
                .and_then(|v| v.trim().parse().ok()),
        }),
        _ if !response.is_success() => Err(DataError::response(
            provider,
            format!("HTTP {}: {}", response.status, snippet(&response.body)),
        )),
        _ if response.body.trim().is_empty() => {
            Err(DataError::response(provider, "empty response body"))
        }
        _ => Ok(response),
    }
}

/// Decode a JSON body.
pub(crate) fn decode<T: DeserializeOwned>(provider: &str, body: &str) -> Result<T, DataError> {
    serde_json::from_str(body).map_err(|e| {
        DataError::response(provider, format!("undecodable body ({e}): {}", snippet(body)))
    })
}

/// Parse a provider timestamp. Zoned values are converted to UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Run `fetch` over consecutive windows of `range` and concatenate the bars.
pub(crate) fn download_windows(
    range: DateRange,
    window_days: i64,
    mut fetch: impl FnMut(DateRange) -> Result<Vec<PriceBar>, DataError>,
) -> Result<Vec<PriceBar>, DataError> {
    let mut bars = Vec::new();
    for window in range.windows(window_days) {
        bars.extend(fetch(window)?);
    }
    Ok(bars)
}

/// Canonicalize downloaded bars into a series; an empty result is an error.
pub(crate) fn into_series(
    provider: &str,
    request: &PriceRequest,
    bars: Vec<PriceBar>,
) -> Result<PriceSeries, DataError> {
    if bars.is_empty() {
        return Err(DataError::response(
            provider,
            format!(
                "no {} data for {} in {}",
                request.interval, request.symbol, request.range
            ),
        ));
    }
    Ok(PriceSeries::from_bars(
        request.symbol.clone(),
        request.interval,
        bars,
    ))
}

/// Aggregate sorted daily bars into weekly (ISO week) or monthly bars.
///
/// Each output bar keeps the first bar's timestamp and open, the extreme
/// high and low, the last close and the summed volume.
pub(crate) fn resample(daily: &[PriceBar], interval: Interval) -> Vec<PriceBar> {
    let period = |bar: &PriceBar| -> (i32, u32) {
        let date = bar.timestamp.date();
        match interval {
            Interval::Monthly => (date.year(), date.month()),
            _ => {
                let week = date.iso_week();
                (week.year(), week.week())
            }
        }
    };

    let mut out: Vec<PriceBar> = Vec::new();
    let mut current: Option<(i32, u32)> = None;

    for bar in daily {
        let p = period(bar);
        if current == Some(p) {
            if let Some(agg) = out.last_mut() {
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                agg.volume += bar.volume;
                continue;
            }
        }
        out.push(bar.clone());
        current = Some(p);
    }
    out
}

fn snippet(body: &str) -> String {
    const MAX: usize = 200;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
