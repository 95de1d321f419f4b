//! Deterministic cache keys.
//!
//! A key names exactly one cache file. Entries are addressed by key only:
//! requesting a wider date range produces a different key and therefore a
//! miss, while the same key always returns what was stored first.

use crate::domain::{DateRange, Interval, MarketIndex};
use std::fmt;

pub const CACHE_FILE_EXTENSION: &str = "parquet";

/// Logical dataset kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Prices,
    CryptoPrices,
    Symbols,
}

impl Dataset {
    pub fn as_str(self) -> &'static str {
        match self {
            Dataset::Prices => "prices",
            Dataset::CryptoPrices => "crypto",
            Dataset::Symbols => "symbols",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub dataset: Dataset,
    /// Ticker for prices, index code for symbol lists.
    pub subject: String,
    pub range: Option<DateRange>,
    pub interval: Option<Interval>,
    pub provider: Option<String>,
    file_name: Option<String>,
}

impl CacheKey {
    /// Key for one provider's series of `symbol` over `range` at `interval`.
    pub fn prices(provider: &str, symbol: &str, range: DateRange, interval: Interval) -> Self {
        Self {
            dataset: Dataset::Prices,
            subject: symbol.to_string(),
            range: Some(range),
            interval: Some(interval),
            provider: Some(provider.to_string()),
            file_name: None,
        }
    }

    /// Key for a crypto pair's series. Never collides with an equity key.
    pub fn crypto_prices(
        provider: &str,
        symbol: &str,
        range: DateRange,
        interval: Interval,
    ) -> Self {
        Self {
            dataset: Dataset::CryptoPrices,
            ..Self::prices(provider, symbol, range, interval)
        }
    }

    /// Key for an index membership snapshot.
    pub fn symbols(index: MarketIndex) -> Self {
        Self {
            dataset: Dataset::Symbols,
            subject: index.as_code().to_string(),
            range: None,
            interval: None,
            provider: None,
            file_name: None,
        }
    }

    /// Override the derived file name. Path components are discarded.
    pub fn with_file_name(mut self, file_name: &str) -> Self {
        let base = file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(file_name)
            .trim();
        if !base.is_empty() {
            self.file_name = Some(base.to_string());
        }
        self
    }

    /// File name of the entry inside the cache directory.
    pub fn file_name(&self) -> String {
        if let Some(name) = &self.file_name {
            return name.clone();
        }

        let mut parts = vec![self.dataset.as_str().to_string()];
        if let Some(provider) = &self.provider {
            parts.push(encode(provider, false));
        }
        parts.push(encode(&self.subject, true));
        if let Some(interval) = self.interval {
            parts.push(interval.as_code().to_string());
        }
        if let Some(range) = &self.range {
            parts.push(range.start().to_string());
            parts.push(range.end().to_string());
        }
        format!("{}.{CACHE_FILE_EXTENSION}", parts.join("_"))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// Portable, injective file-name component.
///
/// Bytes outside `[A-Za-z0-9-^=]` are written as `%XX`, so two different
/// subjects never share a file. `_` separates key parts and is only kept
/// literally in the subject, which is the one part of variable width.
fn encode(part: &str, keep_underscore: bool) -> String {
    let mut out = String::with_capacity(part.len());
    for b in part.bytes() {
        let c = b as char;
        let safe = c.is_ascii_alphanumeric() || matches!(c, '-' | '^' | '=');
        if safe || (keep_underscore && c == '_') {
            out.push(c);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}
