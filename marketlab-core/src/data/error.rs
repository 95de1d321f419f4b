//! Structured error types for symbol and price acquisition.
//!
//! These are designed to be displayable in CLI output and to be matched on by
//! callers that implement their own retry policy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    // ── symbol acquisition ──
    #[error("symbol source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("page layout changed, no matching symbol table: {0}")]
    SchemaMismatch(String),

    #[error("unsupported market index: {0}")]
    UnsupportedIndex(String),

    // ── price acquisition ──
    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("interval {interval} is not supported by {provider}")]
    UnsupportedInterval { provider: String, interval: String },

    #[error("{asset} prices are not offered by {provider}")]
    UnsupportedAsset { provider: String, asset: String },

    #[error("authentication failed for {provider}: {message}")]
    Authentication { provider: String, message: String },

    #[error("rate limited by {provider}{}", retry_hint(.retry_after_secs))]
    RateLimit {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    #[error("unexpected response from {provider}: {message}")]
    ProviderResponse { provider: String, message: String },

    #[error("HTTP transport error: {0}")]
    HttpTransport(String),

    // ── storage ──
    #[error("cache error: {0}")]
    Cache(String),
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(" (retry after {secs}s)"),
        None => String::new(),
    }
}

impl DataError {
    /// Configuration-level failures: the same call would fail for every
    /// symbol, so a batch stops instead of recording them per symbol.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DataError::Authentication { .. }
                | DataError::InvalidDateRange(_)
                | DataError::UnsupportedInterval { .. }
                | DataError::UnsupportedAsset { .. }
                | DataError::UnsupportedIndex(_)
        )
    }

    pub(crate) fn response(provider: &str, message: impl Into<String>) -> Self {
        DataError::ProviderResponse {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn auth(provider: &str, message: impl Into<String>) -> Self {
        DataError::Authentication {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(DataError::auth("tiingo", "bad token").is_fatal());
        assert!(DataError::InvalidDateRange("x".into()).is_fatal());
        assert!(DataError::UnsupportedIndex("RUSSELL_2000".into()).is_fatal());
        assert!(DataError::UnsupportedAsset {
            provider: "p".into(),
            asset: "crypto".into()
        }
        .is_fatal());
        assert!(!DataError::HttpTransport("timeout".into()).is_fatal());
        assert!(!DataError::response("fmp", "empty").is_fatal());
        assert!(!DataError::RateLimit {
            provider: "fmp".into(),
            retry_after_secs: None
        }
        .is_fatal());
    }

    #[test]
    fn rate_limit_message_includes_retry_hint() {
        let err = DataError::RateLimit {
            provider: "tiingo".into(),
            retry_after_secs: Some(30),
        };
        assert_eq!(err.to_string(), "rate limited by tiingo (retry after 30s)");
    }
}
