//! Data acquisition configuration.
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables. Clients receive it explicitly at construction.
//!
//! ```toml
//! cache_dir = "cache"
//! use_cache = true
//! timeout_secs = 30
//!
//! [tiingo]
//! api_key = "..."
//!
//! [fmp]
//! api_key = "..."
//! ```

use crate::data::http::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::data::{LocalCache, ReqwestTransport, TransportError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_TIINGO_API_KEY: &str = "TIINGO_API_KEY";
pub const ENV_FMP_API_KEY: &str = "FMP_API_KEY";
pub const ENV_CACHE_DIR: &str = "MARKETLAB_CACHE_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Credentials for one provider.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ProviderConfig {
    /// The key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

// Keys never show up in debug output.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub cache_dir: PathBuf,
    pub use_cache: bool,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub tiingo: ProviderConfig,
    pub fmp: ProviderConfig,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            use_cache: true,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            tiingo: ProviderConfig::default(),
            fmp: ProviderConfig::default(),
        }
    }
}

impl DataConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string. Missing fields take defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `TIINGO_API_KEY`, `FMP_API_KEY` and `MARKETLAB_CACHE_DIR`.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup. Blank values are ignored.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(key) = get(ENV_TIINGO_API_KEY) {
            self.tiingo.api_key = Some(key);
        }
        if let Some(key) = get(ENV_FMP_API_KEY) {
            self.fmp.api_key = Some(key);
        }
        if let Some(dir) = get(ENV_CACHE_DIR) {
            self.cache_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            use_cache: self.use_cache,
            cache_dir: self.cache_dir.clone(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Production HTTP transport with the configured timeout and user agent.
    pub fn build_transport(&self) -> Result<ReqwestTransport, TransportError> {
        ReqwestTransport::new(self.timeout(), &self.user_agent)
    }
}

/// Per-call cache behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    pub use_cache: bool,
    pub cache_dir: PathBuf,
}

impl CacheOptions {
    pub fn enabled(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            use_cache: true,
            cache_dir: cache_dir.into(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            use_cache: false,
            cache_dir: PathBuf::new(),
        }
    }

    /// The cache to consult, or `None` when caching is off.
    pub fn cache(&self) -> Option<LocalCache> {
        self.use_cache.then(|| LocalCache::new(&self.cache_dir))
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        DataConfig::default().cache_options()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = DataConfig::from_toml("").unwrap();
        assert_eq!(config, DataConfig::default());
        assert_eq!(config.cache_dir, PathBuf::from("cache"));
        assert!(config.use_cache);
        assert!(config.tiingo.api_key().is_none());
    }

    #[test]
    fn parses_provider_sections() {
        let config = DataConfig::from_toml(
            r#"
            cache_dir = "/tmp/md"
            use_cache = false
            timeout_secs = 5

            [tiingo]
            api_key = "tk"

            [fmp]
            api_key = "  "
            "#,
        )
        .unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/md"));
        assert!(!config.use_cache);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.tiingo.api_key(), Some("tk"));
        assert_eq!(config.fmp.api_key(), None);
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let err = DataConfig::from_toml("use_cache = \"sometimes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DataConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn env_overrides_win_over_file() {
        let vars: HashMap<&str, &str> = [
            (ENV_TIINGO_API_KEY, "from-env"),
            (ENV_CACHE_DIR, "/var/cache/md"),
            (ENV_FMP_API_KEY, ""),
        ]
        .into_iter()
        .collect();

        let config = DataConfig::from_toml("[fmp]\napi_key = \"file-key\"")
            .unwrap()
            .with_overrides_from(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.tiingo.api_key(), Some("from-env"));
        assert_eq!(config.fmp.api_key(), Some("file-key"));
        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/md"));
    }

    #[test]
    fn debug_output_redacts_keys() {
        let mut config = DataConfig::default();
        config.tiingo.api_key = Some("super-secret".into());
        let shown = format!("{config:?}");
        assert!(!shown.contains("super-secret"));
        assert!(shown.contains("<redacted>"));
    }

    #[test]
    fn cache_options_follow_config() {
        let config = DataConfig {
            use_cache: false,
            ..DataConfig::default()
        };
        assert!(config.cache_options().cache().is_none());
        assert!(CacheOptions::enabled("x").cache().is_some());
    }
}
