//! Local Parquet file cache.
//!
//! Layout: `{cache_dir}/{CacheKey::file_name()}`, one file per key.
//!
//! - Atomic writes (write to a unique .tmp, rename into place; last writer wins)
//! - Schema validation on load
//! - Corrupt files are quarantined (`{filename}.quarantined`) and reported as a miss
//! - No eviction: historical data for a closed date range is treated as immutable

use super::error::DataError;
use super::key::{CacheKey, CACHE_FILE_EXTENSION};
use super::schema::SchemaError;
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A table type that can be persisted in the cache.
pub trait CachedTable: Sized {
    fn to_frame(&self) -> Result<DataFrame, SchemaError>;

    /// Rebuild the table. `key` supplies the identity that is not stored per row.
    fn from_frame(df: &DataFrame, key: &CacheKey) -> Result<Self, SchemaError>;
}

/// Why a cache lookup produced nothing.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("no cache entry")]
    Miss,

    #[error("corrupt cache entry {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

/// One file in the cache directory.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub file_name: String,
    pub size_bytes: u64,
}

/// Key → table persistence in a single directory.
#[derive(Debug, Clone)]
pub struct LocalCache {
    cache_dir: PathBuf,
}

impl LocalCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(key.file_name())
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.path_for(key).is_file()
    }

    /// Load an entry, distinguishing a miss from a corrupt file.
    pub fn try_load<T: CachedTable>(&self, key: &CacheKey) -> Result<T, CacheError> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Err(CacheError::Miss);
        }

        let corrupt = |reason: String| CacheError::Corrupt {
            path: path.clone(),
            reason,
        };

        let df = read_parquet(&path).map_err(|e| corrupt(e.to_string()))?;
        if df.height() == 0 {
            return Err(corrupt("empty table".into()));
        }
        T::from_frame(&df, key).map_err(|e| corrupt(e.to_string()))
    }

    /// Load an entry; a corrupt file is quarantined and treated as a miss.
    pub fn load<T: CachedTable>(&self, key: &CacheKey) -> Option<T> {
        match self.try_load(key) {
            Ok(table) => {
                tracing::debug!(key = %key, "cache hit");
                Some(table)
            }
            Err(CacheError::Miss) => {
                tracing::debug!(key = %key, "cache miss");
                None
            }
            Err(CacheError::Corrupt { path, reason }) => {
                let quarantine = quarantine_path(&path);
                tracing::warn!(
                    path = %path.display(),
                    %reason,
                    "quarantining corrupt cache file"
                );
                let _ = fs::rename(&path, &quarantine);
                None
            }
        }
    }

    /// Persist `table` under `key`, replacing any previous entry.
    pub fn store<T: CachedTable>(&self, key: &CacheKey, table: &T) -> Result<(), DataError> {
        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| DataError::Cache(format!("failed to create dir: {e}")))?;

        let mut df = table
            .to_frame()
            .map_err(|e| DataError::Cache(format!("table conversion: {e}")))?;

        let path = self.path_for(key);
        let tmp_path = tmp_path(&path);

        write_parquet(&mut df, &tmp_path)?;

        // Atomic rename
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::Cache(format!("atomic rename failed: {e}"))
        })?;

        tracing::debug!(key = %key, rows = df.height(), "cache store");
        Ok(())
    }

    /// Cache files currently on disk, sorted by name. Missing directory means empty.
    pub fn entries(&self) -> Result<Vec<CacheEntry>, DataError> {
        if !self.cache_dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let dir = fs::read_dir(&self.cache_dir)
            .map_err(|e| DataError::Cache(format!("read dir: {e}")))?;

        for entry in dir {
            let entry = entry.map_err(|e| DataError::Cache(format!("dir entry: {e}")))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(CACHE_FILE_EXTENSION) {
                continue;
            }
            let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
            entries.push(CacheEntry {
                file_name: entry.file_name().to_string_lossy().to_string(),
                size_bytes,
            });
        }

        entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(entries)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.{n}.tmp", std::process::id()));
    path.with_file_name(name)
}

fn quarantine_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".quarantined");
    path.with_file_name(name)
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file = fs::File::create(path)
        .map_err(|e| DataError::Cache(format!("create file: {e}")))?;
    ParquetWriter::new(file).finish(df).map_err(|e| {
        let _ = fs::remove_file(path);
        DataError::Cache(format!("write parquet: {e}"))
    })?;
    Ok(())
}

fn read_parquet(path: &Path) -> Result<DataFrame, SchemaError> {
    let file = fs::File::open(path).map_err(|e| SchemaError::Invalid(format!("open: {e}")))?;
    Ok(ParquetReader::new(file).finish()?)
}
