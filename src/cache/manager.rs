//! On-disk response store with a fixed time-to-live
//!
//! Provides a `CacheStore` that persists upstream responses as one JSON file
//! per key. Unreadable or stale records are reported as absent, never as
//! errors, so a damaged cache only costs hit rate.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use super::key::CacheKey;

/// Errors that can occur while persisting a cache entry
#[derive(Debug, Error)]
pub enum CacheError {
    /// Directory creation, temp file or rename failed
    #[error("cache I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The entry could not be serialized
    #[error("failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Record stored on disk for each key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// The original key, checked on read
    pub key: String,
    /// The cached response payload
    pub content: Value,
    /// When the entry was written
    pub timestamp: DateTime<Utc>,
}

/// Durable key to response mapping with TTL-based staleness
///
/// Every entry ages out `ttl` after its own write time. Stale files are left
/// in place and simply ignored.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
    ttl: Duration,
}

impl CacheStore {
    /// Creates a store rooted at `cache_dir` whose entries live for `ttl_seconds`
    pub fn new(cache_dir: impl Into<PathBuf>, ttl_seconds: u64) -> Self {
        let ttl = i64::try_from(ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        Self {
            cache_dir: cache_dir.into(),
            ttl,
        }
    }

    /// Directory holding the cache files
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path to the cache file for the given key
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key.file_stem()))
    }

    /// Returns the cached content for `key` if a fresh record exists
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        self.get_at(key, Utc::now())
    }

    /// Same as [`get`](Self::get), evaluated at the given instant
    ///
    /// A record written at `t0` is served while `now < t0 + ttl`.
    pub fn get_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<Value> {
        let record = self.read_record(key)?;

        if record.key != key.as_str() {
            debug!(key = %key.log_id(), "cache record belongs to a different key");
            return None;
        }

        if now.signed_duration_since(record.timestamp) >= self.ttl {
            debug!(key = %key.log_id(), stored_at = %record.timestamp, "cache entry expired");
            return None;
        }

        Some(record.content)
    }

    /// Reads the raw record for `key` without applying the TTL or key check
    ///
    /// Returns `None` if the file is missing or cannot be parsed.
    pub fn read_record(&self, key: &CacheKey) -> Option<CacheRecord> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "unreadable cache record");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "corrupted cache record");
                None
            }
        }
    }

    /// Stores `content` under `key`, replacing any previous record
    pub fn set(&self, key: &CacheKey, content: &Value) -> Result<(), CacheError> {
        self.set_at(key, content, Utc::now())
    }

    /// Same as [`set`](Self::set), stamped with the given instant
    ///
    /// The record is written to a temp file in the cache directory and
    /// renamed into place, so readers never observe a partial file.
    pub fn set_at(
        &self,
        key: &CacheKey,
        content: &Value,
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        fs::create_dir_all(&self.cache_dir).map_err(|source| CacheError::Io {
            path: self.cache_dir.clone(),
            source,
        })?;

        let record = CacheRecord {
            key: key.as_str().to_string(),
            content: content.clone(),
            timestamp: now,
        };
        let json = serde_json::to_vec(&record)?;

        let path = self.path_for(key);
        let io_err = |source: io::Error| CacheError::Io {
            path: path.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(&self.cache_dir).map_err(io_err)?;
        tmp.write_all(&json).map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;

        debug!(key = %key.log_id(), "cache entry written");
        Ok(())
    }
}
