//! Keyed response cache
//!
//! One JSON file per logical key under the cache directory. The file name is
//! the sha256 of the key, so keys never need escaping and two keys can never
//! share a record.
//!
//! Each record carries an expiry (epoch ms) and the schema version of the
//! payload. A read that finds a stale, corrupt or differently-versioned
//! record deletes it and reports a miss, so payload shape changes need no
//! migration code: bump [`CACHE_SCHEMA_VERSION`] and old records heal away.
//!
//! Writes go to a uniquely named temp file in the same directory and are
//! renamed over the final path, so concurrent writers to one key resolve to
//! last-write-wins and readers never observe a partial record.

pub mod paths;

pub use paths::default_cache_dir;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Cache format version - bump when any cached payload shape changes
pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// Registry package metadata
pub const PACKAGE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Code-host repository health
pub const REPO_HEALTH_TTL: Duration = Duration::from_secs(12 * 60 * 60);
/// Reachability probe outcomes
pub const PROBE_TTL: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache IO error: {0}")]
    Io(#[from] io::Error),

    #[error("cache serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// On-disk record shape
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheRecord {
    expiry: i64,
    schema_version: u32,
    data: serde_json::Value,
}

/// TTL- and schema-versioned key/value store, one file per key
#[derive(Debug, Clone)]
pub struct KeyedCache {
    dir: PathBuf,
    schema_version: u32,
    enabled: bool,
}

impl KeyedCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            schema_version: CACHE_SCHEMA_VERSION,
            enabled: true,
        }
    }

    /// A cache that never hits and never writes (`--no-cache`)
    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            schema_version: CACHE_SCHEMA_VERSION,
            enabled: false,
        }
    }

    /// Override the running schema version
    pub fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Physical location of the record for `key`
    pub fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hash_key(key)))
    }

    /// Return the payload for `key` if it is present, current and unexpired.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        if !self.enabled {
            return None;
        }
        let path = self.record_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Cache miss: {}", key);
                return None;
            }
            Err(e) => {
                warn!("Failed to read cache record for {}: {}", key, e);
                return None;
            }
        };

        let record: CacheRecord = match serde_json::from_str(&content) {
            Ok(r) => r,
            Err(e) => {
                debug!("Discarding corrupt cache record for {}: {}", key, e);
                remove_record(&path);
                return None;
            }
        };

        if record.schema_version != self.schema_version {
            debug!(
                "Discarding cache record for {} (schema v{} != v{})",
                key, record.schema_version, self.schema_version
            );
            remove_record(&path);
            return None;
        }

        if Utc::now().timestamp_millis() >= record.expiry {
            debug!("Discarding expired cache record for {}", key);
            remove_record(&path);
            return None;
        }

        debug!("Cache hit: {}", key);
        Some(record.data)
    }

    /// Typed [`get`](Self::get); a payload that no longer deserializes is dropped.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                debug!("Cached payload for {} has unexpected shape: {}", key, e);
                remove_record(&self.record_path(key));
                None
            }
        }
    }

    /// Store `value` under `key`, replacing any prior record atomically.
    pub fn set(&self, key: &str, value: &serde_json::Value, ttl: Duration) -> Result<(), CacheError> {
        if !self.enabled {
            return Ok(());
        }
        fs::create_dir_all(&self.dir)?;

        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let record = CacheRecord {
            expiry: Utc::now().timestamp_millis().saturating_add(ttl_ms),
            schema_version: self.schema_version,
            data: value.clone(),
        };
        let bytes = serde_json::to_vec(&record)?;

        let path = self.record_path(key);
        let tmp = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        // Either step can leave a stray tmp file behind
        let written = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, &path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        debug!("Cached {} (ttl {}s)", key, ttl.as_secs());
        Ok(())
    }

    /// Typed [`set`](Self::set)
    pub fn set_as<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), CacheError> {
        let value = serde_json::to_value(value)?;
        self.set(key, &value, ttl)
    }

    /// Delete every record; returns how many were removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        if !self.enabled {
            return Ok(0);
        }
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn remove_record(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Failed to remove cache record {}: {}", path.display(), e);
        }
    }
}

/// Hex sha256 of the logical key
fn hash_key(key: &str) -> String {
    format!("{:x}", Sha256::digest(key.as_bytes()))
}
