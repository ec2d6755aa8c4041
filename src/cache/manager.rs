//! File-backed cache store
//!
//! Provides a `FileCache` that stores decoded responses as JSON files in a
//! namespace directory, with a creation timestamp checked against the store TTL.

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::CacheStore;

/// Wrapper struct for cached data stored on disk
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    /// The cached data
    data: T,
    /// When the data was cached
    cached_at: DateTime<Utc>,
}

/// Stores cache entries as JSON files in a per-namespace directory
///
/// The default location is XDG-compliant (`~/.cache/marketplace/<namespace>/`
/// on Linux). Entries older than the TTL are ignored on read and overwritten
/// on the next write. A store built without a TTL never expires entries.
#[derive(Debug, Clone)]
pub struct FileCache {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
    /// Maximum age of a readable entry, `None` for no expiry
    ttl: Option<Duration>,
}

impl FileCache {
    /// Creates a FileCache for `namespace` under the platform cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new(namespace: &str, ttl: Option<Duration>) -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "marketplace")?;
        let cache_dir = project_dirs.cache_dir().join(namespace);
        Some(Self { cache_dir, ttl })
    }

    /// Creates a FileCache rooted at a custom directory
    pub fn with_dir(cache_dir: PathBuf, ttl: Option<Duration>) -> Self {
        Self { cache_dir, ttl }
    }

    /// Directory holding this store's entries
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path to a cache file for the given key
    fn cache_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", file_name_for(key)))
    }

    fn is_fresh(&self, cached_at: DateTime<Utc>) -> bool {
        match self.ttl {
            Some(ttl) => Utc::now() - cached_at <= ttl,
            None => true,
        }
    }
}

/// Maps a cache key onto a safe file name
///
/// Bytes outside `[A-Za-z0-9._-]`, `%` included, become `%XX`, so distinct
/// keys always get distinct file names.
fn file_name_for(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'-' | b'_') {
            name.push(byte as char);
        } else {
            name.push_str(&format!("%{:02X}", byte));
        }
    }
    name
}

impl CacheStore for FileCache {
    fn get(&self, key: &str) -> Option<Value> {
        let content = fs::read_to_string(self.cache_path(key)).ok()?;
        let entry: CacheEntry<Value> = serde_json::from_str(&content).ok()?;

        if self.is_fresh(entry.cached_at) {
            Some(entry.data)
        } else {
            None
        }
    }

    fn set(&self, key: &str, value: &Value) -> std::io::Result<()> {
        fs::create_dir_all(&self.cache_dir)?;

        let entry = CacheEntry {
            data: value,
            cached_at: Utc::now(),
        };

        let json = serde_json::to_string_pretty(&entry)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;

        fs::write(self.cache_path(key), json)
    }

    fn delete_all(&self) -> std::io::Result<()> {
        match fs::remove_dir_all(&self.cache_dir) {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
