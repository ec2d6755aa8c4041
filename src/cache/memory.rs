//! In-memory cache store

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::CacheStore;

/// Process-local cache store with the same expiry rules as `FileCache`
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (DateTime<Utc>, Value)>>,
    ttl: Option<Duration>,
}

impl MemoryCache {
    /// Creates an empty store; `None` keeps entries forever
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Number of stored entries, stale ones included
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been stored since creation or the last `delete_all`
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, (DateTime<Utc>, Value)>> {
        // A poisoned map still holds whole entries; keep using it.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let entries = self.lock();
        let (cached_at, value) = entries.get(key)?;
        match self.ttl {
            Some(ttl) if Utc::now() - *cached_at > ttl => None,
            _ => Some(value.clone()),
        }
    }

    fn set(&self, key: &str, value: &Value) -> std::io::Result<()> {
        self.lock()
            .insert(key.to_string(), (Utc::now(), value.clone()));
        Ok(())
    }

    fn delete_all(&self) -> std::io::Result<()> {
        self.lock().clear();
        Ok(())
    }
}
