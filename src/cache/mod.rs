//! Cache module for storing marketplace responses
//!
//! This module provides the `CacheStore` abstraction used by the marketplace
//! client, together with a file-backed store that persists decoded responses
//! across process lifetimes and an in-memory store for tests and embedding.
//! Every store has a fixed TTL; entries older than it are treated as absent.

mod manager;
mod memory;

pub use manager::FileCache;
pub use memory::MemoryCache;

use serde_json::Value;

/// A keyed, time-expiring store of decoded responses
///
/// Absence is a normal outcome: `get` returns `None` for missing, unreadable
/// or expired entries instead of an error.
pub trait CacheStore: Send + Sync {
    /// Returns the stored value if it exists and has not expired
    fn get(&self, key: &str) -> Option<Value>;

    /// Stores `value` under `key` with the current timestamp, replacing any prior entry
    fn set(&self, key: &str, value: &Value) -> std::io::Result<()>;

    /// Removes every entry in the store, regardless of age
    fn delete_all(&self) -> std::io::Result<()>;
}
