//! Marketplace client and data models
//!
//! This module contains the client for the plugin and theme marketplace and
//! the types used to describe catalog entries, installed plugins and updates.

pub mod client;
pub mod query;
pub mod registry;

pub use client::{
    clear_all_cache_entries, clear_cache_entries_in, MarketplaceApiError, MarketplaceClient,
    MarketplaceConfig,
};
pub use query::Query;
pub use registry::{NoBundledPlugins, PluginManifest, PluginRegistry, RegistryError};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Default marketplace domain
pub const DEFAULT_BASE_URL: &str = "http://plugins.piwik.org";

/// Path prefix of every metadata endpoint
pub const API_PATH: &str = "api/1.0";

/// Namespace shared by every marketplace cache store
pub const CACHE_NAMESPACE: &str = "marketplace";

/// Seconds a cached marketplace response stays fresh
pub const CACHE_TIMEOUT_SECS: i64 = 1200;

/// Seconds before an outbound request is abandoned
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// One catalog entry (plugin or theme) as described by the marketplace
///
/// Only the fields the client relies on are typed; everything else the
/// marketplace sends is kept in `extra` and serialized back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    #[serde(default)]
    pub name: String,
    /// Published versions, oldest first
    #[serde(default, deserialize_with = "null_as_default")]
    pub versions: Vec<PluginVersion>,
    #[serde(rename = "isTheme", default, deserialize_with = "truthy")]
    pub is_theme: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PluginDescriptor {
    /// The newest version by catalog convention: the last one listed
    pub fn latest_version(&self) -> Option<&PluginVersion> {
        self.versions.last()
    }
}

/// A published version of a catalog entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginVersion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Download path relative to the marketplace domain
    #[serde(default)]
    pub download: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A plugin installed locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPlugin {
    pub name: String,
    pub version: String,
}

impl InstalledPlugin {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// An entry of the update check response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginUpdate {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Whether a JSON value counts as set: not null, false, zero, `""`, `"0"` or empty
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(is_truthy(&value))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
