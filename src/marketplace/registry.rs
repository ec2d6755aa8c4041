//! Installed-plugin registry
//!
//! The marketplace client asks a registry whether a plugin ships with core,
//! so bundled plugins are never sent to the update check. `PluginManifest`
//! reads installed and bundled plugins from a JSON file for the CLI.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::InstalledPlugin;

/// Answers questions about locally installed plugins
pub trait PluginRegistry: Send + Sync {
    /// Whether `name` is distributed as part of core
    fn is_bundled_with_core(&self, name: &str) -> bool;
}

/// Registry that treats every plugin as separately installed
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBundledPlugins;

impl PluginRegistry for NoBundledPlugins {
    fn is_bundled_with_core(&self, _name: &str) -> bool {
        false
    }
}

/// Errors that can occur when loading a plugin manifest
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The manifest file could not be read
    #[error("Failed to read plugin manifest {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid JSON of the expected shape
    #[error("Failed to parse plugin manifest {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Installed plugins and the names bundled with core, as listed in a JSON file
///
/// ```json
/// {
///   "plugins": [{"name": "TreemapVisualization", "version": "1.0.1"}],
///   "bundled": ["CoreHome", "Actions"]
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginManifest {
    #[serde(default)]
    pub plugins: Vec<InstalledPlugin>,
    #[serde(default)]
    pub bundled: BTreeSet<String>,
}

impl PluginManifest {
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = fs::read_to_string(path).map_err(|source| RegistryError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| RegistryError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl PluginRegistry for PluginManifest {
    fn is_bundled_with_core(&self, name: &str) -> bool {
        self.bundled.contains(name)
    }
}
