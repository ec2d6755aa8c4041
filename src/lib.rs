//! Marketplace client library
//!
//! Resolves plugin metadata, checks for updates, searches the catalog and
//! downloads packages from the plugin and theme marketplace. All metadata
//! requests go through a cache shared by every client of the same namespace.

pub mod cache;
pub mod cli;
pub mod marketplace;

pub use cache::{CacheStore, FileCache, MemoryCache};
pub use marketplace::{
    clear_all_cache_entries, InstalledPlugin, MarketplaceApiError, MarketplaceClient,
    MarketplaceConfig, PluginDescriptor, PluginRegistry, PluginUpdate, PluginVersion, Query,
};
