//! Command-line interface for the marketplace client
//!
//! This module handles parsing of CLI arguments using clap and maps each
//! subcommand onto a `MarketplaceClient` operation. Results are rendered as
//! pretty-printed JSON.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::cache::FileCache;
use crate::marketplace::{
    clear_all_cache_entries, clear_cache_entries_in, MarketplaceApiError, MarketplaceClient,
    MarketplaceConfig, PluginManifest, RegistryError, DEFAULT_BASE_URL,
};

/// Error types for CLI commands
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Marketplace(#[from] MarketplaceApiError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The cache directory could not be purged
    #[error("Failed to clear marketplace cache: {0}")]
    ClearCache(#[source] std::io::Error),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),

    /// The package URL resolved but the transfer did not complete
    #[error("Download of '{0}' failed")]
    DownloadFailed(String),
}

/// Marketplace client - look up, search, update-check and download plugins and themes
#[derive(Parser, Debug)]
#[command(name = "marketplace")]
#[command(about = "Query the plugin and theme marketplace")]
#[command(version)]
pub struct Cli {
    /// Marketplace domain
    #[arg(long, env = "MARKETPLACE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    /// Local version sent with download requests (defaults to this tool's version)
    #[arg(long, env = "MARKETPLACE_CORE_VERSION", global = true)]
    pub core_version: Option<String>,

    /// Directory for cached responses instead of the platform cache directory
    #[arg(long, value_name = "DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the full descriptor of a plugin or theme
    Info { name: String },

    /// Search the catalog
    Search {
        #[arg(long, default_value = "")]
        keywords: String,
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long, default_value = "")]
        sort: String,
        /// Search themes instead of plugins
        #[arg(long)]
        themes: bool,
    },

    /// Check installed plugins listed in a manifest for updates
    ///
    /// The manifest is JSON: {"plugins": [{"name", "version"}], "bundled": [names]}
    Updates {
        #[arg(long, value_name = "FILE")]
        manifest: PathBuf,
        /// Print the full descriptor of every updatable plugin
        #[arg(long)]
        details: bool,
        /// With --details, list themes instead of plugins
        #[arg(long, requires = "details")]
        themes_only: bool,
    },

    /// Print the download URL of the newest version
    DownloadUrl { name: String },

    /// Download the newest package to TARGET
    Download { name: String, target: PathBuf },

    /// Remove every cached marketplace response
    ClearCache,
}

impl Cli {
    /// Builds the client configuration from the parsed arguments
    pub fn config(&self) -> MarketplaceConfig {
        let mut config = MarketplaceConfig {
            base_url: self.base_url.clone(),
            ..Default::default()
        };
        if let Some(version) = &self.core_version {
            config.core_version = version.clone();
        }
        config
    }

    /// Default log filter directive for the chosen verbosity
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "marketplace=debug"
        } else {
            "marketplace=info"
        }
    }

    fn client(&self) -> Result<MarketplaceClient, MarketplaceApiError> {
        let config = self.config();
        match &self.cache_dir {
            Some(dir) => {
                let cache = FileCache::with_dir(dir.clone(), Some(config.cache_ttl));
                MarketplaceClient::new(config, Arc::new(cache))
            }
            None => MarketplaceClient::with_default_cache(config),
        }
    }
}

/// Runs the parsed command and returns the text to print on stdout
pub async fn run(cli: &Cli) -> Result<String, CliError> {
    match &cli.command {
        Command::ClearCache => {
            match &cli.cache_dir {
                Some(dir) => clear_cache_entries_in(dir),
                None => clear_all_cache_entries(),
            }
            .map_err(CliError::ClearCache)?;
            Ok("Marketplace cache cleared".to_string())
        }
        Command::Info { name } => {
            let client = cli.client()?;
            render(&client.get_plugin_info(name).await?)
        }
        Command::Search {
            keywords,
            query,
            sort,
            themes,
        } => {
            let client = cli.client()?;
            let results = if *themes {
                client.search_for_themes(keywords, query, sort).await?
            } else {
                client.search_for_plugins(keywords, query, sort).await?
            };
            render(&results)
        }
        Command::Updates {
            manifest,
            details,
            themes_only,
        } => {
            let manifest = PluginManifest::load(manifest)?;
            let installed = manifest.plugins.clone();
            let client = cli.client()?.with_registry(Arc::new(manifest));
            if *details {
                render(
                    &client
                        .get_info_of_plugins_having_update(&installed, *themes_only)
                        .await?,
                )
            } else {
                render(&client.check_updates(&installed).await?)
            }
        }
        Command::DownloadUrl { name } => {
            let client = cli.client()?;
            Ok(client.get_download_url(name).await?)
        }
        Command::Download { name, target } => {
            let client = cli.client()?;
            if client.download(name, target).await? {
                Ok(target.display().to_string())
            } else {
                Err(CliError::DownloadFailed(name.clone()))
            }
        }
    }
}

fn render<T: Serialize>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}
