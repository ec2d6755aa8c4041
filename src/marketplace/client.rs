//! Marketplace API client
//!
//! Every metadata operation goes through `fetch`, which looks the canonical
//! query up in the cache before touching the network, validates the decoded
//! response and stores it on success. Downloads reuse the same HTTP client
//! and timeout but report transfer problems as `false` instead of an error.

use chrono::Duration;
use futures::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::registry::{NoBundledPlugins, PluginRegistry};
use super::{
    is_truthy, InstalledPlugin, PluginDescriptor, PluginUpdate, Query, API_PATH,
    CACHE_NAMESPACE, CACHE_TIMEOUT_SECS, DEFAULT_BASE_URL, HTTP_REQUEST_TIMEOUT_SECS,
};
use crate::cache::{CacheStore, FileCache, MemoryCache};

/// Number of characters of an unreadable body quoted in the error message
const RESPONSE_EXCERPT_CHARS: usize = 50;

/// Errors that can occur when talking to the marketplace
#[derive(Debug, Error)]
pub enum MarketplaceApiError {
    /// The response body could not be decoded (this includes transport failures)
    #[error("There was an error reading the response from the Marketplace: {excerpt}. Please try again later.")]
    InvalidResponse { excerpt: String },

    /// The marketplace reported an error
    #[error("{0}")]
    Remote(String),

    /// A download was requested for a plugin without published versions
    #[error("Plugin has no versions.")]
    NoVersions { name: String },

    /// The response decoded but does not have the expected structure
    #[error("Unexpected response from the Marketplace for {action}: {source}")]
    UnexpectedShape {
        action: String,
        #[source]
        source: serde_json::Error,
    },

    /// Request parameters could not be encoded
    #[error("Failed to encode request parameters: {0}")]
    EncodeParams(#[source] serde_json::Error),

    /// The HTTP client could not be constructed
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Errors that end a file transfer
#[derive(Debug, Error)]
enum TransferError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to write download target: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings for a marketplace client
#[derive(Debug, Clone)]
pub struct MarketplaceConfig {
    /// Marketplace domain, without trailing slash
    pub base_url: String,
    /// Local version sent as `coreVersion` on download URLs
    pub core_version: String,
    pub request_timeout: StdDuration,
    /// Freshness window of the cache the client creates for itself
    pub cache_ttl: Duration,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            core_version: env!("CARGO_PKG_VERSION").to_string(),
            request_timeout: StdDuration::from_secs(HTTP_REQUEST_TIMEOUT_SECS),
            cache_ttl: Duration::seconds(CACHE_TIMEOUT_SECS),
        }
    }
}

/// Client for the plugin and theme marketplace
#[derive(Clone)]
pub struct MarketplaceClient {
    http_client: Client,
    cache: Arc<dyn CacheStore>,
    registry: Arc<dyn PluginRegistry>,
    config: MarketplaceConfig,
}

impl fmt::Debug for MarketplaceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketplaceClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MarketplaceClient {
    /// Creates a client that caches responses in `cache`
    pub fn new(
        mut config: MarketplaceConfig,
        cache: Arc<dyn CacheStore>,
    ) -> Result<Self, MarketplaceApiError> {
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("marketplace/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(MarketplaceApiError::HttpClient)?;

        config.base_url = config.base_url.trim_end_matches('/').to_string();

        Ok(Self {
            http_client,
            cache,
            registry: Arc::new(NoBundledPlugins),
            config,
        })
    }

    /// Creates a client backed by the shared on-disk `marketplace` cache
    ///
    /// Falls back to an in-memory cache when no cache directory is available.
    pub fn with_default_cache(config: MarketplaceConfig) -> Result<Self, MarketplaceApiError> {
        let ttl = Some(config.cache_ttl);
        let cache: Arc<dyn CacheStore> = match FileCache::new(CACHE_NAMESPACE, ttl) {
            Some(cache) => Arc::new(cache),
            None => {
                warn!("no cache directory available, marketplace responses are cached in memory only");
                Arc::new(MemoryCache::new(ttl))
            }
        };
        Self::new(config, cache)
    }

    /// Uses `registry` to decide which installed plugins ship with core
    pub fn with_registry(mut self, registry: Arc<dyn PluginRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &MarketplaceConfig {
        &self.config
    }

    /// Returns the decoded response for `query`, from cache when fresh
    ///
    /// On a miss the marketplace is queried at
    /// `<base>/api/1.0/<action>?<query>`. Bodies that are not JSON, and
    /// responses carrying an `error` field, are errors and are never cached.
    pub async fn fetch(&self, query: &Query) -> Result<Value, MarketplaceApiError> {
        let cache_key = query.cache_key();

        if let Some(cached) = self.cache.get(&cache_key) {
            debug!(action = query.action(), "marketplace cache hit");
            return Ok(cached);
        }

        let url = format!(
            "{}/{}/{}?{}",
            self.config.base_url,
            API_PATH,
            query.action(),
            query.query_string()
        );
        debug!(%url, "marketplace cache miss, fetching");

        let body = self.request_body(&url).await;
        let result = decode_response(&body)?;

        if let Err(e) = self.cache.set(&cache_key, &result) {
            warn!(key = %cache_key, error = %e, "failed to cache marketplace response");
        }

        Ok(result)
    }

    /// Reads the response body, treating transport failures as an empty body
    async fn request_body(&self, url: &str) -> String {
        let response = match self.http_client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(%url, error = %e, "marketplace request failed");
                return String::new();
            }
        };

        response.text().await.unwrap_or_else(|e| {
            warn!(%url, error = %e, "failed to read marketplace response");
            String::new()
        })
    }

    /// Fetches the full descriptor of a plugin or theme
    pub async fn get_plugin_info(&self, name: &str) -> Result<PluginDescriptor, MarketplaceApiError> {
        let query = Query::new(format!("plugins/{}/info", name));
        let response = self.fetch(&query).await?;
        decode_as(query.action(), response)
    }

    /// Asks the marketplace which of `plugins` have a newer version
    ///
    /// Plugins bundled with core are left out of the request entirely.
    pub async fn check_updates(
        &self,
        plugins: &[InstalledPlugin],
    ) -> Result<Vec<PluginUpdate>, MarketplaceApiError> {
        let request = UpdateCheckRequest {
            plugins: plugins
                .iter()
                .filter(|plugin| !self.registry.is_bundled_with_core(&plugin.name))
                .collect(),
        };
        let encoded = serde_json::to_string(&request).map_err(MarketplaceApiError::EncodeParams)?;

        let query = Query::new("plugins/checkUpdates").param("plugins", encoded);
        let response = self.fetch(&query).await?;

        if !is_truthy(&response) {
            return Ok(Vec::new());
        }

        decode_as(query.action(), response)
    }

    /// Descriptors of the updatable plugins that are themes (`themes_only`) or are not
    pub async fn get_info_of_plugins_having_update(
        &self,
        plugins: &[InstalledPlugin],
        themes_only: bool,
    ) -> Result<Vec<PluginDescriptor>, MarketplaceApiError> {
        let updates = self.check_updates(plugins).await?;

        let mut details = Vec::new();
        for update in updates {
            let plugin = self.get_plugin_info(&update.name).await?;
            if plugin.is_theme == themes_only {
                details.push(plugin);
            }
        }

        Ok(details)
    }

    pub async fn search_for_plugins(
        &self,
        keywords: &str,
        query: &str,
        sort: &str,
    ) -> Result<Vec<PluginDescriptor>, MarketplaceApiError> {
        self.search("plugins", keywords, query, sort).await
    }

    pub async fn search_for_themes(
        &self,
        keywords: &str,
        query: &str,
        sort: &str,
    ) -> Result<Vec<PluginDescriptor>, MarketplaceApiError> {
        self.search("themes", keywords, query, sort).await
    }

    async fn search(
        &self,
        action: &str,
        keywords: &str,
        query: &str,
        sort: &str,
    ) -> Result<Vec<PluginDescriptor>, MarketplaceApiError> {
        let search = Query::new(action)
            .param("keywords", keywords)
            .param("query", query)
            .param("sort", sort);

        let mut response = self.fetch(&search).await?;

        match response.get_mut("plugins").map(Value::take) {
            Some(plugins) if is_truthy(&plugins) => decode_as(search.action(), plugins),
            _ => Ok(Vec::new()),
        }
    }

    /// URL of the newest package of `name`
    ///
    /// The newest version is the last one the marketplace lists.
    pub async fn get_download_url(&self, name: &str) -> Result<String, MarketplaceApiError> {
        let plugin = self.get_plugin_info(name).await?;

        let latest = plugin
            .latest_version()
            .ok_or_else(|| MarketplaceApiError::NoVersions {
                name: name.to_string(),
            })?;

        Ok(format!(
            "{}{}?coreVersion={}",
            self.config.base_url, latest.download, self.config.core_version
        ))
    }

    /// Downloads the newest package of `name` to `target`
    ///
    /// Resolving the URL fails like the metadata operations do; a failed
    /// transfer returns `Ok(false)`.
    pub async fn download(&self, name: &str, target: &Path) -> Result<bool, MarketplaceApiError> {
        let url = self.get_download_url(name).await?;

        match self.fetch_remote_file(&url, target).await {
            Ok(()) => {
                info!(%url, target = %target.display(), "downloaded package");
                Ok(true)
            }
            Err(e) => {
                warn!(%url, target = %target.display(), error = %e, "download failed");
                Ok(false)
            }
        }
    }

    async fn fetch_remote_file(&self, url: &str, target: &Path) -> Result<(), TransferError> {
        let response = self.http_client.get(url).send().await?.error_for_status()?;

        let mut file = tokio::fs::File::create(target).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;

        Ok(())
    }
}

/// Body of the `plugins` parameter sent to `plugins/checkUpdates`
#[derive(Serialize)]
struct UpdateCheckRequest<'a> {
    plugins: Vec<&'a InstalledPlugin>,
}

/// Decodes a response body and rejects marketplace-reported errors
fn decode_response(body: &str) -> Result<Value, MarketplaceApiError> {
    let result = match serde_json::from_str::<Value>(body) {
        Ok(Value::Null) | Err(_) => {
            return Err(MarketplaceApiError::InvalidResponse {
                excerpt: body.chars().take(RESPONSE_EXCERPT_CHARS).collect(),
            })
        }
        Ok(value) => value,
    };

    if let Some(error) = result.get("error").filter(|error| is_truthy(error)) {
        let message = match error {
            Value::String(message) => message.clone(),
            other => other.to_string(),
        };
        return Err(MarketplaceApiError::Remote(message));
    }

    Ok(result)
}

fn decode_as<T: DeserializeOwned>(action: &str, value: Value) -> Result<T, MarketplaceApiError> {
    serde_json::from_value(value).map_err(|source| MarketplaceApiError::UnexpectedShape {
        action: action.to_string(),
        source,
    })
}

/// Purges the shared on-disk `marketplace` cache, whatever the age of its entries
///
/// Needs no client. Does nothing when no cache directory can be determined.
pub fn clear_all_cache_entries() -> std::io::Result<()> {
    match FileCache::new(CACHE_NAMESPACE, None) {
        Some(cache) => {
            cache.delete_all()?;
            info!(dir = %cache.dir().display(), "cleared marketplace cache");
            Ok(())
        }
        None => Ok(()),
    }
}

/// Purges a marketplace cache kept in `dir`
pub fn clear_cache_entries_in(dir: &Path) -> std::io::Result<()> {
    FileCache::with_dir(dir.to_path_buf(), None).delete_all()?;
    info!(dir = %dir.display(), "cleared marketplace cache");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::PluginManifest;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> (MarketplaceClient, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::new(Some(Duration::seconds(CACHE_TIMEOUT_SECS))));
        let config = MarketplaceConfig {
            base_url: server.uri(),
            core_version: "2.0.0".to_string(),
            ..Default::default()
        };
        let client = MarketplaceClient::new(config, cache.clone()).expect("Client should build");
        (client, cache)
    }

    async fn mount_info(server: &MockServer, name: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/api/1.0/plugins/{}/info", name)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_config_default() {
        let config = MarketplaceConfig::default();
        assert_eq!(config.base_url, "http://plugins.piwik.org");
        assert_eq!(config.request_timeout, StdDuration::from_secs(30));
        assert_eq!(config.cache_ttl, Duration::seconds(1200));
    }

    #[test]
    fn test_trailing_slash_is_trimmed_from_base_url() {
        let config = MarketplaceConfig {
            base_url: "http://example.test/".to_string(),
            ..Default::default()
        };
        let client = MarketplaceClient::new(config, Arc::new(MemoryCache::new(None))).unwrap();
        assert_eq!(client.config().base_url, "http://example.test");
    }

    #[tokio::test]
    async fn test_fetch_hits_network_once_per_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/1.0/plugins/Foo/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Foo"})))
            .expect(1)
            .mount(&server)
            .await;

        let (client, cache) = test_client(&server);

        let first = client.get_plugin_info("Foo").await.unwrap();
        let second = client.get_plugin_info("Foo").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.name, "Foo");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_permuted_params_are_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/1.0/themes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"plugins": []})))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _cache) = test_client(&server);

        let a = Query::with_params("themes", [("sort", "new"), ("query", "dark")]);
        let b = Query::with_params("themes", [("query", "dark"), ("sort", "new")]);

        assert_eq!(client.fetch(&a).await.unwrap(), client.fetch(&b).await.unwrap());
    }

    #[tokio::test]
    async fn test_remote_error_is_returned_verbatim_and_not_cached() {
        let server = MockServer::start().await;
        mount_info(&server, "Bad", json!({"error": "bad plugin"})).await;

        let (client, cache) = test_client(&server);

        let err = client.get_plugin_info("Bad").await.unwrap_err();

        assert!(matches!(err, MarketplaceApiError::Remote(ref m) if m == "bad plugin"));
        assert!(err.to_string().contains("bad plugin"));
        assert!(cache.is_empty(), "Error responses must not be cached");
    }

    #[tokio::test]
    async fn test_empty_error_field_is_not_a_failure() {
        let server = MockServer::start().await;
        mount_info(&server, "Foo", json!({"name": "Foo", "error": ""})).await;

        let (client, _cache) = test_client(&server);

        assert_eq!(client.get_plugin_info("Foo").await.unwrap().name, "Foo");
    }

    #[tokio::test]
    async fn test_non_json_body_reports_truncated_excerpt() {
        let server = MockServer::start().await;
        let body = format!("<html><body>{}</body></html>", "x".repeat(100));
        Mock::given(method("GET"))
            .and(path("/api/1.0/plugins/Foo/info"))
            .respond_with(ResponseTemplate::new(500).set_body_string(body.clone()))
            .mount(&server)
            .await;

        let (client, cache) = test_client(&server);

        let err = client.get_plugin_info("Foo").await.unwrap_err();
        let message = err.to_string();

        assert!(matches!(err, MarketplaceApiError::InvalidResponse { .. }));
        assert!(message.contains(&body[..50]));
        assert!(!message.contains(&body[..51]));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_multibyte_body_is_truncated_by_characters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/1.0/plugins/Foo/info"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ü".repeat(80)))
            .mount(&server)
            .await;

        let (client, _cache) = test_client(&server);

        match client.get_plugin_info("Foo").await {
            Err(MarketplaceApiError::InvalidResponse { excerpt }) => {
                assert_eq!(excerpt.chars().count(), 50);
            }
            other => panic!("Expected InvalidResponse, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_null_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let (client, _cache) = test_client(&server);

        assert!(matches!(
            client.fetch(&Query::new("plugins")).await,
            Err(MarketplaceApiError::InvalidResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces_as_invalid_response() {
        let config = MarketplaceConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            ..Default::default()
        };
        let client = MarketplaceClient::new(config, Arc::new(MemoryCache::new(None))).unwrap();

        match client.fetch(&Query::new("plugins")).await {
            Err(MarketplaceApiError::InvalidResponse { excerpt }) => assert!(excerpt.is_empty()),
            other => panic!("Expected InvalidResponse, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cache_write_failure_does_not_fail_fetch() {
        struct ReadOnlyCache;

        impl CacheStore for ReadOnlyCache {
            fn get(&self, _key: &str) -> Option<Value> {
                None
            }

            fn set(&self, _key: &str, _value: &Value) -> std::io::Result<()> {
                Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"))
            }

            fn delete_all(&self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let server = MockServer::start().await;
        mount_info(&server, "Foo", json!({"name": "Foo"})).await;

        let config = MarketplaceConfig {
            base_url: server.uri(),
            ..Default::default()
        };
        let client = MarketplaceClient::new(config, Arc::new(ReadOnlyCache)).unwrap();

        assert_eq!(client.get_plugin_info("Foo").await.unwrap().name, "Foo");
    }

    #[tokio::test]
    async fn test_download_url_uses_last_listed_version() {
        let server = MockServer::start().await;
        mount_info(
            &server,
            "foo",
            json!({"name": "foo", "versions": [{"download": "/v1"}, {"download": "/v2"}]}),
        )
        .await;

        let (client, _cache) = test_client(&server);

        let url = client.get_download_url("foo").await.unwrap();

        assert_eq!(url, format!("{}/v2?coreVersion=2.0.0", server.uri()));
    }

    #[tokio::test]
    async fn test_download_url_without_versions_fails() {
        let server = MockServer::start().await;
        mount_info(&server, "bar", json!({"name": "bar", "versions": []})).await;

        let (client, _cache) = test_client(&server);

        let err = client.get_download_url("bar").await.unwrap_err();

        assert!(matches!(err, MarketplaceApiError::NoVersions { ref name } if name == "bar"));
        assert_eq!(err.to_string(), "Plugin has no versions.");
    }

    #[tokio::test]
    async fn test_check_updates_excludes_bundled_plugins() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/1.0/plugins/checkUpdates"))
            .and(query_param(
                "plugins",
                r#"{"plugins":[{"name":"Foo","version":"1.0.0"}]}"#,
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"name": "Foo", "version": "1.1.0"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (client, _cache) = test_client(&server);
        let registry = PluginManifest {
            bundled: ["CoreHome".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let client = client.with_registry(Arc::new(registry));

        let updates = client
            .check_updates(&[
                InstalledPlugin::new("CoreHome", "2.0.0"),
                InstalledPlugin::new("Foo", "1.0.0"),
            ])
            .await
            .unwrap();

        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].name, "Foo");
        assert_eq!(updates[0].extra.get("version"), Some(&json!("1.1.0")));
    }

    #[tokio::test]
    async fn test_check_updates_empty_response_is_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/1.0/plugins/checkUpdates"))
            .respond_with(ResponseTemplate::new(200).set_body_string("false"))
            .mount(&server)
            .await;

        let (client, _cache) = test_client(&server);

        let updates = client
            .check_updates(&[InstalledPlugin::new("Foo", "1.0.0")])
            .await
            .unwrap();

        assert!(updates.is_empty());
    }

    #[tokio::test]
    async fn test_info_of_plugins_having_update_partitions_by_theme_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/1.0/plugins/checkUpdates"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"name": "DarkTheme"}, {"name": "Funnels"}])),
            )
            .mount(&server)
            .await;
        mount_info(&server, "DarkTheme", json!({"name": "DarkTheme", "isTheme": true})).await;
        mount_info(&server, "Funnels", json!({"name": "Funnels"})).await;

        let (client, _cache) = test_client(&server);
        let installed = [
            InstalledPlugin::new("DarkTheme", "1.0.0"),
            InstalledPlugin::new("Funnels", "1.0.0"),
        ];

        let themes = client
            .get_info_of_plugins_having_update(&installed, true)
            .await
            .unwrap();
        let plugins = client
            .get_info_of_plugins_having_update(&installed, false)
            .await
            .unwrap();

        assert_eq!(themes.len(), 1);
        assert_eq!(themes[0].name, "DarkTheme");
        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].name, "Funnels");
    }

    #[tokio::test]
    async fn test_search_for_plugins_returns_plugins_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/1.0/plugins"))
            .and(query_param("keywords", "seo"))
            .and(query_param("query", "rank"))
            .and(query_param("sort", "popular"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "plugins": [{"name": "SeoRank"}, {"name": "Keywords"}],
                "total": 2,
            })))
            .mount(&server)
            .await;

        let (client, _cache) = test_client(&server);

        let results = client.search_for_plugins("seo", "rank", "popular").await.unwrap();

        let names: Vec<_> = results.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["SeoRank", "Keywords"]);
    }

    #[tokio::test]
    async fn test_search_for_themes_without_plugins_field_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/1.0/themes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 0})))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _cache) = test_client(&server);

        assert!(client.search_for_themes("", "", "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_download_writes_latest_package() {
        let server = MockServer::start().await;
        mount_info(
            &server,
            "Foo",
            json!({"name": "Foo", "versions": [{"download": "/download/Foo/1.0"}, {"download": "/download/Foo/2.0"}]}),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/download/Foo/2.0"))
            .and(query_param("coreVersion", "2.0.0"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04zip".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _cache) = test_client(&server);
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("Foo.zip");

        assert!(client.download("Foo", &target).await.unwrap());
        assert_eq!(std::fs::read(&target).unwrap(), b"PK\x03\x04zip");
    }

    #[tokio::test]
    async fn test_download_transfer_failure_returns_false() {
        let server = MockServer::start().await;
        mount_info(
            &server,
            "Foo",
            json!({"name": "Foo", "versions": [{"download": "/download/Foo/missing"}]}),
        )
        .await;

        let (client, _cache) = test_client(&server);
        let temp_dir = TempDir::new().unwrap();

        let ok = client
            .download("Foo", &temp_dir.path().join("Foo.zip"))
            .await
            .unwrap();

        assert!(!ok);
    }

    #[tokio::test]
    async fn test_download_propagates_resolution_failure() {
        let server = MockServer::start().await;
        mount_info(&server, "Empty", json!({"name": "Empty", "versions": []})).await;

        let (client, _cache) = test_client(&server);
        let temp_dir = TempDir::new().unwrap();

        let result = client.download("Empty", &temp_dir.path().join("Empty.zip")).await;

        assert!(matches!(result, Err(MarketplaceApiError::NoVersions { .. })));
    }

    #[test]
    fn test_clear_cache_entries_in_purges_directory() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("marketplace");
        let cache = FileCache::with_dir(dir.clone(), Some(Duration::seconds(CACHE_TIMEOUT_SECS)));
        cache.set("api.1.0.plugins.x", &json!({"name": "x"})).unwrap();

        clear_cache_entries_in(&dir).unwrap();

        assert!(cache.get("api.1.0.plugins.x").is_none());
    }
}
