//! Canonical marketplace queries
//!
//! A query is an action path plus parameters. Parameters are kept sorted by
//! name so that the serialized query string, and the cache key derived from
//! it, do not depend on the order a caller supplied them in.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use url::form_urlencoded;

/// An action path and its parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    action: String,
    params: BTreeMap<String, String>,
}

impl Query {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            params: BTreeMap::new(),
        }
    }

    /// Builds a query from parameter pairs given in any order
    pub fn with_params<I, K, V>(action: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        params
            .into_iter()
            .fold(Self::new(action), |query, (k, v)| query.param(k, v))
    }

    /// Adds a parameter, replacing any earlier value with the same name
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Form-encoded parameters in key order, e.g. `keywords=&query=seo&sort=popular`
    pub fn query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.params)
            .finish()
    }

    /// Cache key of the form `api.1.0.<dotted action>.<sha256 of query string>`
    pub fn cache_key(&self) -> String {
        let digest = Sha256::digest(self.query_string().as_bytes());
        format!(
            "api.1.0.{}.{}",
            self.action.replace('/', "."),
            hex::encode(digest)
        )
    }
}
