//! Cache-or-forward request handling
//!
//! Each dispatch looks the message up in the cache, forwards misses to the
//! upstream API and stores successful responses. Failed upstream calls are
//! returned as errors and never cached.

use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheKey, CacheStore};
use crate::config::ProxyConfig;
use crate::upstream::{UpstreamClient, UpstreamError};

/// Where a dispatched response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Served from a fresh cache entry, no network call made
    Cache,
    /// Fetched from the upstream API during this dispatch
    Upstream,
}

/// A successful dispatch result
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    /// The upstream response body
    pub body: Value,
    /// Whether the body was cached or freshly fetched
    pub source: ResponseSource,
}

/// Decides per message whether to answer from cache or upstream
///
/// Cloning is cheap; clones share the connection pool and cache directory,
/// so one dispatcher can serve many concurrent tasks.
#[derive(Debug, Clone)]
pub struct RequestDispatcher {
    cache: CacheStore,
    upstream: UpstreamClient,
    cache_enabled: bool,
}

impl RequestDispatcher {
    /// Creates a dispatcher from its collaborators
    pub fn new(config: &ProxyConfig, cache: CacheStore, upstream: UpstreamClient) -> Self {
        Self {
            cache,
            upstream,
            cache_enabled: config.cache_enabled,
        }
    }

    /// Builds the cache store and upstream client from configuration
    pub fn from_config(
        config: &ProxyConfig,
        cache_dir: impl Into<PathBuf>,
    ) -> Result<Self, UpstreamError> {
        let cache = CacheStore::new(cache_dir, config.ttl_seconds);
        let upstream = UpstreamClient::from_config(config)?;
        Ok(Self::new(config, cache, upstream))
    }

    /// The underlying cache store
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Whether this dispatcher reads and writes the cache
    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    /// Handles one message
    ///
    /// # Returns
    /// * `Ok(Dispatched)` - A cached or freshly fetched response
    /// * `Err(UpstreamError)` - The upstream call failed; nothing was cached
    ///
    /// No retries are attempted.
    pub async fn dispatch(&self, message: &str) -> Result<Dispatched, UpstreamError> {
        let key = CacheKey::from_message(message);

        if self.cache_enabled {
            if let Some(body) = self.cache.get(&key) {
                debug!(key = %key.log_id(), "cache hit");
                return Ok(Dispatched {
                    body,
                    source: ResponseSource::Cache,
                });
            }
            debug!(key = %key.log_id(), "cache miss");
        }

        info!(
            key = %key.log_id(),
            endpoint = %self.upstream.endpoint(),
            "forwarding request upstream"
        );
        let body = match self.upstream.send(message).await {
            Ok(body) => body,
            Err(e) => {
                error!(key = %key.log_id(), error = %e, "upstream request failed");
                return Err(e);
            }
        };

        if self.cache_enabled {
            if let Err(e) = self.cache.set(&key, &body) {
                warn!(key = %key.log_id(), error = %e, "failed to cache response");
            }
        }

        Ok(Dispatched {
            body,
            source: ResponseSource::Upstream,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_config(base_url: &str, cache_enabled: bool) -> ProxyConfig {
        ProxyConfig {
            api_key: "test-key".to_string(),
            base_url: base_url.to_string(),
            cache_enabled,
            ..ProxyConfig::default()
        }
    }

    #[test]
    fn test_from_config_uses_cache_flag_and_dir() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = test_config("https://api.example.com", false);

        let dispatcher =
            RequestDispatcher::from_config(&config, temp_dir.path()).expect("should build");

        assert!(!dispatcher.cache_enabled());
        assert_eq!(dispatcher.cache().dir(), temp_dir.path());
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"pong"}]}"#)
            .expect(1)
            .create_async()
            .await;
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dispatcher =
            RequestDispatcher::from_config(&test_config(&server.url(), true), temp_dir.path())
                .expect("should build");

        let first = dispatcher.dispatch("ping").await.expect("first dispatch");
        let second = dispatcher.dispatch("ping").await.expect("second dispatch");

        mock.assert_async().await;
        assert_eq!(first.source, ResponseSource::Upstream);
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(first.body, second.body);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(500)
            .with_body("upstream exploded")
            .create_async()
            .await;
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dispatcher =
            RequestDispatcher::from_config(&test_config(&server.url(), true), temp_dir.path())
                .expect("should build");

        let result = dispatcher.dispatch("ping").await;

        assert!(matches!(result, Err(UpstreamError::Status { .. })));
        assert!(dispatcher.cache().get(&CacheKey::from_message("ping")).is_none());
        assert!(!dispatcher.cache().path_for(&CacheKey::from_message("ping")).exists());
    }

    #[tokio::test]
    async fn test_cache_write_failure_still_returns_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").expect("write");
        let dispatcher =
            RequestDispatcher::from_config(&test_config(&server.url(), true), blocker)
                .expect("should build");

        let result = dispatcher.dispatch("hello").await.expect("dispatch should succeed");

        assert_eq!(result.body, json!({"ok": true}));
        assert_eq!(result.source, ResponseSource::Upstream);
    }
}
