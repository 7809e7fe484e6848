//! ETag-validated response caching as a transport decorator.

use crate::api_info::ApiInfo;
use crate::envelope::{Envelope, Headers, Request, Response};
use crate::errors::Result;
use crate::middleware::Transport;
use crate::observability::Metrics;
use async_trait::async_trait;
use reqwest::Method;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// Identity of a request for cache purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: String,
    url: String,
    accept: String,
}

impl CacheKey {
    /// Derives the cache key from a request.
    pub fn from_request(request: &Request) -> Result<Self> {
        Ok(Self {
            method: request.method.to_string(),
            url: request.resolved_url()?.to_string(),
            accept: request.headers.get("Accept").unwrap_or_default().to_string(),
        })
    }
}

/// Snapshot of a prior successful GET response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    /// Status code at capture time.
    pub status: u16,
    /// Raw body text.
    pub body: String,
    /// Response headers.
    pub headers: Headers,
    /// Content type, if the response carried one.
    pub content_type: Option<String>,
    /// Body decoded to JSON, captured when the entry is stored so a
    /// replayed entry never goes through the deserializer again.
    pub decoded: Option<serde_json::Value>,
    /// API metadata at capture time.
    pub api_info: ApiInfo,
}

impl CachedResponse {
    /// Captures a snapshot of a response.
    ///
    /// Decodes the body if the response does not already carry a decoded
    /// value; a body that is not JSON is stored with `decoded: None`.
    pub fn from_response(response: &Response) -> Self {
        Self {
            status: response.status,
            body: response.body.clone(),
            headers: response.headers.clone(),
            content_type: response.headers.get("Content-Type").map(String::from),
            decoded: response
                .decoded
                .clone()
                .or_else(|| serde_json::from_str(&response.body).ok()),
            api_info: ApiInfo::from_headers(&response.headers),
        }
    }

    /// The validator ETag of this entry, if it has a non-empty one.
    pub fn etag(&self) -> Option<&str> {
        self.api_info.etag.as_deref().filter(|e| !e.is_empty())
    }

    /// Materializes this entry into a response, decoded body included.
    fn replay(&self, response: &mut Response) {
        response.status = self.status;
        response.body = self.body.clone();
        response.headers = self.headers.clone();
        response.api_info = self.api_info.clone();
        response.decoded = self.decoded.clone();
    }
}

/// Response cache contract.
///
/// Errors are part of the signature rather than panics: the caching
/// decorator treats every cache error as a miss, so a cache outage can
/// never break requests.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Looks up a cached entry.
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedResponse>>;

    /// Stores an entry, replacing any existing one for the key.
    async fn set(&self, key: CacheKey, entry: CachedResponse) -> Result<()>;
}

/// In-memory [`ResponseCache`], safe for concurrent use.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<CacheKey, CachedResponse>>,
}

impl InMemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ResponseCache for InMemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedResponse>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: CacheKey, entry: CachedResponse) -> Result<()> {
        self.entries.write().await.insert(key, entry);
        Ok(())
    }
}

/// Transport decorator serving conditional GETs from a [`ResponseCache`].
///
/// Non-GET requests delegate directly. For GETs with a cached ETag the
/// request goes out with `If-None-Match`; a 304 replays the cached entry
/// and a fresh 2xx replaces it. Only successful GET responses are stored.
pub struct CachingTransport {
    inner: Arc<dyn Transport>,
    cache: Arc<dyn ResponseCache>,
    metrics: Option<Arc<Metrics>>,
}

impl CachingTransport {
    /// Wraps an inner transport with the given cache.
    pub fn new(inner: Arc<dyn Transport>, cache: Arc<dyn ResponseCache>) -> Self {
        Self {
            inner,
            cache,
            metrics: None,
        }
    }

    /// Records cache hits into the given metrics collector.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    async fn store_if_eligible(&self, key: CacheKey, response: &mut Response) {
        if !response.is_success() {
            return;
        }
        let entry = CachedResponse::from_response(response);
        // Hand the decoded body to the response too, so the serializer
        // middleware does not parse the same text a second time.
        if response.decoded.is_none() {
            response.decoded = entry.decoded.clone();
        }
        if let Err(e) = self.cache.set(key, entry).await {
            warn!(error = %e, "response cache store failed");
        }
    }
}

#[async_trait]
impl Transport for CachingTransport {
    async fn send(&self, env: &mut Envelope) -> Result<()> {
        if env.request.method != Method::GET {
            return self.inner.send(env).await;
        }

        let key = match CacheKey::from_request(&env.request) {
            Ok(key) => key,
            // An unresolvable URL will fail identically in the inner
            // transport, with the error the caller should see.
            Err(_) => return self.inner.send(env).await,
        };

        let cached = match self.cache.get(&key).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!(error = %e, "response cache lookup failed");
                None
            }
        };

        let validator = cached.as_ref().and_then(|entry| entry.etag().map(String::from));
        if let (Some(entry), Some(etag)) = (cached, validator) {
            env.request.headers.insert("If-None-Match", etag);

            return match self.inner.send(env).await {
                Err(e) if e.status_code() == Some(304) => {
                    entry.replay(&mut env.response);
                    if let Some(metrics) = &self.metrics {
                        metrics.record_cache_hit();
                    }
                    Ok(())
                }
                Ok(()) => {
                    self.store_if_eligible(key, &mut env.response).await;
                    Ok(())
                }
                Err(e) => Err(e),
            };
        }

        self.inner.send(env).await?;
        self.store_if_eligible(key, &mut env.response).await;
        Ok(())
    }
}

impl std::fmt::Debug for CachingTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingTransport").finish_non_exhaustive()
    }
}
