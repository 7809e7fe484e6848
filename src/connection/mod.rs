//! The connection façade owning the middleware stack.

use crate::api_info::{ApiInfo, ApiInfoHandler};
use crate::auth::{AuthHandler, CredentialProvider, Credentials, StaticCredentialProvider};
use crate::cache::{CachingTransport, ResponseCache};
use crate::config::{Config, ConfigBuilder};
use crate::envelope::{Body, Envelope, Request, Response};
use crate::errors::{Error, Result};
use crate::middleware::{Handler, JsonHandler, Pipeline, PipelineBuilder, Transport};
use crate::observability::Metrics;
use crate::pagination::{endpoint_with_query, Page, PageCursor, PaginationParams};
use crate::transport::HttpTransport;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex, OnceLock};
use url::Url;

/// A typed response body together with its parsed API metadata.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    /// The decoded body.
    pub body: T,
    /// Metadata parsed from the response headers.
    pub api_info: ApiInfo,
}

type HandlerStackFn = dyn Fn() -> Vec<Arc<dyn Handler>> + Send + Sync;

/// Façade over the middleware pipeline.
///
/// Issues GET/POST/PATCH/DELETE calls and returns typed responses. The
/// pipeline is built lazily exactly once per connection; after the first
/// call it is fixed for the connection's lifetime. Distinct calls use
/// distinct envelopes and are safe to run concurrently.
pub struct Connection {
    config: Config,
    base_url: Url,
    provider: Arc<dyn CredentialProvider>,
    cache: Option<Arc<dyn ResponseCache>>,
    transport_override: Option<Arc<dyn Transport>>,
    custom_stack: Mutex<Option<Box<HandlerStackFn>>>,
    pipeline: OnceLock<Arc<Pipeline>>,
    metrics: Arc<Metrics>,
}

impl Connection {
    /// Creates an anonymous connection. Fails fast on invalid configuration.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_provider(config, Arc::new(StaticCredentialProvider::new(Credentials::Anonymous)))
    }

    /// Creates a connection with fixed credentials.
    pub fn with_credentials(config: Config, credentials: Credentials) -> Result<Self> {
        Self::with_provider(config, Arc::new(StaticCredentialProvider::new(credentials)))
    }

    /// Creates a connection over a credential provider consulted per request.
    pub fn with_provider(config: Config, provider: Arc<dyn CredentialProvider>) -> Result<Self> {
        config.validate()?;
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::invalid_argument(format!("invalid base URL: {}", e)))?;

        Ok(Self {
            config,
            base_url,
            provider,
            cache: None,
            transport_override: None,
            custom_stack: Mutex::new(None),
            pipeline: OnceLock::new(),
            metrics: Arc::new(Metrics::new()),
        })
    }

    /// Creates a new connection builder.
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    /// Attaches a response cache, enabling ETag-conditional GETs.
    ///
    /// Must be called before the first request.
    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replaces the default handler stack with a custom one.
    ///
    /// Fails once the pipeline has been built: the stack is fixed after the
    /// first request for the connection's lifetime.
    pub fn set_handler_stack(
        &self,
        stack: impl Fn() -> Vec<Arc<dyn Handler>> + Send + Sync + 'static,
    ) -> Result<()> {
        // The stack lock also serializes the first pipeline build, so an
        // accepted stack is always the one the pipeline is built from.
        let mut custom = self.custom_stack.lock().unwrap();
        if self.pipeline.get().is_some() {
            return Err(Error::invalid_operation(
                "pipeline already built; the handler stack is fixed",
            ));
        }
        *custom = Some(Box::new(stack));
        Ok(())
    }

    /// Gets the connection's metrics collector.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Gets the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    // Service accessors

    /// Gets the users service.
    pub fn users(&self) -> crate::services::UsersService<'_> {
        crate::services::UsersService::new(self)
    }

    /// Gets the repositories service.
    pub fn repositories(&self) -> crate::services::RepositoriesService<'_> {
        crate::services::RepositoriesService::new(self)
    }

    // HTTP methods

    /// Makes a GET request, decoding the response body.
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let response = self.call(Method::GET, endpoint, Body::Empty).await?;
        Self::decode(response)
    }

    /// Makes a GET request, returning the body plus API metadata.
    pub async fn get_with_info<T: DeserializeOwned>(&self, endpoint: &str) -> Result<ApiResponse<T>> {
        let mut response = self.call(Method::GET, endpoint, Body::Empty).await?;
        let api_info = std::mem::take(&mut response.api_info);
        Ok(ApiResponse {
            body: Self::decode(response)?,
            api_info,
        })
    }

    /// Makes a POST request.
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, endpoint: &str, body: &B) -> Result<T> {
        let response = self.call(Method::POST, endpoint, Self::json_body(body)?).await?;
        Self::decode(response)
    }

    /// Makes a POST request, discarding any response body.
    pub async fn post_no_response<B: Serialize>(&self, endpoint: &str, body: &B) -> Result<()> {
        self.call(Method::POST, endpoint, Self::json_body(body)?).await?;
        Ok(())
    }

    /// Makes a PATCH request.
    pub async fn patch<T: DeserializeOwned, B: Serialize>(&self, endpoint: &str, body: &B) -> Result<T> {
        let response = self.call(Method::PATCH, endpoint, Self::json_body(body)?).await?;
        Self::decode(response)
    }

    /// Makes a DELETE request.
    pub async fn delete(&self, endpoint: &str) -> Result<()> {
        self.call(Method::DELETE, endpoint, Body::Empty).await?;
        Ok(())
    }

    // Pagination

    /// Fetches one page of a list endpoint.
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &PaginationParams,
    ) -> Result<Page<T>> {
        let endpoint = endpoint_with_query(endpoint, &params.to_query());
        self.fetch_page(&endpoint).await
    }

    /// Returns a lazy cursor over all pages of a list endpoint.
    pub fn pages<'a, T: DeserializeOwned>(
        &'a self,
        endpoint: &str,
        params: PaginationParams,
    ) -> PageCursor<'a, T> {
        PageCursor::new(self, endpoint, params)
    }

    /// Follows `next` links until exhausted and concatenates all items,
    /// first page's items first, fetching strictly sequentially.
    pub async fn get_all_pages<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: PaginationParams,
    ) -> Result<Vec<T>> {
        self.pages(endpoint, params).collect_all().await
    }

    /// Fetches a page from an endpoint or an absolute pagination link.
    pub(crate) async fn fetch_page<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Page<T>> {
        let mut response = self.call(Method::GET, endpoint, Body::Empty).await?;
        let api_info = std::mem::take(&mut response.api_info);
        let items: Vec<T> = Self::decode(response)?;
        Ok(Page::new(items, api_info))
    }

    // Internal

    async fn call(&self, method: Method, endpoint: &str, body: Body) -> Result<Response> {
        let pipeline = self.built_pipeline()?;
        let request = Request::new(method, self.base_url.clone(), endpoint, body)?;
        let mut env = Envelope::new(request);

        self.metrics.record_request();
        match pipeline.invoke(&mut env).await {
            Ok(()) => {
                self.metrics.record_success();
                Ok(env.response)
            }
            Err(e) => {
                self.metrics.record_failure();
                Err(e)
            }
        }
    }

    fn built_pipeline(&self) -> Result<Arc<Pipeline>> {
        if let Some(pipeline) = self.pipeline.get() {
            return Ok(pipeline.clone());
        }
        // Build under the stack lock and re-check, so a concurrent
        // `set_handler_stack` either lands before this build or fails.
        let custom = self.custom_stack.lock().unwrap();
        if let Some(pipeline) = self.pipeline.get() {
            return Ok(pipeline.clone());
        }
        let pipeline = Arc::new(self.build_pipeline(custom.as_deref())?);
        Ok(self.pipeline.get_or_init(|| pipeline).clone())
    }

    fn build_pipeline(&self, custom: Option<&HandlerStackFn>) -> Result<Pipeline> {
        let handlers = match custom {
            Some(stack) => stack(),
            None => vec![
                Arc::new(AuthHandler::new(self.provider.clone())) as Arc<dyn Handler>,
                Arc::new(JsonHandler) as Arc<dyn Handler>,
                Arc::new(ApiInfoHandler) as Arc<dyn Handler>,
            ],
        };

        let mut builder = PipelineBuilder::new();
        for handler in handlers {
            builder.with(handler)?;
        }

        let transport: Arc<dyn Transport> = match &self.transport_override {
            Some(transport) => transport.clone(),
            None => Arc::new(HttpTransport::new(&self.config)?),
        };
        let transport: Arc<dyn Transport> = match &self.cache {
            Some(cache) => Arc::new(
                CachingTransport::new(transport, cache.clone()).with_metrics(self.metrics.clone()),
            ),
            None => transport,
        };

        builder.build(transport)
    }

    fn json_body<B: Serialize>(body: &B) -> Result<Body> {
        let value = serde_json::to_value(body).map_err(|e| {
            Error::serialization(format!("failed to serialize request body: {}", e)).with_cause(e)
        })?;
        Ok(Body::Json(value))
    }

    fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let value = response
            .decoded
            .ok_or_else(|| Error::serialization("response body was empty"))?;
        serde_json::from_value(value).map_err(|e| {
            Error::serialization(format!("response did not match the expected type: {}", e))
                .with_cause(e)
        })
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Connection`].
pub struct ConnectionBuilder {
    config_builder: ConfigBuilder,
    provider: Option<Arc<dyn CredentialProvider>>,
    cache: Option<Arc<dyn ResponseCache>>,
    transport: Option<Arc<dyn Transport>>,
}

impl ConnectionBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            config_builder: Config::builder(),
            provider: None,
            cache: None,
            transport: None,
        }
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.base_url(url);
        self
    }

    /// Sets the User-Agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.user_agent(ua);
        self
    }

    /// Sets the per-call timeout.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Sets fixed credentials.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.provider = Some(Arc::new(StaticCredentialProvider::new(credentials)));
        self
    }

    /// Sets a credential provider consulted per request.
    pub fn credential_provider(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Attaches a response cache.
    pub fn cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replaces the wire transport. Mainly for tests.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the connection.
    pub fn build(self) -> Result<Connection> {
        let config = self.config_builder.build()?;
        let provider = self
            .provider
            .unwrap_or_else(|| Arc::new(StaticCredentialProvider::new(Credentials::Anonymous)));

        let mut connection = Connection::with_provider(config, provider)?;
        connection.cache = self.cache;
        connection.transport_override = self.transport;
        Ok(connection)
    }
}

impl Default for ConnectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
