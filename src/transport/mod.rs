//! Terminal transport adapter over `reqwest`.

use crate::config::Config;
use crate::envelope::{Body, Envelope, Headers};
use crate::errors::{Error, ErrorKind, Result};
use crate::middleware::Transport;
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use tracing::debug;

/// GitHub error response format.
#[derive(Debug, serde::Deserialize)]
struct WireErrorBody {
    message: String,
}

/// Terminal pipeline stage performing the wire HTTP call.
///
/// Timeouts apply per physical network call. Cancellation is by dropping
/// the call future, which aborts the in-flight request.
pub struct HttpTransport {
    client: Client,
    user_agent: String,
    api_version: String,
}

impl HttpTransport {
    /// Creates a transport from the client configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool.max_idle_per_host)
            .pool_idle_timeout(config.pool.idle_timeout)
            .build()
            .map_err(|e| {
                Error::configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            api_version: config.api_version.clone(),
        })
    }

    fn classify_send_error(e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(format!("request timed out: {}", e)).with_cause(e)
        } else if e.is_connect() {
            Error::new(
                ErrorKind::ConnectionFailed,
                format!("connection failed: {}", e),
            )
            .with_cause(e)
        } else {
            Error::new(ErrorKind::Transport, format!("request failed: {}", e)).with_cause(e)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, env: &mut Envelope) -> Result<()> {
        let url = env.request.resolved_url()?;
        debug!(method = %env.request.method, url = %url, "sending request");

        let mut request = self
            .client
            .request(env.request.method.clone(), url)
            .header(USER_AGENT, &self.user_agent)
            .header("X-GitHub-Api-Version", &self.api_version);

        for (name, value) in env.request.headers.iter() {
            request = request.header(name, value);
        }

        // Only string-typed bodies go on the wire; pending-JSON bodies are
        // the serializer middleware's responsibility.
        if let Body::Raw(text) = &env.request.body {
            request = request.body(text.clone());
        }

        let response = request.send().await.map_err(Self::classify_send_error)?;

        let status = response.status();
        env.response.status = status.as_u16();
        env.response.url = Some(response.url().clone());

        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert_if_absent(name.as_str(), value);
            }
        }
        env.response.headers = headers;

        env.response.body = response
            .text()
            .await
            .map_err(|e| {
                Error::new(
                    ErrorKind::Transport,
                    format!("failed to read response body: {}", e),
                )
                .with_cause(e)
            })?;

        debug!(status = env.response.status, bytes = env.response.body.len(), "received response");

        if !status.is_success() {
            let message = serde_json::from_str::<WireErrorBody>(&env.response.body)
                .map(|e| e.message)
                .unwrap_or_else(|_| format!("HTTP {} error", status.as_u16()));
            return Err(Error::from_status(status.as_u16(), message)
                .with_body(env.response.body.clone()));
        }

        Ok(())
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("user_agent", &self.user_agent)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}
