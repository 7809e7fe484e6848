//! Scripted transport for testing without a network.

use crate::envelope::{Body, Envelope, Headers};
use crate::errors::{Error, Result};
use crate::middleware::Transport;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A canned response the mock transport replays.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: String,
    /// Response headers.
    pub headers: Vec<(String, String)>,
}

impl MockResponse {
    /// Creates a response with the given status and raw body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: Vec::new(),
        }
    }

    /// Creates a 200 response with the given body serialized as JSON.
    pub fn ok<T: Serialize>(body: &T) -> Self {
        Self::new(200, serde_json::to_string(body).unwrap_or_default())
    }

    /// Creates a 204 No Content response.
    pub fn no_content() -> Self {
        Self::new(204, "")
    }

    /// Creates a 304 Not Modified response.
    pub fn not_modified() -> Self {
        Self::new(304, "")
    }

    /// Creates a 404 Not Found response with a GitHub-shaped error body.
    pub fn not_found(message: &str) -> Self {
        Self::new(
            404,
            serde_json::json!({
                "message": message,
                "documentation_url": "https://docs.github.com/rest"
            })
            .to_string(),
        )
    }

    /// Creates a 401 Unauthorized response with a GitHub-shaped error body.
    pub fn unauthorized(message: &str) -> Self {
        Self::new(
            401,
            serde_json::json!({
                "message": message,
                "documentation_url": "https://docs.github.com/rest"
            })
            .to_string(),
        )
    }

    /// Adds a response header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A request the mock transport observed.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: String,
    /// Fully resolved URL.
    pub url: String,
    /// Request headers at send time.
    pub headers: Headers,
    /// Raw body, if one was attached.
    pub body: Option<String>,
}

/// Terminal transport replaying scripted responses in FIFO order and
/// recording every request it sees.
///
/// Mirrors the wire transport's contract: non-2xx responses populate the
/// envelope and then fail with a status-carrying error.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    /// Creates a mock transport with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    pub fn enqueue(&self, response: MockResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// Queues a raw JSON response with the given status.
    pub fn enqueue_json(&self, status: u16, body: &str) {
        self.enqueue(MockResponse::new(status, body));
    }

    /// All requests observed so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests observed so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, env: &mut Envelope) -> Result<()> {
        let url = env.request.resolved_url()?;
        self.requests.lock().unwrap().push(RecordedRequest {
            method: env.request.method.to_string(),
            url: url.to_string(),
            headers: env.request.headers.clone(),
            body: match &env.request.body {
                Body::Raw(text) => Some(text.clone()),
                _ => None,
            },
        });

        let scripted = self.responses.lock().unwrap().pop_front();
        let Some(scripted) = scripted else {
            return Err(Error::invalid_operation(format!(
                "no scripted response for {} {}",
                env.request.method, url
            )));
        };

        env.response.status = scripted.status;
        env.response.url = Some(url);
        env.response.body = scripted.body;
        let mut headers = Headers::new();
        for (name, value) in &scripted.headers {
            headers.insert_if_absent(name.clone(), value.clone());
        }
        env.response.headers = headers;

        if !env.response.is_success() {
            return Err(Error::from_status(
                env.response.status,
                format!("HTTP {} error", env.response.status),
            )
            .with_body(env.response.body.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Request;
    use reqwest::Method;

    fn envelope(endpoint: &str) -> Envelope {
        let base = url::Url::parse("https://api.github.com").unwrap();
        Envelope::new(Request::new(Method::GET, base, endpoint, Body::Empty).unwrap())
    }

    #[tokio::test]
    async fn test_replays_in_fifo_order() {
        let transport = MockTransport::new();
        transport.enqueue_json(200, r#"{"n": 1}"#);
        transport.enqueue_json(200, r#"{"n": 2}"#);

        let mut env = envelope("/a");
        transport.send(&mut env).await.unwrap();
        assert_eq!(env.response.body, r#"{"n": 1}"#);

        let mut env = envelope("/b");
        transport.send(&mut env).await.unwrap();
        assert_eq!(env.response.body, r#"{"n": 2}"#);

        assert_eq!(transport.request_count(), 2);
        assert_eq!(transport.requests()[1].url, "https://api.github.com/b");
    }

    #[tokio::test]
    async fn test_non_success_fails_with_status() {
        let transport = MockTransport::new();
        transport.enqueue(MockResponse::unauthorized("Bad credentials"));

        let mut env = envelope("/user");
        let err = transport.send(&mut env).await.unwrap_err();
        assert_eq!(err.status_code(), Some(401));
        assert!(err.is_authentication());
        assert_eq!(env.response.status, 401);
    }

    #[tokio::test]
    async fn test_exhausted_script_is_an_error() {
        let transport = MockTransport::new();
        let mut env = envelope("/user");
        assert!(transport.send(&mut env).await.is_err());
    }
}
