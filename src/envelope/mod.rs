//! Request/response envelope flowing through the middleware pipeline.

use crate::api_info::ApiInfo;
use crate::errors::{Error, Result};
use reqwest::Method;
use url::Url;

/// Header map with case-preserving keys and case-insensitive lookup.
///
/// HTTP header names compare case-insensitively on the wire, but the map
/// keeps the casing callers supplied so requests go out exactly as written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a header, overwriting any existing value for the same name
    /// (compared case-insensitively). The new casing is kept.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            *entry = (name, value);
        } else {
            self.entries.push((name, value));
        }
    }

    /// Inserts a header only if no value exists for the name yet.
    ///
    /// Used when copying wire responses, where the first value of a
    /// multi-valued header wins.
    pub fn insert_if_absent(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if self.get(&name).is_none() {
            self.entries.push((name, value.into()));
        }
    }

    /// Looks up a header value by name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if a header with the given name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes a header by name, case-insensitively.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no headers are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Request body, either absent, pre-serialized, or pending serialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// A pre-serialized body, sent on the wire as-is.
    Raw(String),
    /// A JSON value pending serialization by the JSON middleware.
    Json(serde_json::Value),
}

impl Body {
    /// Returns true if there is no body.
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }
}

/// The outgoing half of an envelope.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Base address the endpoint is resolved against.
    pub base_url: Url,
    /// Target endpoint; relative to the base address, or absolute.
    pub endpoint: String,
    /// Request headers.
    pub headers: Headers,
    /// Request body.
    pub body: Body,
}

impl Request {
    /// Creates a new request.
    pub fn new(method: Method, base_url: Url, endpoint: impl Into<String>, body: Body) -> Result<Self> {
        let endpoint = endpoint.into();
        if endpoint.is_empty() {
            return Err(Error::invalid_argument("endpoint cannot be empty"));
        }
        Ok(Self {
            method,
            base_url,
            endpoint,
            headers: Headers::new(),
            body,
        })
    }

    /// Resolves the endpoint against the base address.
    ///
    /// An absolute endpoint (such as a pagination `next` link) replaces the
    /// base address entirely.
    pub fn resolved_url(&self) -> Result<Url> {
        self.base_url.join(&self.endpoint).map_err(|e| {
            Error::invalid_argument(format!(
                "cannot resolve endpoint {:?} against {}: {}",
                self.endpoint, self.base_url, e
            ))
        })
    }
}

/// The incoming half of an envelope, populated by the transport and
/// decorated by the response-side middleware hooks.
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// HTTP status code; 0 until the transport has run.
    pub status: u16,
    /// Raw response body text.
    pub body: String,
    /// Body decoded to JSON by the JSON middleware, if any.
    pub decoded: Option<serde_json::Value>,
    /// Response headers; first value wins for multi-valued headers.
    pub headers: Headers,
    /// Final resolved URL after redirects.
    pub url: Option<Url>,
    /// Parsed API metadata (rate limits, scopes, pagination links).
    pub api_info: ApiInfo,
}

impl Response {
    /// Returns true if the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Paired request/response context for one logical call.
///
/// Created once per call, passed through the whole pipeline by mutable
/// reference, and discarded after the call returns.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// The outgoing request.
    pub request: Request,
    /// The incoming response.
    pub response: Response,
}

impl Envelope {
    /// Creates an envelope around a request with an empty response.
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: Response::default(),
        }
    }
}
