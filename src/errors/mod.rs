//! Error types for the client.

use std::fmt;
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds for categorizing client errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    // Caller errors
    /// A required argument was null, empty, or malformed.
    InvalidArgument,
    /// An operation was attempted in a state that does not permit it.
    InvalidOperation,
    /// Invalid client configuration.
    InvalidConfiguration,
    /// The pipeline builder was used after `build` had already been called.
    PipelineFrozen,

    // Authentication errors
    /// The server rejected the credentials (HTTP 401).
    Authentication,
    /// Access forbidden (HTTP 403).
    Forbidden,

    // Transport errors
    /// Resource not found (HTTP 404).
    NotFound,
    /// Non-success HTTP response or other wire-level failure.
    Transport,
    /// Request timed out.
    Timeout,
    /// Connection could not be established.
    ConnectionFailed,

    // Response errors
    /// Request or response (de)serialization failed.
    Serialization,

    // Cache errors
    /// A response cache lookup or store failed.
    Cache,

    /// Unknown error.
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid_argument"),
            Self::InvalidOperation => write!(f, "invalid_operation"),
            Self::InvalidConfiguration => write!(f, "invalid_configuration"),
            Self::PipelineFrozen => write!(f, "pipeline_frozen"),
            Self::Authentication => write!(f, "authentication"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::NotFound => write!(f, "not_found"),
            Self::Transport => write!(f, "transport"),
            Self::Timeout => write!(f, "timeout"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Serialization => write!(f, "serialization"),
            Self::Cache => write!(f, "cache"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Client error with status code and body context where available.
#[derive(Error, Debug)]
pub struct Error {
    /// Error kind.
    kind: ErrorKind,
    /// Error message.
    message: String,
    /// HTTP status code.
    status_code: Option<u16>,
    /// Raw response body snippet.
    body: Option<String>,
    /// Underlying cause.
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(code) = self.status_code {
            write!(f, " (HTTP {})", code)?;
        }
        Ok(())
    }
}

impl Error {
    /// Creates a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            body: None,
            cause: None,
        }
    }

    /// Sets the HTTP status code.
    pub fn with_status(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Sets a raw body snippet for diagnostics.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        let body = body.into();
        // Keep error values small even for large response bodies.
        let snippet = if body.len() > 512 {
            let mut end = 512;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body[..end].to_string()
        } else {
            body
        };
        self.body = Some(snippet);
        self
    }

    /// Sets the underlying cause.
    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Gets the error kind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Gets the HTTP status code.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Gets the raw body snippet.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Returns true if this error came from an auth failure (401/403).
    pub fn is_authentication(&self) -> bool {
        matches!(self.kind, ErrorKind::Authentication | ErrorKind::Forbidden)
    }

    /// Creates an error from a non-success HTTP status code.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            401 => ErrorKind::Authentication,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            _ => ErrorKind::Transport,
        };
        Self::new(kind, message).with_status(status)
    }

    // Convenience constructors

    /// Creates an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Creates an invalid-operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidOperation, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidConfiguration, message)
    }

    /// Creates a frozen-pipeline error.
    pub fn frozen(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PipelineFrozen, message)
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    /// Creates a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cache, message)
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }
}
