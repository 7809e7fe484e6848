//! # octorest
//!
//! A GitHub REST API client core built around a composable middleware
//! pipeline:
//! - Tagged-union credentials (anonymous, basic, token, bearer) stamped
//!   per request via a pluggable credential provider
//! - An ordered handler chain (auth, JSON codec, API metadata) around a
//!   terminal `reqwest` transport, frozen once built
//! - Rate-limit / OAuth-scope / ETag / `Link` header parsing into a
//!   structured [`ApiInfo`] side channel
//! - Auto-pagination following `Link` relations, lazily or materialized
//! - Optional ETag-conditional response caching as a transport decorator
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use octorest::{Connection, Credentials};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connection = Connection::builder()
//!         .credentials(Credentials::token("ghp_xxxxxxxxxxxx")?)
//!         .build()?;
//!
//!     let repos = connection.repositories().list_for_user("octocat").await?;
//!     for repo in repos {
//!         println!("{}", repo.full_name);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;
pub mod types;

// Authentication
pub mod auth;

// Request/response envelope
pub mod envelope;

// Middleware pipeline
pub mod middleware;

// Response metadata
pub mod api_info;

// Wire transport
pub mod transport;

// Response caching
pub mod cache;

// Connection façade
pub mod connection;

// Pagination handling
pub mod pagination;

// API services
pub mod services;

// Observability
pub mod observability;

// Mocks for testing
pub mod mocks;

// Re-exports for convenience
pub use api_info::{ApiInfo, Links, RateLimit};
pub use auth::{AuthenticationType, CredentialProvider, Credentials};
pub use cache::{CachingTransport, InMemoryCache, ResponseCache};
pub use config::{Config, ConfigBuilder};
pub use connection::{ApiResponse, Connection, ConnectionBuilder};
pub use envelope::{Body, Envelope, Headers, Request, Response};
pub use errors::{Error, ErrorKind, Result};
pub use middleware::{Handler, JsonHandler, Pipeline, PipelineBuilder, Transport};
pub use pagination::{Page, PageCursor, PaginationParams};
