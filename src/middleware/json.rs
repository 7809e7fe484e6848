//! JSON (de)serialization middleware.

use crate::envelope::{Body, Envelope};
use crate::errors::{Error, Result};
use crate::middleware::Handler;
use async_trait::async_trait;
use reqwest::Method;

/// Wire content type requested from and sent to the API.
pub const ACCEPT_JSON: &str = "application/vnd.github+json";

/// Encodes request bodies to wire JSON and decodes response bodies.
///
/// Pre-serialized (`Body::Raw`) request bodies pass through untouched, so
/// callers supplying raw strings are never double-encoded.
#[derive(Debug, Default)]
pub struct JsonHandler;

#[async_trait]
impl Handler for JsonHandler {
    async fn before(&self, env: &mut Envelope) -> Result<()> {
        env.request.headers.insert("Accept", ACCEPT_JSON);

        if env.request.method == Method::GET || env.request.body.is_empty() {
            return Ok(());
        }

        if let Body::Json(value) = &env.request.body {
            let text = serde_json::to_string(value).map_err(|e| {
                Error::serialization(format!("failed to serialize request body: {}", e))
                    .with_cause(e)
            })?;
            env.request.headers.insert("Content-Type", "application/json");
            env.request.body = Body::Raw(text);
        }

        Ok(())
    }

    async fn after(&self, env: &mut Envelope) -> Result<()> {
        if env.response.decoded.is_some() || env.response.body.is_empty() {
            return Ok(());
        }

        let decoded = serde_json::from_str(&env.response.body).map_err(|e| {
            // serde_json's Display includes the line/column of the failure.
            Error::serialization(format!("failed to deserialize response body: {}", e))
                .with_cause(e)
                .with_body(env.response.body.clone())
        })?;
        env.response.decoded = Some(decoded);

        Ok(())
    }
}
