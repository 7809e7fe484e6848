//! Credentials and the per-request authentication middleware.

use crate::envelope::Envelope;
use crate::errors::{Error, Result};
use crate::middleware::Handler;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

/// Kind of authentication a [`Credentials`] value carries.
///
/// Derived from the credentials variant, never stored independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationType {
    /// No authentication.
    Anonymous,
    /// Login/password pair.
    Basic,
    /// OAuth token sent as `Token <token>`.
    Oauth,
    /// Bearer token sent as `Bearer <token>`.
    Bearer,
}

/// Credentials for the API, immutable once constructed.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Unauthenticated access.
    Anonymous,
    /// Login and password.
    Basic {
        /// Account login.
        login: String,
        /// Account password.
        password: SecretString,
    },
    /// OAuth access token.
    Token(SecretString),
    /// Bearer token (JWT or similar).
    Bearer(SecretString),
}

impl Credentials {
    /// Creates basic credentials. Login and password must be non-empty.
    pub fn basic(login: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let login = login.into();
        let password = password.into();
        if login.is_empty() {
            return Err(Error::invalid_argument("login cannot be empty"));
        }
        if password.is_empty() {
            return Err(Error::invalid_argument("password cannot be empty"));
        }
        Ok(Self::Basic {
            login,
            password: SecretString::new(password),
        })
    }

    /// Creates OAuth token credentials.
    pub fn token(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::invalid_argument("token cannot be empty"));
        }
        Ok(Self::Token(SecretString::new(token)))
    }

    /// Creates bearer token credentials.
    pub fn bearer(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::invalid_argument("token cannot be empty"));
        }
        Ok(Self::Bearer(SecretString::new(token)))
    }

    /// The authentication type these credentials imply.
    pub fn auth_type(&self) -> AuthenticationType {
        match self {
            Self::Anonymous => AuthenticationType::Anonymous,
            Self::Basic { .. } => AuthenticationType::Basic,
            Self::Token(_) => AuthenticationType::Oauth,
            Self::Bearer(_) => AuthenticationType::Bearer,
        }
    }

    /// Computes the `Authorization` header value for these credentials.
    ///
    /// `None` for anonymous credentials: the header is left off entirely.
    pub fn header_value(&self) -> Option<String> {
        match self {
            Self::Anonymous => None,
            Self::Basic { login, password } => {
                let pair = format!("{}:{}", login, password.expose_secret());
                Some(format!("Basic {}", BASE64.encode(pair.as_bytes())))
            }
            Self::Token(token) => Some(format!("Token {}", token.expose_secret())),
            Self::Bearer(token) => Some(format!("Bearer {}", token.expose_secret())),
        }
    }
}

/// Supplies credentials for each request.
///
/// Consulted once per request at the authentication step, so a backing
/// store may hand out different credentials between calls (a credential
/// prompt, a token refresh). Implementations must tolerate concurrent
/// reads.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Gets the current credentials.
    async fn get_credentials(&self) -> Result<Credentials>;
}

/// Provider over fixed credentials.
pub struct StaticCredentialProvider {
    credentials: Credentials,
}

impl StaticCredentialProvider {
    /// Creates a provider that always returns the given credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn get_credentials(&self) -> Result<Credentials> {
        Ok(self.credentials.clone())
    }
}

/// Provider reading an OAuth token from an environment variable.
pub struct EnvCredentialProvider {
    token_var: String,
}

impl EnvCredentialProvider {
    /// Creates a provider reading `GITHUB_TOKEN`.
    pub fn from_github_token() -> Self {
        Self {
            token_var: "GITHUB_TOKEN".to_string(),
        }
    }

    /// Creates a provider reading a custom environment variable.
    pub fn from_env_var(var_name: impl Into<String>) -> Self {
        Self {
            token_var: var_name.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn get_credentials(&self) -> Result<Credentials> {
        // Re-read on every request so rotated tokens take effect.
        match std::env::var(&self.token_var) {
            Ok(token) => Credentials::token(token),
            Err(_) => Err(Error::invalid_argument(format!(
                "environment variable {} not set",
                self.token_var
            ))),
        }
    }
}

/// Middleware stamping the `Authorization` header before each request.
///
/// The provider is consulted per request rather than cached at build time.
pub struct AuthHandler {
    provider: Arc<dyn CredentialProvider>,
}

impl AuthHandler {
    /// Creates an authentication handler over the given provider.
    pub fn new(provider: Arc<dyn CredentialProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Handler for AuthHandler {
    async fn before(&self, env: &mut Envelope) -> Result<()> {
        let credentials = self.provider.get_credentials().await?;
        if let Some(value) = credentials.header_value() {
            env.request.headers.insert("Authorization", value);
        }
        Ok(())
    }
}
