//! Minimal data models used by the bundled endpoint clients.

use serde::{Deserialize, Serialize};

/// GitHub user (minimal representation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: u64,
    /// Username (login).
    pub login: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// User type (User, Organization, Bot).
    #[serde(rename = "type", default)]
    pub user_type: Option<String>,
    /// Profile URL.
    #[serde(default)]
    pub html_url: Option<String>,
}

/// GitHub repository (minimal representation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    /// Repository ID.
    pub id: u64,
    /// Repository name.
    pub name: String,
    /// Full name (owner/repo).
    pub full_name: String,
    /// Whether the repository is private.
    pub private: bool,
    /// Repository description.
    #[serde(default)]
    pub description: Option<String>,
    /// Default branch.
    #[serde(default)]
    pub default_branch: Option<String>,
    /// Stargazer count.
    #[serde(default)]
    pub stargazers_count: u32,
    /// Fork count.
    #[serde(default)]
    pub forks_count: u32,
}

/// Request body for updating the authenticated user.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateUserRequest {
    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New biography.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// New company.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// Request body for creating a repository.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRepositoryRequest {
    /// Repository name.
    pub name: String,
    /// Repository description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the repository should be private.
    pub private: bool,
}
