//! Repository operations.

use crate::connection::Connection;
use crate::errors::Result;
use crate::pagination::{Page, PaginationParams};
use crate::types::{CreateRepositoryRequest, Repository};

/// Service for repository operations.
pub struct RepositoriesService<'a> {
    connection: &'a Connection,
}

impl<'a> RepositoriesService<'a> {
    /// Creates a new repositories service.
    pub fn new(connection: &'a Connection) -> Self {
        Self { connection }
    }

    /// Gets a repository.
    pub async fn get(&self, owner: &str, repo: &str) -> Result<Repository> {
        self.connection
            .get(&format!("/repos/{}/{}", owner, repo))
            .await
    }

    /// Creates a repository for the authenticated user.
    pub async fn create(&self, request: &CreateRepositoryRequest) -> Result<Repository> {
        self.connection.post("/user/repos", request).await
    }

    /// Deletes a repository.
    pub async fn delete(&self, owner: &str, repo: &str) -> Result<()> {
        self.connection
            .delete(&format!("/repos/{}/{}", owner, repo))
            .await
    }

    /// Lists one page of a user's repositories.
    pub async fn list_for_user_page(
        &self,
        username: &str,
        params: &PaginationParams,
    ) -> Result<Page<Repository>> {
        self.connection
            .get_page(&format!("/users/{}/repos", username), params)
            .await
    }

    /// Lists all of a user's repositories, following pagination to the end.
    pub async fn list_for_user(&self, username: &str) -> Result<Vec<Repository>> {
        self.connection
            .get_all_pages(&format!("/users/{}/repos", username), Default::default())
            .await
    }
}
