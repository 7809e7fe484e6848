//! User operations.

use crate::connection::Connection;
use crate::errors::Result;
use crate::types::{UpdateUserRequest, User};

/// Service for user operations.
pub struct UsersService<'a> {
    connection: &'a Connection,
}

impl<'a> UsersService<'a> {
    /// Creates a new users service.
    pub fn new(connection: &'a Connection) -> Self {
        Self { connection }
    }

    /// Gets the authenticated user.
    pub async fn get_authenticated(&self) -> Result<User> {
        self.connection.get("/user").await
    }

    /// Gets a user by username.
    pub async fn get(&self, username: &str) -> Result<User> {
        self.connection.get(&format!("/users/{}", username)).await
    }

    /// Updates the authenticated user.
    pub async fn update(&self, request: &UpdateUserRequest) -> Result<User> {
        self.connection.patch("/user", request).await
    }

    /// Lists followers of a user, following pagination to the end.
    pub async fn list_followers(&self, username: &str) -> Result<Vec<User>> {
        self.connection
            .get_all_pages(&format!("/users/{}/followers", username), Default::default())
            .await
    }
}
