//! Thin per-resource endpoint clients.
//!
//! Each service drives [`Connection`](crate::connection::Connection) with a
//! resource-specific URI and response type; none touches the middleware
//! chain or the transport directly.

mod repositories;
mod users;

pub use repositories::RepositoriesService;
pub use users::UsersService;
