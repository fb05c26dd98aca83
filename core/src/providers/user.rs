//! User repository trait.

use super::RepositoryResult;
use crate::ids::UserId;
use crate::paging::{Page, PageRequest};
use crate::user::{Role, User, UserStatus};
use async_trait::async_trait;

/// Filter for user listings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserQuery {
    /// Only users with this role
    pub role: Option<Role>,
    /// Only users with this status
    pub status: Option<UserStatus>,
}

impl UserQuery {
    /// Returns true if `user` passes the filter.
    #[must_use]
    pub fn matches(&self, user: &User) -> bool {
        self.role.is_none_or(|role| user.role == role)
            && self.status.is_none_or(|status| user.status == status)
    }
}

/// User repository.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Reserve an identifier for a new user.
    ///
    /// # Errors
    ///
    /// Returns error if the sequence cannot be read.
    async fn next_id(&self) -> RepositoryResult<UserId>;

    /// Get user by ID.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<User>>;

    /// Get user by email (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    /// Check if email exists.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn exists_by_email(&self, email: &str) -> RepositoryResult<bool>;

    /// List users matching `query`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_matching(&self, query: &UserQuery, page: PageRequest)
    -> RepositoryResult<Page<User>>;

    /// Insert or update a user.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    async fn save(&self, user: &User) -> RepositoryResult<()>;
}
