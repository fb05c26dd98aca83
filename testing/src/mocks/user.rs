//! In-memory user repository.

use super::lock;
use async_trait::async_trait;
use shopfront_core::ids::UserId;
use shopfront_core::paging::{Page, PageRequest};
use shopfront_core::providers::{RepositoryResult, UserQuery, UserRepository};
use shopfront_core::user::User;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory user repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<Mutex<HashMap<UserId, User>>>,
    sequence: Arc<AtomicI64>,
}

impl InMemoryUserRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn next_id(&self) -> RepositoryResult<UserId> {
        Ok(UserId::new(self.sequence.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<User>> {
        Ok(lock(&self.users)?.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        Ok(lock(&self.users)?
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn exists_by_email(&self, email: &str) -> RepositoryResult<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    async fn find_matching(
        &self,
        query: &UserQuery,
        page: PageRequest,
    ) -> RepositoryResult<Page<User>> {
        let mut users: Vec<User> = lock(&self.users)?
            .values()
            .filter(|user| query.matches(user))
            .cloned()
            .collect();
        users.sort_by_key(|user| user.id);
        Ok(Page::paginate(users, page))
    }

    async fn save(&self, user: &User) -> RepositoryResult<()> {
        lock(&self.users)?.insert(user.id, user.clone());
        Ok(())
    }
}
