//! In-memory category repository.

use super::lock;
use async_trait::async_trait;
use shopfront_core::category::Category;
use shopfront_core::ids::CategoryId;
use shopfront_core::paging::{Page, PageRequest};
use shopfront_core::providers::{CategoryQuery, CategoryRepository, RepositoryResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory category repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCategoryRepository {
    categories: Arc<Mutex<HashMap<CategoryId, Category>>>,
    sequence: Arc<AtomicI64>,
}

impl InMemoryCategoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn next_id(&self) -> RepositoryResult<CategoryId> {
        Ok(CategoryId::new(self.sequence.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn find_by_id(&self, id: CategoryId) -> RepositoryResult<Option<Category>> {
        Ok(lock(&self.categories)?.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Category>> {
        Ok(lock(&self.categories)?
            .values()
            .find(|category| category.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn find_matching(
        &self,
        query: &CategoryQuery,
        page: PageRequest,
    ) -> RepositoryResult<Page<Category>> {
        Ok(Page::paginate(self.find_all_matching(query).await?, page))
    }

    async fn find_all_matching(&self, query: &CategoryQuery) -> RepositoryResult<Vec<Category>> {
        let mut categories: Vec<Category> = lock(&self.categories)?
            .values()
            .filter(|category| query.matches(category))
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn count_matching(&self, query: &CategoryQuery) -> RepositoryResult<u64> {
        Ok(lock(&self.categories)?
            .values()
            .filter(|category| query.matches(category))
            .count() as u64)
    }

    async fn save(&self, category: &Category) -> RepositoryResult<()> {
        lock(&self.categories)?.insert(category.id, category.clone());
        Ok(())
    }

    async fn delete(&self, id: CategoryId) -> RepositoryResult<bool> {
        Ok(lock(&self.categories)?.remove(&id).is_some())
    }
}
