//! Category repository trait.

use super::RepositoryResult;
use crate::category::{Category, CategoryStatus};
use crate::ids::CategoryId;
use crate::paging::{Page, PageRequest};
use async_trait::async_trait;

/// Constraint on a category's parent.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ParentFilter {
    /// Any parent or none
    #[default]
    Any,
    /// Root categories only
    Root,
    /// Direct children of the given category
    Of(CategoryId),
}

/// Filter for category listings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryQuery {
    /// Case-insensitive substring of the name
    pub keyword: Option<String>,
    /// Only categories with this status
    pub status: Option<CategoryStatus>,
    /// Parent constraint
    pub parent: ParentFilter,
}

impl CategoryQuery {
    /// Direct children of `parent`.
    #[must_use]
    pub fn children_of(parent: CategoryId) -> Self {
        Self {
            parent: ParentFilter::Of(parent),
            ..Self::default()
        }
    }

    /// Returns true if `category` passes the filter.
    #[must_use]
    pub fn matches(&self, category: &Category) -> bool {
        let parent_ok = match self.parent {
            ParentFilter::Any => true,
            ParentFilter::Root => category.parent_id.is_none(),
            ParentFilter::Of(parent) => category.parent_id == Some(parent),
        };
        parent_ok
            && self.status.is_none_or(|status| category.status == status)
            && self.keyword.as_deref().is_none_or(|keyword| {
                category.name.to_lowercase().contains(&keyword.to_lowercase())
            })
    }
}

/// Category repository.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Reserve an identifier for a new category.
    ///
    /// # Errors
    ///
    /// Returns error if the sequence cannot be read.
    async fn next_id(&self) -> RepositoryResult<CategoryId>;

    /// Get category by ID.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_id(&self, id: CategoryId) -> RepositoryResult<Option<Category>>;

    /// Get category by exact name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Category>>;

    /// List categories matching `query`, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_matching(
        &self,
        query: &CategoryQuery,
        page: PageRequest,
    ) -> RepositoryResult<Page<Category>>;

    /// All categories matching `query`, ordered by name, without paging.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_all_matching(&self, query: &CategoryQuery) -> RepositoryResult<Vec<Category>>;

    /// Count categories matching `query`.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn count_matching(&self, query: &CategoryQuery) -> RepositoryResult<u64>;

    /// Insert or update a category.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    async fn save(&self, category: &Category) -> RepositoryResult<()>;

    /// Delete a category. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    async fn delete(&self, id: CategoryId) -> RepositoryResult<bool>;
}
