//! Category tree service.

use shopfront_core::category::{Category, CategoryDraft, CategoryStatus};
use shopfront_core::environment::Clock;
use shopfront_core::error::{DomainError, Result};
use shopfront_core::ids::CategoryId;
use shopfront_core::paging::{Page, PageRequest};
use shopfront_core::providers::{CategoryQuery, CategoryRepository, ParentFilter};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Category tree service.
#[derive(Clone)]
pub struct CategoryService {
    categories: Arc<dyn CategoryRepository>,
    clock: Arc<dyn Clock>,
}

impl CategoryService {
    /// Create a new category service.
    #[must_use]
    pub fn new(categories: Arc<dyn CategoryRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { categories, clock }
    }

    /// Creates an active category.
    ///
    /// # Errors
    ///
    /// Returns a validation error, [`DomainError::CategoryAlreadyExists`] for
    /// a duplicate name, or [`DomainError::CategoryNotFound`] for a missing
    /// parent.
    pub async fn create(&self, draft: CategoryDraft) -> Result<Category> {
        draft.validate()?;
        if self.categories.find_by_name(&draft.name).await?.is_some() {
            return Err(DomainError::CategoryAlreadyExists(draft.name));
        }
        if let Some(parent) = draft.parent_id {
            self.find_by_id(parent).await?;
        }

        let id = self.categories.next_id().await?;
        let category = Category::create(id, draft, self.clock.now());
        self.categories.save(&category).await?;
        tracing::info!(category_id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// Updates name, description and parent.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::CategoryNotFound`] for an unknown category or
    /// parent, [`DomainError::CategoryAlreadyExists`] if the name belongs to
    /// another category, or [`DomainError::InvalidInput`] if the new parent
    /// is the category itself or one of its descendants.
    pub async fn update(&self, id: CategoryId, draft: CategoryDraft) -> Result<Category> {
        draft.validate()?;
        let mut category = self.find_by_id(id).await?;

        if let Some(other) = self.categories.find_by_name(&draft.name).await? {
            if other.id != id {
                return Err(DomainError::CategoryAlreadyExists(draft.name));
            }
        }

        if let Some(parent) = draft.parent_id {
            if parent == id {
                return Err(DomainError::InvalidInput(
                    "a category cannot be its own parent".to_string(),
                ));
            }
            self.find_by_id(parent).await?;
            let descendants = self.find_descendants(id).await?;
            if descendants.iter().any(|descendant| descendant.id == parent) {
                return Err(DomainError::InvalidInput(
                    "a category cannot be moved under its own descendant".to_string(),
                ));
            }
        }

        category.apply(draft, self.clock.now());
        self.categories.save(&category).await?;
        tracing::info!(category_id = %id, "Category updated");
        Ok(category)
    }

    /// Looks up a category.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::CategoryNotFound`] if it does not exist.
    pub async fn find_by_id(&self, id: CategoryId) -> Result<Category> {
        self.categories
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::CategoryNotFound(id.to_string()))
    }

    /// Lists categories matching `query`.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn find_matching(
        &self,
        mut query: CategoryQuery,
        page: PageRequest,
    ) -> Result<Page<Category>> {
        query.keyword = query
            .keyword
            .map(|keyword| keyword.trim().to_string())
            .filter(|keyword| !keyword.is_empty());
        Ok(self.categories.find_matching(&query, page).await?)
    }

    /// Lists all categories.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn find_all(&self, page: PageRequest) -> Result<Page<Category>> {
        self.find_matching(CategoryQuery::default(), page).await
    }

    /// Searches category names. A blank keyword lists everything.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn search(&self, keyword: &str, page: PageRequest) -> Result<Page<Category>> {
        let query = CategoryQuery {
            keyword: Some(keyword.to_string()),
            ..CategoryQuery::default()
        };
        self.find_matching(query, page).await
    }

    /// Lists categories in `status`.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn find_by_status(&self, status: CategoryStatus) -> Result<Vec<Category>> {
        let query = CategoryQuery {
            status: Some(status),
            ..CategoryQuery::default()
        };
        Ok(self.categories.find_all_matching(&query).await?)
    }

    /// Top-level categories.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn find_roots(&self) -> Result<Vec<Category>> {
        let query = CategoryQuery {
            parent: ParentFilter::Root,
            ..CategoryQuery::default()
        };
        Ok(self.categories.find_all_matching(&query).await?)
    }

    /// Direct subcategories of `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::CategoryNotFound`] if `parent` does not exist.
    pub async fn find_children(&self, parent: CategoryId) -> Result<Vec<Category>> {
        self.find_by_id(parent).await?;
        Ok(self
            .categories
            .find_all_matching(&CategoryQuery::children_of(parent))
            .await?)
    }

    /// Every category below `root`, breadth first.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::CategoryNotFound`] if `root` does not exist.
    pub async fn find_descendants(&self, root: CategoryId) -> Result<Vec<Category>> {
        self.find_by_id(root).await?;

        let mut visited = HashSet::from([root]);
        let mut queue = VecDeque::from([root]);
        let mut descendants = Vec::new();

        while let Some(parent) = queue.pop_front() {
            let children = self
                .categories
                .find_all_matching(&CategoryQuery::children_of(parent))
                .await?;
            for child in children {
                if visited.insert(child.id) {
                    queue.push_back(child.id);
                    descendants.push(child);
                }
            }
        }
        Ok(descendants)
    }

    /// Shows a category.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::CategoryNotFound`] if it does not exist.
    pub async fn activate(&self, id: CategoryId) -> Result<Category> {
        self.change_status(id, Category::activate).await
    }

    /// Hides a category.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::CategoryNotFound`] if it does not exist.
    pub async fn deactivate(&self, id: CategoryId) -> Result<Category> {
        self.change_status(id, Category::deactivate).await
    }

    async fn change_status(&self, id: CategoryId, change: fn(&mut Category)) -> Result<Category> {
        let mut category = self.find_by_id(id).await?;
        change(&mut category);
        category.updated_at = self.clock.now();
        self.categories.save(&category).await?;
        tracing::info!(category_id = %id, status = %category.status, "Category status changed");
        Ok(category)
    }

    /// Deletes a leaf category.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::CategoryNotFound`] if it does not exist or
    /// [`DomainError::CategoryHasChildren`] if it still has subcategories.
    pub async fn delete(&self, id: CategoryId) -> Result<()> {
        self.find_by_id(id).await?;
        if self.count_children(id).await? > 0 {
            return Err(DomainError::CategoryHasChildren(id));
        }
        self.categories.delete(id).await?;
        tracing::info!(category_id = %id, "Category deleted");
        Ok(())
    }

    /// Returns true if the category exists.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn exists(&self, id: CategoryId) -> Result<bool> {
        Ok(self.categories.find_by_id(id).await?.is_some())
    }

    /// Number of categories in `status`.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn count_by_status(&self, status: CategoryStatus) -> Result<u64> {
        let query = CategoryQuery {
            status: Some(status),
            ..CategoryQuery::default()
        };
        Ok(self.categories.count_matching(&query).await?)
    }

    /// Number of direct subcategories.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn count_children(&self, parent: CategoryId) -> Result<u64> {
        Ok(self
            .categories
            .count_matching(&CategoryQuery::children_of(parent))
            .await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use shopfront_testing::fixtures::{category_draft, child_category_draft};
    use shopfront_testing::mocks::InMemoryCategoryRepository;
    use shopfront_testing::test_clock;

    fn service() -> CategoryService {
        CategoryService::new(
            Arc::new(InMemoryCategoryRepository::new()),
            Arc::new(test_clock()),
        )
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let service = service();
        service.create(category_draft("Books")).await.unwrap();
        let err = service.create(category_draft("books")).await.unwrap_err();
        assert!(matches!(err, DomainError::CategoryAlreadyExists(_)));
    }

    #[tokio::test]
    async fn missing_parent_is_rejected() {
        let service = service();
        let err = service
            .create(child_category_draft("Novels", CategoryId::new(42)))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CategoryNotFound(_)));
    }

    #[tokio::test]
    async fn tree_queries() {
        let service = service();
        let books = service.create(category_draft("Books")).await.unwrap();
        let fiction = service.create(child_category_draft("Fiction", books.id)).await.unwrap();
        service.create(child_category_draft("Sci-Fi", fiction.id)).await.unwrap();
        service.create(category_draft("Music")).await.unwrap();

        assert_eq!(service.find_roots().await.unwrap().len(), 2);
        assert_eq!(service.find_children(books.id).await.unwrap().len(), 1);
        let descendants = service.find_descendants(books.id).await.unwrap();
        let names: Vec<_> = descendants.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Fiction", "Sci-Fi"]);
    }

    #[tokio::test]
    async fn update_rejects_cycles() {
        let service = service();
        let books = service.create(category_draft("Books")).await.unwrap();
        let fiction = service.create(child_category_draft("Fiction", books.id)).await.unwrap();

        let err = service
            .update(books.id, child_category_draft("Books", books.id))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));

        let err = service
            .update(books.id, child_category_draft("Books", fiction.id))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn delete_requires_leaf() {
        let service = service();
        let books = service.create(category_draft("Books")).await.unwrap();
        let fiction = service.create(child_category_draft("Fiction", books.id)).await.unwrap();

        let err = service.delete(books.id).await.unwrap_err();
        assert_eq!(err, DomainError::CategoryHasChildren(books.id));

        service.delete(fiction.id).await.unwrap();
        service.delete(books.id).await.unwrap();
        assert!(!service.exists(books.id).await.unwrap());
    }

    #[tokio::test]
    async fn status_counts() {
        let service = service();
        let books = service.create(category_draft("Books")).await.unwrap();
        service.create(category_draft("Music")).await.unwrap();
        service.deactivate(books.id).await.unwrap();

        assert_eq!(service.count_by_status(CategoryStatus::Active).await.unwrap(), 1);
        assert_eq!(service.find_by_status(CategoryStatus::Inactive).await.unwrap().len(), 1);
    }
}
