//! Product repository trait.

use super::RepositoryResult;
use crate::ids::{CategoryId, ProductId};
use crate::money::Money;
use crate::paging::{Page, PageRequest};
use crate::product::{Product, ProductStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Filter for product listings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductQuery {
    /// Case-insensitive substring of name or description
    pub keyword: Option<String>,
    /// Only products with this status
    pub status: Option<ProductStatus>,
    /// Only products in this category
    pub category_id: Option<CategoryId>,
    /// Inclusive lower price bound
    pub min_price: Option<Money>,
    /// Inclusive upper price bound
    pub max_price: Option<Money>,
}

impl ProductQuery {
    /// Returns true if `product` passes the filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let keyword_ok = self.keyword.as_deref().is_none_or(|keyword| {
            let keyword = keyword.to_lowercase();
            product.name.to_lowercase().contains(&keyword)
                || product
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&keyword))
        });
        keyword_ok
            && self.status.is_none_or(|status| product.status == status)
            && self
                .category_id
                .is_none_or(|category| product.category_id == Some(category))
            && self.min_price.is_none_or(|min| product.price >= min)
            && self.max_price.is_none_or(|max| product.price <= max)
    }
}

/// Product repository.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Reserve an identifier for a new product.
    ///
    /// # Errors
    ///
    /// Returns error if the sequence cannot be read.
    async fn next_id(&self) -> RepositoryResult<ProductId>;

    /// Get product by ID.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_id(&self, id: ProductId) -> RepositoryResult<Option<Product>>;

    /// Get product by SKU.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_sku(&self, sku: &str) -> RepositoryResult<Option<Product>>;

    /// List products matching `query`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_matching(
        &self,
        query: &ProductQuery,
        page: PageRequest,
    ) -> RepositoryResult<Page<Product>>;

    /// Products with stock at or below `threshold`, lowest stock first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_low_stock(&self, threshold: i32) -> RepositoryResult<Vec<Product>>;

    /// Active products ordered by view count, most viewed first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_popular(&self, limit: u32) -> RepositoryResult<Vec<Product>>;

    /// Count products matching `query`.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn count_matching(&self, query: &ProductQuery) -> RepositoryResult<u64>;

    /// Insert a product, or update the catalog fields of an existing one.
    ///
    /// An update never touches `stock_quantity` or `view_count`; those
    /// change only through [`adjust_stock`](Self::adjust_stock) and
    /// [`increment_view_count`](Self::increment_view_count), so a write
    /// based on a stale read cannot undo a concurrent stock change.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    async fn save(&self, product: &Product) -> RepositoryResult<()>;

    /// Adds `delta` units to stock in a single step and returns the
    /// product as stored afterwards.
    ///
    /// # Errors
    ///
    /// - [`RepositoryError::ProductNotFound`] if no product has this id
    /// - [`RepositoryError::InsufficientStock`] if stock would go below
    ///   zero; nothing is written
    ///
    /// [`RepositoryError::ProductNotFound`]: super::RepositoryError::ProductNotFound
    /// [`RepositoryError::InsufficientStock`]: super::RepositoryError::InsufficientStock
    async fn adjust_stock(
        &self,
        id: ProductId,
        delta: i32,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Product>;

    /// Adds one to the view count in a single step and returns the
    /// product as stored afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::ProductNotFound`] if no product has
    /// this id.
    ///
    /// [`RepositoryError::ProductNotFound`]: super::RepositoryError::ProductNotFound
    async fn increment_view_count(&self, id: ProductId) -> RepositoryResult<Product>;

    /// Delete a product. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    async fn delete(&self, id: ProductId) -> RepositoryResult<bool>;
}
