//! In-memory product repository.

use super::lock;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shopfront_core::error::DomainError;
use shopfront_core::ids::ProductId;
use shopfront_core::paging::{Page, PageRequest};
use shopfront_core::product::{Product, ProductStatus};
use shopfront_core::providers::{
    ProductQuery, ProductRepository, RepositoryError, RepositoryResult,
};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory product repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductRepository {
    pub(super) products: Arc<Mutex<HashMap<ProductId, Product>>>,
    sequence: Arc<AtomicI64>,
}

impl InMemoryProductRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn filtered(&self, query: &ProductQuery) -> RepositoryResult<Vec<Product>> {
        let mut products: Vec<Product> = lock(&self.products)?
            .values()
            .filter(|product| query.matches(product))
            .cloned()
            .collect();
        products.sort_by_key(|product| product.id);
        Ok(products)
    }
}

/// Applies a stock change to a stored product, translating the domain
/// rejection into the repository's.
pub(super) fn apply_stock_delta(
    product: &mut Product,
    delta: i32,
    at: DateTime<Utc>,
) -> RepositoryResult<()> {
    product.update_stock(delta).map_err(|error| match error {
        DomainError::InsufficientStock {
            product_id,
            requested,
            available,
        } => RepositoryError::InsufficientStock {
            product_id,
            requested,
            available,
        },
        other => RepositoryError::Internal(other.to_string()),
    })?;
    product.updated_at = at;
    Ok(())
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn next_id(&self) -> RepositoryResult<ProductId> {
        Ok(ProductId::new(self.sequence.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn find_by_id(&self, id: ProductId) -> RepositoryResult<Option<Product>> {
        Ok(lock(&self.products)?.get(&id).cloned())
    }

    async fn find_by_sku(&self, sku: &str) -> RepositoryResult<Option<Product>> {
        Ok(lock(&self.products)?
            .values()
            .find(|product| product.sku == sku)
            .cloned())
    }

    async fn find_matching(
        &self,
        query: &ProductQuery,
        page: PageRequest,
    ) -> RepositoryResult<Page<Product>> {
        Ok(Page::paginate(self.filtered(query)?, page))
    }

    async fn find_low_stock(&self, threshold: i32) -> RepositoryResult<Vec<Product>> {
        let mut products: Vec<Product> = lock(&self.products)?
            .values()
            .filter(|product| product.is_low_stock(threshold))
            .cloned()
            .collect();
        products.sort_by_key(|product| (product.stock_quantity, product.id));
        Ok(products)
    }

    async fn find_popular(&self, limit: u32) -> RepositoryResult<Vec<Product>> {
        let mut products: Vec<Product> = lock(&self.products)?
            .values()
            .filter(|product| product.status == ProductStatus::Active)
            .cloned()
            .collect();
        products.sort_by_key(|product| (Reverse(product.view_count), product.id));
        products.truncate(limit as usize);
        Ok(products)
    }

    async fn count_matching(&self, query: &ProductQuery) -> RepositoryResult<u64> {
        Ok(self.filtered(query)?.len() as u64)
    }

    async fn save(&self, product: &Product) -> RepositoryResult<()> {
        let mut products = lock(&self.products)?;
        let mut stored = product.clone();
        if let Some(existing) = products.get(&product.id) {
            stored.stock_quantity = existing.stock_quantity;
            stored.view_count = existing.view_count;
        }
        products.insert(product.id, stored);
        Ok(())
    }

    async fn adjust_stock(
        &self,
        id: ProductId,
        delta: i32,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Product> {
        let mut products = lock(&self.products)?;
        let product = products
            .get_mut(&id)
            .ok_or(RepositoryError::ProductNotFound(id))?;
        apply_stock_delta(product, delta, at)?;
        Ok(product.clone())
    }

    async fn increment_view_count(&self, id: ProductId) -> RepositoryResult<Product> {
        let mut products = lock(&self.products)?;
        let product = products
            .get_mut(&id)
            .ok_or(RepositoryError::ProductNotFound(id))?;
        product.increase_view_count();
        Ok(product.clone())
    }

    async fn delete(&self, id: ProductId) -> RepositoryResult<bool> {
        Ok(lock(&self.products)?.remove(&id).is_some())
    }
}
