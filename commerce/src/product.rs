//! Product catalog service.

use shopfront_core::environment::Clock;
use shopfront_core::error::{DomainError, Result};
use shopfront_core::ids::{CategoryId, ProductId};
use shopfront_core::money::Money;
use shopfront_core::paging::{Page, PageRequest};
use shopfront_core::product::{Product, ProductDraft, ProductStatus};
use shopfront_core::providers::{ProductQuery, ProductRepository};
use std::sync::Arc;

/// Product catalog service.
#[derive(Clone)]
pub struct ProductService {
    products: Arc<dyn ProductRepository>,
    clock: Arc<dyn Clock>,
}

impl ProductService {
    /// Create a new product service.
    #[must_use]
    pub fn new(products: Arc<dyn ProductRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { products, clock }
    }

    /// Adds a product to the catalog as `ACTIVE` with no views.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed draft or
    /// [`DomainError::DuplicateSku`] if the SKU is taken.
    pub async fn create(&self, draft: ProductDraft) -> Result<Product> {
        draft.validate()?;
        if self.products.find_by_sku(&draft.sku).await?.is_some() {
            return Err(DomainError::DuplicateSku(draft.sku));
        }

        let id = self.products.next_id().await?;
        let product = Product::create(id, draft, self.clock.now());
        self.products.save(&product).await?;

        metrics::counter!("shopfront_products_created_total").increment(1);
        tracing::info!(product_id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    /// Replaces the editable fields of a product.
    ///
    /// A changed `stock_quantity` is applied as the difference from the
    /// stock read here, so units sold in the meantime stay sold.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ProductNotFound`], a validation error,
    /// [`DomainError::DuplicateSku`] if the SKU belongs to another product,
    /// or [`DomainError::InsufficientStock`] if the stock change no longer
    /// fits.
    pub async fn update(&self, id: ProductId, draft: ProductDraft) -> Result<Product> {
        draft.validate()?;
        let mut product = self.find_by_id(id).await?;

        if product.sku != draft.sku {
            if let Some(other) = self.products.find_by_sku(&draft.sku).await? {
                if other.id != id {
                    return Err(DomainError::DuplicateSku(draft.sku));
                }
            }
        }

        let stock_delta = draft.stock_quantity.saturating_sub(product.stock_quantity);
        let now = self.clock.now();
        product.apply(draft, now);
        self.products.save(&product).await?;
        if stock_delta != 0 {
            self.products.adjust_stock(id, stock_delta, now).await?;
        }
        tracing::info!(product_id = %id, stock_delta, "Product updated");
        self.find_by_id(id).await
    }

    /// Looks up a product.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ProductNotFound`] if it does not exist.
    pub async fn find_by_id(&self, id: ProductId) -> Result<Product> {
        self.products
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::ProductNotFound(id.to_string()))
    }

    /// Looks up a product by SKU.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ProductNotFound`] if no product has this SKU.
    pub async fn find_by_sku(&self, sku: &str) -> Result<Product> {
        self.products
            .find_by_sku(sku)
            .await?
            .ok_or_else(|| DomainError::ProductNotFound(sku.to_string()))
    }

    /// Lists products matching an arbitrary filter.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidInput`] for an inverted price range.
    pub async fn find_matching(
        &self,
        mut query: ProductQuery,
        page: PageRequest,
    ) -> Result<Page<Product>> {
        if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
            if min > max {
                return Err(DomainError::InvalidInput(
                    "minimum price must not exceed maximum price".to_string(),
                ));
            }
        }
        query.keyword = query
            .keyword
            .map(|keyword| keyword.trim().to_string())
            .filter(|keyword| !keyword.is_empty());
        Ok(self.products.find_matching(&query, page).await?)
    }

    /// Lists all products.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn find_all(&self, page: PageRequest) -> Result<Page<Product>> {
        self.find_matching(ProductQuery::default(), page).await
    }

    /// Lists products in `status`.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn find_by_status(
        &self,
        status: ProductStatus,
        page: PageRequest,
    ) -> Result<Page<Product>> {
        let query = ProductQuery {
            status: Some(status),
            ..ProductQuery::default()
        };
        self.find_matching(query, page).await
    }

    /// Lists products in a category.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn find_by_category(
        &self,
        category_id: CategoryId,
        page: PageRequest,
    ) -> Result<Page<Product>> {
        let query = ProductQuery {
            category_id: Some(category_id),
            ..ProductQuery::default()
        };
        self.find_matching(query, page).await
    }

    /// Searches name and description. A blank keyword lists everything.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn search(&self, keyword: &str, page: PageRequest) -> Result<Page<Product>> {
        let query = ProductQuery {
            keyword: Some(keyword.to_string()),
            ..ProductQuery::default()
        };
        self.find_matching(query, page).await
    }

    /// Lists products priced within `[min, max]`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidInput`] if `min > max`.
    pub async fn find_by_price_range(
        &self,
        min: Money,
        max: Money,
        page: PageRequest,
    ) -> Result<Page<Product>> {
        let query = ProductQuery {
            min_price: Some(min),
            max_price: Some(max),
            ..ProductQuery::default()
        };
        self.find_matching(query, page).await
    }

    /// Products with stock at or below `threshold`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidInput`] for a negative threshold.
    pub async fn find_low_stock(&self, threshold: i32) -> Result<Vec<Product>> {
        if threshold < 0 {
            return Err(DomainError::InvalidInput(
                "threshold must not be negative".to_string(),
            ));
        }
        Ok(self.products.find_low_stock(threshold).await?)
    }

    /// Most viewed active products.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidInput`] if `limit` is zero.
    pub async fn find_popular(&self, limit: u32) -> Result<Vec<Product>> {
        if limit == 0 {
            return Err(DomainError::InvalidInput("limit must be positive".to_string()));
        }
        Ok(self.products.find_popular(limit.min(100)).await?)
    }

    /// Records a detail view and returns the updated product.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ProductNotFound`] if it does not exist.
    pub async fn increase_view_count(&self, id: ProductId) -> Result<Product> {
        Ok(self.products.increment_view_count(id).await?)
    }

    /// Adjusts stock by `delta` units.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ProductNotFound`] or
    /// [`DomainError::InsufficientStock`] if stock would go negative.
    pub async fn update_stock(&self, id: ProductId, delta: i32) -> Result<Product> {
        let product = self.products.adjust_stock(id, delta, self.clock.now()).await?;
        tracing::info!(
            product_id = %id,
            delta,
            stock = product.stock_quantity,
            "Product stock adjusted"
        );
        Ok(product)
    }

    /// Makes a product purchasable.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ProductNotFound`] if it does not exist.
    pub async fn activate(&self, id: ProductId) -> Result<Product> {
        self.change_status(id, Product::activate).await
    }

    /// Hides a product.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ProductNotFound`] if it does not exist.
    pub async fn deactivate(&self, id: ProductId) -> Result<Product> {
        self.change_status(id, Product::deactivate).await
    }

    /// Withdraws a product.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ProductNotFound`] if it does not exist.
    pub async fn discontinue(&self, id: ProductId) -> Result<Product> {
        self.change_status(id, Product::discontinue).await
    }

    async fn change_status(&self, id: ProductId, change: fn(&mut Product)) -> Result<Product> {
        let mut product = self.find_by_id(id).await?;
        change(&mut product);
        product.updated_at = self.clock.now();
        self.products.save(&product).await?;
        tracing::info!(product_id = %id, status = %product.status, "Product status changed");
        self.find_by_id(id).await
    }

    /// Removes a product from the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ProductNotFound`] if it does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<()> {
        if !self.products.delete(id).await? {
            return Err(DomainError::ProductNotFound(id.to_string()));
        }
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Returns true if the product exists.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn exists(&self, id: ProductId) -> Result<bool> {
        Ok(self.products.find_by_id(id).await?.is_some())
    }

    /// Number of products in `status`.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn count_by_status(&self, status: ProductStatus) -> Result<u64> {
        let query = ProductQuery {
            status: Some(status),
            ..ProductQuery::default()
        };
        Ok(self.products.count_matching(&query).await?)
    }

    /// Number of products in a category.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn count_by_category(&self, category_id: CategoryId) -> Result<u64> {
        let query = ProductQuery {
            category_id: Some(category_id),
            ..ProductQuery::default()
        };
        Ok(self.products.count_matching(&query).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use shopfront_testing::fixtures::product_draft;
    use shopfront_testing::mocks::InMemoryProductRepository;
    use shopfront_testing::test_clock;

    fn service() -> ProductService {
        ProductService::new(
            Arc::new(InMemoryProductRepository::new()),
            Arc::new(test_clock()),
        )
    }

    #[tokio::test]
    async fn create_rejects_duplicate_sku() {
        let service = service();
        let product = service.create(product_draft("SKU-1")).await.unwrap();
        assert_eq!(product.status, ProductStatus::Active);
        assert_eq!(product.view_count, 0);

        let err = service.create(product_draft("SKU-1")).await.unwrap_err();
        assert_eq!(err, DomainError::DuplicateSku("SKU-1".into()));
    }

    #[tokio::test]
    async fn update_allows_own_sku_but_not_others() {
        let service = service();
        let first = service.create(product_draft("A")).await.unwrap();
        service.create(product_draft("B")).await.unwrap();

        let mut draft = product_draft("A");
        draft.name = "Renamed".into();
        let updated = service.update(first.id, draft).await.unwrap();
        assert_eq!(updated.name, "Renamed");

        let err = service.update(first.id, product_draft("B")).await.unwrap_err();
        assert!(matches!(err, DomainError::DuplicateSku(_)));
    }

    #[tokio::test]
    async fn update_applies_stock_as_a_difference() {
        let service = service();
        let product = service.create(product_draft("A")).await.unwrap();
        service.update_stock(product.id, -30).await.unwrap();

        let mut draft = product_draft("A");
        draft.stock_quantity = 90;
        let updated = service.update(product.id, draft).await.unwrap();
        assert_eq!(updated.stock_quantity, 90);

        let mut unchanged = product_draft("A");
        unchanged.stock_quantity = 90;
        unchanged.price = Money::from_cents(2_500);
        let repriced = service.update(product.id, unchanged).await.unwrap();
        assert_eq!(repriced.stock_quantity, 90);
        assert_eq!(repriced.view_count, 0);
    }

    #[tokio::test]
    async fn blank_search_lists_everything() {
        let service = service();
        let mut lamp = product_draft("L");
        lamp.name = "Desk Lamp".into();
        service.create(lamp).await.unwrap();
        service.create(product_draft("X")).await.unwrap();

        let hits = service.search("lamp", PageRequest::default()).await.unwrap();
        assert_eq!(hits.total_elements, 1);
        let all = service.search("  ", PageRequest::default()).await.unwrap();
        assert_eq!(all.total_elements, 2);
    }

    #[tokio::test]
    async fn price_range_must_be_ordered() {
        let service = service();
        let err = service
            .find_by_price_range(Money::from_cents(500), Money::from_cents(100), PageRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn stock_and_low_stock() {
        let service = service();
        let product = service.create(product_draft("S")).await.unwrap();

        let err = service.update_stock(product.id, -101).await.unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                product_id: product.id,
                requested: 101,
                available: 100
            }
        );
        let missing = service.update_stock(ProductId::new(99), 1).await.unwrap_err();
        assert!(missing.is_not_found());

        service.update_stock(product.id, -95).await.unwrap();
        let low = service.find_low_stock(10).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].stock_quantity, 5);
    }

    #[tokio::test]
    async fn popular_orders_by_views() {
        let service = service();
        let a = service.create(product_draft("A")).await.unwrap();
        let b = service.create(product_draft("B")).await.unwrap();
        service.increase_view_count(b.id).await.unwrap();
        service.increase_view_count(b.id).await.unwrap();
        service.increase_view_count(a.id).await.unwrap();

        let popular = service.find_popular(1).await.unwrap();
        assert_eq!(popular[0].id, b.id);
        assert_eq!(popular[0].view_count, 2);
    }

    #[tokio::test]
    async fn status_changes_and_counts() {
        let service = service();
        let product = service.create(product_draft("A")).await.unwrap();
        service.create(product_draft("B")).await.unwrap();

        service.discontinue(product.id).await.unwrap();
        assert_eq!(service.count_by_status(ProductStatus::Active).await.unwrap(), 1);
        assert_eq!(service.count_by_status(ProductStatus::Discontinued).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_missing_product_fails() {
        let service = service();
        let err = service.delete(ProductId::new(99)).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
