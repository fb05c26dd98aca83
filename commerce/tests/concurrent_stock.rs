//! Catalog writes racing checkout must never undo a stock decrement.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shopfront_commerce::{OrderLine, OrderService, PlaceOrder, ProductService};
use shopfront_core::environment::Clock;
use shopfront_core::ids::{ProductId, UserId};
use shopfront_core::paging::{Page, PageRequest};
use shopfront_core::product::Product;
use shopfront_core::providers::{ProductQuery, ProductRepository, RepositoryResult};
use shopfront_testing::fixtures::product_draft;
use shopfront_testing::mocks::{InMemoryOrderRepository, InMemoryProductRepository};
use shopfront_testing::test_clock;
use std::sync::Arc;
use std::time::Duration;

const WRITE_DELAY: Duration = Duration::from_millis(100);

/// Product store that holds every write back for [`WRITE_DELAY`].
struct SlowWrites {
    inner: InMemoryProductRepository,
}

#[async_trait]
impl ProductRepository for SlowWrites {
    async fn next_id(&self) -> RepositoryResult<ProductId> {
        self.inner.next_id().await
    }

    async fn find_by_id(&self, id: ProductId) -> RepositoryResult<Option<Product>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_sku(&self, sku: &str) -> RepositoryResult<Option<Product>> {
        self.inner.find_by_sku(sku).await
    }

    async fn find_matching(
        &self,
        query: &ProductQuery,
        page: PageRequest,
    ) -> RepositoryResult<Page<Product>> {
        self.inner.find_matching(query, page).await
    }

    async fn find_low_stock(&self, threshold: i32) -> RepositoryResult<Vec<Product>> {
        self.inner.find_low_stock(threshold).await
    }

    async fn find_popular(&self, limit: u32) -> RepositoryResult<Vec<Product>> {
        self.inner.find_popular(limit).await
    }

    async fn count_matching(&self, query: &ProductQuery) -> RepositoryResult<u64> {
        self.inner.count_matching(query).await
    }

    async fn save(&self, product: &Product) -> RepositoryResult<()> {
        tokio::time::sleep(WRITE_DELAY).await;
        self.inner.save(product).await
    }

    async fn adjust_stock(
        &self,
        id: ProductId,
        delta: i32,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Product> {
        tokio::time::sleep(WRITE_DELAY).await;
        self.inner.adjust_stock(id, delta, at).await
    }

    async fn increment_view_count(&self, id: ProductId) -> RepositoryResult<Product> {
        tokio::time::sleep(WRITE_DELAY).await;
        self.inner.increment_view_count(id).await
    }

    async fn delete(&self, id: ProductId) -> RepositoryResult<bool> {
        self.inner.delete(id).await
    }
}

struct Shop {
    store: InMemoryProductRepository,
    slow_catalog: ProductService,
    orders: OrderService,
    product: Product,
}

async fn shop() -> Shop {
    let store = InMemoryProductRepository::new();
    let clock = Arc::new(test_clock());
    let product = Product::create(store.next_id().await.unwrap(), product_draft("MUG"), clock.now());
    store.save(&product).await.unwrap();

    let slow_catalog = ProductService::new(
        Arc::new(SlowWrites {
            inner: store.clone(),
        }),
        clock.clone(),
    );
    let orders = OrderService::new(
        Arc::new(InMemoryOrderRepository::with_products(&store)),
        Arc::new(store.clone()),
        clock,
    );
    Shop {
        store,
        slow_catalog,
        orders,
        product,
    }
}

async fn buy(shop: &Shop, quantity: u32) {
    shop.orders
        .place_order(
            UserId::new(1),
            PlaceOrder {
                items: vec![OrderLine {
                    product_id: shop.product.id,
                    quantity,
                }],
                shipping_address: None,
                billing_address: None,
            },
        )
        .await
        .unwrap();
}

async fn stored(shop: &Shop) -> Product {
    shop.store.find_by_id(shop.product.id).await.unwrap().unwrap()
}

#[tokio::test]
async fn view_during_checkout_keeps_the_decrement() {
    let shop = shop().await;

    let view = tokio::spawn({
        let catalog = shop.slow_catalog.clone();
        let id = shop.product.id;
        async move { catalog.increase_view_count(id).await }
    });
    tokio::task::yield_now().await;
    buy(&shop, 5).await;
    view.await.unwrap().unwrap();

    let product = stored(&shop).await;
    assert_eq!(product.stock_quantity, 95);
    assert_eq!(product.view_count, 1);
}

#[tokio::test]
async fn catalog_edit_during_checkout_keeps_the_decrement() {
    let shop = shop().await;

    let edit = tokio::spawn({
        let catalog = shop.slow_catalog.clone();
        let id = shop.product.id;
        let mut draft = product_draft("MUG");
        draft.name = "Large Mug".into();
        async move { catalog.update(id, draft).await }
    });
    tokio::task::yield_now().await;
    buy(&shop, 5).await;
    let edited = edit.await.unwrap().unwrap();

    assert_eq!(edited.name, "Large Mug");
    assert_eq!(edited.stock_quantity, 95);
    assert_eq!(stored(&shop).await.stock_quantity, 95);
}

#[tokio::test]
async fn restock_during_checkout_adds_up() {
    let shop = shop().await;

    let restock = tokio::spawn({
        let catalog = shop.slow_catalog.clone();
        let id = shop.product.id;
        async move { catalog.update_stock(id, 20).await }
    });
    tokio::task::yield_now().await;
    buy(&shop, 5).await;
    restock.await.unwrap().unwrap();

    assert_eq!(stored(&shop).await.stock_quantity, 115);
}
