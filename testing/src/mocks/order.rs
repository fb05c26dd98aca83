//! In-memory order repository.

use super::lock;
use super::product::{InMemoryProductRepository, apply_stock_delta};
use async_trait::async_trait;
use shopfront_core::ids::{OrderId, ProductId};
use shopfront_core::money::Money;
use shopfront_core::order::{Order, OrderStatus};
use shopfront_core::paging::{Page, PageRequest};
use shopfront_core::product::Product;
use shopfront_core::providers::{
    Cancellation, OrderQuery, OrderRepository, RepositoryError, RepositoryResult,
};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory order repository.
///
/// [`place`](OrderRepository::place) and [`cancel`](OrderRepository::cancel)
/// move stock in the product store given to
/// [`with_products`](Self::with_products); [`new`](Self::new) starts with an
/// empty one of its own.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<Mutex<HashMap<OrderId, Order>>>,
    products: Arc<Mutex<HashMap<ProductId, Product>>>,
    sequence: Arc<AtomicI64>,
}

impl InMemoryOrderRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty repository that moves stock in `products`.
    #[must_use]
    pub fn with_products(products: &InMemoryProductRepository) -> Self {
        Self {
            products: Arc::clone(&products.products),
            ..Self::default()
        }
    }
}

fn signed(quantity: u32) -> RepositoryResult<i32> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::Internal(format!("quantity {quantity} too large")))
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn next_id(&self) -> RepositoryResult<OrderId> {
        Ok(OrderId::new(self.sequence.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn find_by_id(&self, id: OrderId) -> RepositoryResult<Option<Order>> {
        Ok(lock(&self.orders)?.get(&id).cloned())
    }

    async fn find_matching(
        &self,
        query: &OrderQuery,
        page: PageRequest,
    ) -> RepositoryResult<Page<Order>> {
        Ok(Page::paginate(self.find_all_matching(query).await?, page))
    }

    async fn find_all_matching(&self, query: &OrderQuery) -> RepositoryResult<Vec<Order>> {
        let mut orders: Vec<Order> = lock(&self.orders)?
            .values()
            .filter(|order| query.matches(order))
            .cloned()
            .collect();
        orders.sort_by_key(|order| (Reverse(order.created_at()), Reverse(order.id())));
        Ok(orders)
    }

    async fn count_matching(&self, query: &OrderQuery) -> RepositoryResult<u64> {
        Ok(lock(&self.orders)?
            .values()
            .filter(|order| query.matches(order))
            .count() as u64)
    }

    async fn sum_total(&self, query: &OrderQuery) -> RepositoryResult<Money> {
        lock(&self.orders)?
            .values()
            .filter(|order| query.matches(order))
            .try_fold(Money::ZERO, |sum, order| sum.checked_add(order.total_amount()))
            .ok_or_else(|| RepositoryError::Internal("order total sum overflowed".to_string()))
    }

    async fn save(&self, order: &Order) -> RepositoryResult<()> {
        lock(&self.orders)?.insert(order.id(), order.clone());
        Ok(())
    }

    async fn place(&self, order: &Order) -> RepositoryResult<()> {
        let mut orders = lock(&self.orders)?;
        let mut products = lock(&self.products)?;

        // Stage every change on copies; commit only if all of them apply.
        let mut staged: HashMap<ProductId, Product> = HashMap::new();
        for item in order.items() {
            let mut product = match staged.remove(&item.product_id) {
                Some(product) => product,
                None => products
                    .get(&item.product_id)
                    .cloned()
                    .ok_or(RepositoryError::ProductNotFound(item.product_id))?,
            };
            apply_stock_delta(&mut product, -signed(item.quantity)?, order.created_at())?;
            staged.insert(item.product_id, product);
        }

        products.extend(staged);
        orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn cancel(&self, order: &Order, expected: OrderStatus) -> RepositoryResult<Cancellation> {
        let mut orders = lock(&self.orders)?;
        let mut products = lock(&self.products)?;

        if let Some(current) = orders.get(&order.id()).map(Order::status) {
            if current != expected {
                return Ok(Cancellation::Stale { current });
            }
        }

        let mut staged: HashMap<ProductId, Product> = HashMap::new();
        let mut missing_products = Vec::new();
        for item in order.items() {
            let stored = staged
                .remove(&item.product_id)
                .or_else(|| products.get(&item.product_id).cloned());
            match stored {
                Some(mut product) => {
                    apply_stock_delta(&mut product, signed(item.quantity)?, order.updated_at())?;
                    staged.insert(item.product_id, product);
                }
                None => missing_products.push(item.product_id),
            }
        }

        products.extend(staged);
        orders.insert(order.id(), order.clone());
        Ok(Cancellation::Cancelled { missing_products })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::fixtures::product_draft;
    use crate::mocks::test_clock;
    use shopfront_core::environment::Clock;
    use shopfront_core::ids::UserId;
    use shopfront_core::order::OrderItem;
    use shopfront_core::providers::ProductRepository;

    async fn stocked(products: &InMemoryProductRepository, sku: &str, stock: i32) -> Product {
        let mut draft = product_draft(sku);
        draft.stock_quantity = stock;
        let product = Product::create(products.next_id().await.unwrap(), draft, test_clock().now());
        products.save(&product).await.unwrap();
        product
    }

    fn order_for(lines: &[(&Product, u32)]) -> Order {
        let items = lines
            .iter()
            .map(|(product, quantity)| {
                OrderItem::new(product.id, product.name.clone(), product.price, *quantity).unwrap()
            })
            .collect();
        Order::new(OrderId::new(1), UserId::new(1), items, None, None, test_clock().now()).unwrap()
    }

    async fn stock_of(products: &InMemoryProductRepository, id: ProductId) -> i32 {
        products.find_by_id(id).await.unwrap().unwrap().stock_quantity
    }

    #[tokio::test]
    async fn place_writes_nothing_when_any_line_is_short() {
        let products = InMemoryProductRepository::new();
        let orders = InMemoryOrderRepository::with_products(&products);
        let mug = stocked(&products, "MUG", 10).await;
        let cup = stocked(&products, "CUP", 1).await;

        let err = orders.place(&order_for(&[(&mug, 4), (&cup, 2)])).await.unwrap_err();

        assert_eq!(
            err,
            RepositoryError::InsufficientStock {
                product_id: cup.id,
                requested: 2,
                available: 1
            }
        );
        assert_eq!(stock_of(&products, mug.id).await, 10);
        assert!(orders.find_by_id(OrderId::new(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cancel_applies_once() {
        let products = InMemoryProductRepository::new();
        let orders = InMemoryOrderRepository::with_products(&products);
        let mug = stocked(&products, "MUG", 10).await;
        let mut order = order_for(&[(&mug, 4)]);
        orders.place(&order).await.unwrap();
        assert_eq!(stock_of(&products, mug.id).await, 6);

        order.cancel(test_clock().now()).unwrap();
        let first = orders.cancel(&order, OrderStatus::Pending).await.unwrap();
        assert_eq!(
            first,
            Cancellation::Cancelled {
                missing_products: vec![]
            }
        );
        let second = orders.cancel(&order, OrderStatus::Pending).await.unwrap();
        assert_eq!(
            second,
            Cancellation::Stale {
                current: OrderStatus::Cancelled
            }
        );
        assert_eq!(stock_of(&products, mug.id).await, 10);
    }
}
