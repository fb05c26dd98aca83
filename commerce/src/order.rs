//! Checkout and order lifecycle service.
//!
//! Placing an order checks every requested product before touching any
//! stock. The order and its stock decrements are then written as one unit
//! by [`OrderRepository::place`], so a failed write leaves neither behind.
//! Cancelling goes through [`OrderRepository::cancel`], which returns the
//! units and stores the new status together, at most once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shopfront_core::environment::Clock;
use shopfront_core::error::{DomainError, Result};
use shopfront_core::ids::{OrderId, ProductId, UserId};
use shopfront_core::money::Money;
use shopfront_core::order::{Order, OrderItem, OrderStatus};
use shopfront_core::paging::{Page, PageRequest};
use shopfront_core::product::Product;
use shopfront_core::providers::{Cancellation, OrderQuery, OrderRepository, ProductRepository};
use std::sync::Arc;
use tokio::sync::Mutex;

/// One requested line at checkout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Product to buy
    pub product_id: ProductId,
    /// Units to buy, at least 1
    pub quantity: u32,
}

/// Checkout request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    /// Requested lines; repeated products are merged
    pub items: Vec<OrderLine>,
    /// Shipping address
    pub shipping_address: Option<String>,
    /// Billing address
    pub billing_address: Option<String>,
}

/// Order service.
#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
    clock: Arc<dyn Clock>,
    stock_lock: Arc<Mutex<()>>,
}

impl OrderService {
    /// Create a new order service.
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            orders,
            products,
            clock,
            stock_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Places a `PENDING` order for `user_id`, snapshotting product names
    /// and prices and removing the ordered units from stock.
    ///
    /// # Errors
    ///
    /// - [`DomainError::InvalidInput`] for an empty request or zero quantity
    /// - [`DomainError::ProductNotFound`] for an unknown product
    /// - [`DomainError::OutOfStock`] for an inactive or sold-out product
    /// - [`DomainError::InsufficientStock`] if fewer units are on hand
    pub async fn place_order(&self, user_id: UserId, request: PlaceOrder) -> Result<Order> {
        let lines = merge_lines(request.items)?;

        let _guard = self.stock_lock.lock().await;

        let mut reserved: Vec<(Product, u32)> = Vec::with_capacity(lines.len());
        for line in &lines {
            let product = self
                .products
                .find_by_id(line.product_id)
                .await?
                .ok_or_else(|| DomainError::ProductNotFound(line.product_id.to_string()))?;
            if !product.is_available() {
                return Err(DomainError::OutOfStock(product.id));
            }
            if i64::from(line.quantity) > i64::from(product.stock_quantity) {
                return Err(DomainError::InsufficientStock {
                    product_id: product.id,
                    requested: i64::from(line.quantity),
                    available: i64::from(product.stock_quantity),
                });
            }
            reserved.push((product, line.quantity));
        }

        let items = reserved
            .iter()
            .map(|(product, quantity)| {
                OrderItem::new(product.id, product.name.clone(), product.price, *quantity)
            })
            .collect::<Result<Vec<_>>>()?;

        let now = self.clock.now();
        let order = Order::new(
            self.orders.next_id().await?,
            user_id,
            items,
            request.shipping_address,
            request.billing_address,
            now,
        )?;

        self.orders.place(&order).await?;

        for item in order.items() {
            metrics::counter!("shopfront_stock_units_adjusted_total", "direction" => "removed")
                .increment(u64::from(item.quantity));
        }

        metrics::counter!("shopfront_orders_placed_total").increment(1);
        metrics::counter!("shopfront_order_revenue_cents_total")
            .increment(u64::try_from(order.total_amount().cents()).unwrap_or(0));
        tracing::info!(
            order_id = %order.id(),
            user_id = %user_id,
            items = order.items().len(),
            total = %order.total_amount(),
            "Order placed"
        );
        Ok(order)
    }

    /// Looks up an order.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::OrderNotFound`] if it does not exist.
    pub async fn find_by_id(&self, id: OrderId) -> Result<Order> {
        self.orders
            .find_by_id(id)
            .await?
            .ok_or(DomainError::OrderNotFound(id))
    }

    /// Lists orders matching `query`, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn find_matching(&self, query: &OrderQuery, page: PageRequest) -> Result<Page<Order>> {
        Ok(self.orders.find_matching(query, page).await?)
    }

    /// Lists all orders.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn find_all(&self, page: PageRequest) -> Result<Page<Order>> {
        self.find_matching(&OrderQuery::default(), page).await
    }

    /// Lists a user's orders.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn find_by_user(&self, user_id: UserId, page: PageRequest) -> Result<Page<Order>> {
        self.find_matching(&OrderQuery::for_user(user_id), page).await
    }

    /// Lists orders in `status`.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn find_by_status(
        &self,
        status: OrderStatus,
        page: PageRequest,
    ) -> Result<Page<Order>> {
        self.find_matching(&OrderQuery::with_status(status), page).await
    }

    /// Lists a user's orders in `status`.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn find_by_user_and_status(
        &self,
        user_id: UserId,
        status: OrderStatus,
        page: PageRequest,
    ) -> Result<Page<Order>> {
        let query = OrderQuery {
            user_id: Some(user_id),
            status: Some(status),
            created_after: None,
        };
        self.find_matching(&query, page).await
    }

    /// All orders created after `since`, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn find_created_after(&self, since: DateTime<Utc>) -> Result<Vec<Order>> {
        let query = OrderQuery {
            created_after: Some(since),
            ..OrderQuery::default()
        };
        Ok(self.orders.find_all_matching(&query).await?)
    }

    /// `PENDING` → `CONFIRMED`
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::OrderNotFound`] or
    /// [`DomainError::InvalidTransition`].
    pub async fn confirm(&self, id: OrderId) -> Result<Order> {
        self.transition(id, OrderStatus::Confirmed).await
    }

    /// `CONFIRMED` → `PAID`
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::OrderNotFound`] or
    /// [`DomainError::InvalidTransition`].
    pub async fn pay(&self, id: OrderId) -> Result<Order> {
        self.transition(id, OrderStatus::Paid).await
    }

    /// `PAID` → `SHIPPED`
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::OrderNotFound`] or
    /// [`DomainError::InvalidTransition`].
    pub async fn ship(&self, id: OrderId) -> Result<Order> {
        self.transition(id, OrderStatus::Shipped).await
    }

    /// `SHIPPED` → `DELIVERED`
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::OrderNotFound`] or
    /// [`DomainError::InvalidTransition`].
    pub async fn deliver(&self, id: OrderId) -> Result<Order> {
        self.transition(id, OrderStatus::Delivered).await
    }

    /// Cancels an order and returns its units to stock.
    ///
    /// Products deleted since the order was placed are skipped with a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::OrderNotFound`] or
    /// [`DomainError::InvalidTransition`] once the order has shipped.
    pub async fn cancel(&self, id: OrderId) -> Result<Order> {
        let _guard = self.stock_lock.lock().await;

        let mut order = self.find_by_id(id).await?;
        let previous = order.status();
        apply_transition(&mut order, OrderStatus::Cancelled, self.clock.now())?;

        let missing_products = match self.orders.cancel(&order, previous).await? {
            Cancellation::Cancelled { missing_products } => missing_products,
            Cancellation::Stale { current } => {
                tracing::warn!(order_id = %id, %previous, %current, "Order changed during cancellation");
                return Err(DomainError::InvalidTransition {
                    current,
                    requested: OrderStatus::Cancelled,
                });
            }
        };

        for item in order.items() {
            if missing_products.contains(&item.product_id) {
                tracing::warn!(
                    order_id = %id,
                    product_id = %item.product_id,
                    "Product no longer exists; stock not restored"
                );
            } else {
                metrics::counter!("shopfront_stock_units_adjusted_total", "direction" => "returned")
                    .increment(u64::from(item.quantity));
            }
        }

        tracing::info!(order_id = %id, "Order cancelled");
        Ok(order)
    }

    /// Moves an order to `target`. Cancellation restores stock exactly as
    /// [`cancel`](Self::cancel) does.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::OrderNotFound`] or
    /// [`DomainError::InvalidTransition`]; `PENDING` is never a valid target.
    pub async fn update_status(&self, id: OrderId, target: OrderStatus) -> Result<Order> {
        if target == OrderStatus::Cancelled {
            self.cancel(id).await
        } else {
            self.transition(id, target).await
        }
    }

    async fn transition(&self, id: OrderId, target: OrderStatus) -> Result<Order> {
        let mut order = self.find_by_id(id).await?;
        apply_transition(&mut order, target, self.clock.now())?;
        self.orders.save(&order).await?;
        tracing::info!(order_id = %id, status = %target, "Order status changed");
        Ok(order)
    }

    /// Returns true if the order exists.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn exists(&self, id: OrderId) -> Result<bool> {
        Ok(self.orders.find_by_id(id).await?.is_some())
    }

    /// Number of orders placed by a user.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn count_by_user(&self, user_id: UserId) -> Result<u64> {
        Ok(self.orders.count_matching(&OrderQuery::for_user(user_id)).await?)
    }

    /// Number of orders in `status`.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn count_by_status(&self, status: OrderStatus) -> Result<u64> {
        Ok(self.orders.count_matching(&OrderQuery::with_status(status)).await?)
    }

    /// Total value of a user's orders.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn total_amount_by_user(&self, user_id: UserId) -> Result<Money> {
        Ok(self.orders.sum_total(&OrderQuery::for_user(user_id)).await?)
    }

    /// Total value of orders in `status`.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub async fn total_amount_by_status(&self, status: OrderStatus) -> Result<Money> {
        Ok(self.orders.sum_total(&OrderQuery::with_status(status)).await?)
    }
}

/// Applies a status change, recording the outcome in metrics and logs.
fn apply_transition(
    order: &mut Order,
    target: OrderStatus,
    now: DateTime<Utc>,
) -> Result<()> {
    let from = order.status();
    match order.transition_to(target, now) {
        Ok(()) => {
            metrics::counter!("shopfront_order_transitions_total", "status" => target.as_str())
                .increment(1);
            Ok(())
        }
        Err(err) => {
            metrics::counter!(
                "shopfront_order_transitions_rejected_total",
                "from" => from.as_str(),
                "to" => target.as_str()
            )
            .increment(1);
            tracing::warn!(order_id = %order.id(), %from, to = %target, "Order transition rejected");
            Err(err)
        }
    }
}

/// Validates quantities and merges repeated products, keeping first-seen order.
fn merge_lines(lines: Vec<OrderLine>) -> Result<Vec<OrderLine>> {
    if lines.is_empty() {
        return Err(DomainError::InvalidInput(
            "order must contain at least one item".to_string(),
        ));
    }

    let mut merged: Vec<OrderLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity == 0 {
            return Err(DomainError::InvalidInput(
                "quantity must be at least 1".to_string(),
            ));
        }
        match merged.iter_mut().find(|existing| existing.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(line.quantity)
                    .ok_or_else(|| DomainError::InvalidInput("quantity is too large".to_string()))?;
            }
            None => merged.push(line),
        }
    }
    Ok(merged)
}
