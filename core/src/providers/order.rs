//! Order repository trait.

use super::RepositoryResult;
use crate::ids::{OrderId, ProductId, UserId};
use crate::money::Money;
use crate::order::{Order, OrderStatus};
use crate::paging::{Page, PageRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Filter for order listings and aggregates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderQuery {
    /// Only orders placed by this user
    pub user_id: Option<UserId>,
    /// Only orders in this status
    pub status: Option<OrderStatus>,
    /// Only orders created strictly after this instant
    pub created_after: Option<DateTime<Utc>>,
}

impl OrderQuery {
    /// Orders placed by `user_id`.
    #[must_use]
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// Orders in `status`.
    #[must_use]
    pub fn with_status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Returns true if `order` passes the filter.
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.is_none_or(|user| order.user_id() == user)
            && self.status.is_none_or(|status| order.status() == status)
            && self
                .created_after
                .is_none_or(|since| order.created_at() > since)
    }
}

/// Outcome of [`OrderRepository::cancel`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cancellation {
    /// The order was stored as cancelled and its units went back to stock.
    Cancelled {
        /// Products that no longer exist; their units were not restored
        missing_products: Vec<ProductId>,
    },
    /// The stored order had already left the expected status. Nothing
    /// was written.
    Stale {
        /// Status found in storage
        current: OrderStatus,
    },
}

/// Order repository.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Reserve an identifier for a new order.
    ///
    /// # Errors
    ///
    /// Returns error if the sequence cannot be read.
    async fn next_id(&self) -> RepositoryResult<OrderId>;

    /// Get order with its items by ID.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_id(&self, id: OrderId) -> RepositoryResult<Option<Order>>;

    /// List orders matching `query`, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_matching(
        &self,
        query: &OrderQuery,
        page: PageRequest,
    ) -> RepositoryResult<Page<Order>>;

    /// All orders matching `query`, newest first, without paging.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_all_matching(&self, query: &OrderQuery) -> RepositoryResult<Vec<Order>>;

    /// Count orders matching `query`.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn count_matching(&self, query: &OrderQuery) -> RepositoryResult<u64>;

    /// Sum of `total_amount` over orders matching `query`.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn sum_total(&self, query: &OrderQuery) -> RepositoryResult<Money>;

    /// Insert or update an order together with its items.
    ///
    /// Stock is not touched; use [`place`](Self::place) and
    /// [`cancel`](Self::cancel) for writes that move units.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    async fn save(&self, order: &Order) -> RepositoryResult<()>;

    /// Stores a new order and removes its units from stock as one unit of
    /// work. Either every write lands or none does.
    ///
    /// # Errors
    ///
    /// - [`RepositoryError::ProductNotFound`] if an item's product is gone
    /// - [`RepositoryError::InsufficientStock`] if a product holds fewer
    ///   units than its item requests
    /// - a storage error; nothing is written in any of these cases
    ///
    /// [`RepositoryError::ProductNotFound`]: super::RepositoryError::ProductNotFound
    /// [`RepositoryError::InsufficientStock`]: super::RepositoryError::InsufficientStock
    async fn place(&self, order: &Order) -> RepositoryResult<()>;

    /// Stores `order`, already moved to `CANCELLED`, and returns its units
    /// to stock as one unit of work. The write only happens while the
    /// stored order is still in `expected`, so a cancellation is applied at
    /// most once.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails; nothing is written.
    async fn cancel(&self, order: &Order, expected: OrderStatus) -> RepositoryResult<Cancellation>;
}
