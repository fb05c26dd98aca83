//! The order aggregate and its status graph.
//!
//! An [`Order`] owns its line items and keeps `total_amount` equal to the sum
//! of item subtotals at all times. Status changes go through
//! [`OrderStatus::can_transition_to`]; a rejected change returns
//! [`DomainError::InvalidTransition`] and leaves the order untouched.

use crate::error::{DomainError, Result};
use crate::ids::{OrderId, ProductId, UserId};
use crate::money::Money;
use crate::validation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of shipping and billing addresses.
pub const MAX_ADDRESS_LEN: usize = 1000;

/// Status of an order in its lifecycle
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order has been placed and awaits confirmation
    Pending,
    /// Customer confirmed the order
    Confirmed,
    /// Payment received
    Paid,
    /// Handed to the carrier
    Shipped,
    /// Received by the customer
    Delivered,
    /// Cancelled before shipping
    Cancelled,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::Paid,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Returns true if the status graph has an edge from `self` to `target`.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Confirmed | Self::Cancelled)
                | (Self::Confirmed, Self::Paid | Self::Cancelled)
                | (Self::Paid, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Delivered)
        )
    }

    /// Returns true if no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Returns true if an order in this status may still be cancelled.
    #[must_use]
    pub const fn can_be_cancelled(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed | Self::Paid)
    }

    /// Upper-case name used in storage and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Paid => "PAID",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::InvalidInput(format!("unknown order status '{s}'")))
    }
}

/// A single line item in an order.
///
/// Name and price are snapshots taken when the order was placed, so later
/// catalog edits do not change what the customer was charged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Product identifier
    pub product_id: ProductId,
    /// Product name at order time
    pub product_name: String,
    /// Price per unit at order time
    pub unit_price: Money,
    /// Quantity ordered
    pub quantity: u32,
}

impl OrderItem {
    /// Creates a new line item.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidInput`] if the quantity is zero or the
    /// price is negative.
    pub fn new(
        product_id: ProductId,
        product_name: String,
        unit_price: Money,
        quantity: u32,
    ) -> Result<Self> {
        if quantity == 0 {
            return Err(DomainError::InvalidInput(
                "quantity must be at least 1".to_string(),
            ));
        }
        if unit_price.is_negative() {
            return Err(DomainError::InvalidInput(
                "unit price must not be negative".to_string(),
            ));
        }
        Ok(Self {
            product_id,
            product_name,
            unit_price,
            quantity,
        })
    }

    /// Unit price multiplied by quantity.
    ///
    /// Saturates on overflow; orders reject such items before they are stored.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.unit_price
            .checked_mul(self.quantity)
            .unwrap_or(Money::from_cents(i64::MAX))
    }
}

/// Sums item subtotals with overflow checking.
fn compute_total(items: &[OrderItem]) -> Result<Money> {
    items.iter().try_fold(Money::ZERO, |total, item| {
        item.unit_price
            .checked_mul(item.quantity)
            .and_then(|subtotal| total.checked_add(subtotal))
            .ok_or_else(|| DomainError::InvalidInput("order total is too large".to_string()))
    })
}

/// Persisted shape of an order, used to rebuild the aggregate.
///
/// `total_amount` is not part of the record: it is always derived from the
/// items when the aggregate is rebuilt.
#[derive(Clone, Debug, Deserialize)]
pub struct OrderRecord {
    /// Order identifier
    pub id: OrderId,
    /// Owning user
    pub user_id: UserId,
    /// Line items
    pub items: Vec<OrderItem>,
    /// Current status
    pub status: OrderStatus,
    /// Shipping address
    pub shipping_address: Option<String>,
    /// Billing address
    pub billing_address: Option<String>,
    /// When the order was placed
    pub order_date: DateTime<Utc>,
    /// When the order shipped
    pub shipped_date: Option<DateTime<Utc>>,
    /// When the order was delivered
    pub delivered_date: Option<DateTime<Utc>>,
    /// Row creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Order aggregate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OrderRecord")]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    items: Vec<OrderItem>,
    total_amount: Money,
    status: OrderStatus,
    shipping_address: Option<String>,
    billing_address: Option<String>,
    order_date: DateTime<Utc>,
    shipped_date: Option<DateTime<Utc>>,
    delivered_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Places a new order in `PENDING` status.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidInput`] if `items` is empty, an address
    /// is too long, or the total overflows.
    pub fn new(
        id: OrderId,
        user_id: UserId,
        items: Vec<OrderItem>,
        shipping_address: Option<String>,
        billing_address: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        Self::from_record(OrderRecord {
            id,
            user_id,
            items,
            status: OrderStatus::Pending,
            shipping_address,
            billing_address,
            order_date: now,
            shipped_date: None,
            delivered_date: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuilds an order from storage, recomputing the total from its items.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidInput`] if the record violates an order
    /// invariant.
    pub fn from_record(record: OrderRecord) -> Result<Self> {
        if record.items.is_empty() {
            return Err(DomainError::InvalidInput(
                "order must contain at least one item".to_string(),
            ));
        }
        if record.items.iter().any(|item| item.quantity == 0) {
            return Err(DomainError::InvalidInput(
                "quantity must be at least 1".to_string(),
            ));
        }
        validate_address("shipping address", record.shipping_address.as_deref())?;
        validate_address("billing address", record.billing_address.as_deref())?;
        let total_amount = compute_total(&record.items)?;

        Ok(Self {
            id: record.id,
            user_id: record.user_id,
            items: record.items,
            total_amount,
            status: record.status,
            shipping_address: record.shipping_address,
            billing_address: record.billing_address,
            order_date: record.order_date,
            shipped_date: record.shipped_date,
            delivered_date: record.delivered_date,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    /// Order identifier
    #[must_use]
    pub const fn id(&self) -> OrderId {
        self.id
    }

    /// Owning user
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Line items
    #[must_use]
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Sum of item subtotals
    #[must_use]
    pub const fn total_amount(&self) -> Money {
        self.total_amount
    }

    /// Total number of units across all items
    #[must_use]
    pub fn total_units(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Current status
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Shipping address
    #[must_use]
    pub fn shipping_address(&self) -> Option<&str> {
        self.shipping_address.as_deref()
    }

    /// Billing address
    #[must_use]
    pub fn billing_address(&self) -> Option<&str> {
        self.billing_address.as_deref()
    }

    /// When the order was placed
    #[must_use]
    pub const fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    /// When the order shipped
    #[must_use]
    pub const fn shipped_date(&self) -> Option<DateTime<Utc>> {
        self.shipped_date
    }

    /// When the order was delivered
    #[must_use]
    pub const fn delivered_date(&self) -> Option<DateTime<Utc>> {
        self.delivered_date
    }

    /// Creation time
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last modification time
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true if the order belongs to `user_id`.
    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Returns true if the order may still be cancelled.
    #[must_use]
    pub const fn can_be_cancelled(&self) -> bool {
        self.status.can_be_cancelled()
    }

    /// `PENDING` → `CONFIRMED`
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidTransition`] from any other status.
    pub fn confirm(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(OrderStatus::Confirmed, now)
    }

    /// `CONFIRMED` → `PAID`
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidTransition`] from any other status.
    pub fn pay(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(OrderStatus::Paid, now)
    }

    /// `PAID` → `SHIPPED`, stamping the ship date.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidTransition`] from any other status.
    pub fn ship(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(OrderStatus::Shipped, now)
    }

    /// `SHIPPED` → `DELIVERED`, stamping the delivery date.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidTransition`] from any other status.
    pub fn deliver(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(OrderStatus::Delivered, now)
    }

    /// Cancels the order from `PENDING`, `CONFIRMED` or `PAID`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidTransition`] once the order has shipped
    /// or reached a terminal status.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(OrderStatus::Cancelled, now)
    }

    /// Moves the order to `target` if the status graph allows it.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidTransition`] naming the current and
    /// requested status when there is no such edge. `PENDING` is never a
    /// valid target.
    pub fn transition_to(&mut self, target: OrderStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(DomainError::InvalidTransition {
                current: self.status,
                requested: target,
            });
        }

        self.status = target;
        match target {
            OrderStatus::Shipped => self.shipped_date = Some(now),
            OrderStatus::Delivered => self.delivered_date = Some(now),
            _ => {}
        }
        self.updated_at = now;
        Ok(())
    }

    /// Adds an item, merging quantities if the product is already present.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::OrderNotModifiable`] unless the order is
    /// pending, or [`DomainError::InvalidInput`] if the total would overflow.
    pub fn add_item(&mut self, item: OrderItem, now: DateTime<Utc>) -> Result<()> {
        self.modify_items(now, |items| {
            match items.iter_mut().find(|existing| existing.product_id == item.product_id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.checked_add(item.quantity).ok_or_else(
                        || DomainError::InvalidInput("quantity is too large".to_string()),
                    )?;
                }
                None => items.push(item),
            }
            Ok(())
        })
    }

    /// Removes the item for `product_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::OrderNotModifiable`] unless the order is
    /// pending, [`DomainError::ProductNotFound`] if the product is not in the
    /// order, or [`DomainError::InvalidInput`] when removing the last item.
    pub fn remove_item(&mut self, product_id: ProductId, now: DateTime<Utc>) -> Result<()> {
        self.modify_items(now, |items| {
            let position = items
                .iter()
                .position(|item| item.product_id == product_id)
                .ok_or_else(|| DomainError::ProductNotFound(product_id.to_string()))?;
            if items.len() == 1 {
                return Err(DomainError::InvalidInput(
                    "order must contain at least one item".to_string(),
                ));
            }
            items.remove(position);
            Ok(())
        })
    }

    /// Sets the quantity of the item for `product_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::OrderNotModifiable`] unless the order is
    /// pending, [`DomainError::ProductNotFound`] if the product is not in the
    /// order, or [`DomainError::InvalidInput`] for a zero quantity.
    pub fn update_item_quantity(
        &mut self,
        product_id: ProductId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if quantity == 0 {
            return Err(DomainError::InvalidInput(
                "quantity must be at least 1".to_string(),
            ));
        }
        self.modify_items(now, |items| {
            let item = items
                .iter_mut()
                .find(|item| item.product_id == product_id)
                .ok_or_else(|| DomainError::ProductNotFound(product_id.to_string()))?;
            item.quantity = quantity;
            Ok(())
        })
    }

    /// Applies `change` to a copy of the items and commits it together with
    /// the recomputed total, so a failure leaves the order untouched.
    fn modify_items<F>(&mut self, now: DateTime<Utc>, change: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<OrderItem>) -> Result<()>,
    {
        if self.status != OrderStatus::Pending {
            return Err(DomainError::OrderNotModifiable(self.status));
        }
        let mut items = self.items.clone();
        change(&mut items)?;
        let total = compute_total(&items)?;
        self.items = items;
        self.total_amount = total;
        self.updated_at = now;
        Ok(())
    }
}

impl TryFrom<OrderRecord> for Order {
    type Error = DomainError;

    fn try_from(record: OrderRecord) -> Result<Self> {
        Self::from_record(record)
    }
}

fn validate_address(field: &str, address: Option<&str>) -> Result<()> {
    match address {
        Some(value) => validation::validate_length(field, value, 0, MAX_ADDRESS_LEN),
        None => Ok(()),
    }
}
