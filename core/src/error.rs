//! Error types for the Shopfront domain.
//!
//! Every variant carries a stable error code (see [`DomainError::code`]) that
//! the HTTP layer passes through to clients unchanged.

use crate::ids::{CategoryId, OrderId, ProductId};
use crate::order::OrderStatus;
use thiserror::Error;

/// Domain errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unexpected infrastructure failure.
    #[error("System error: {0}")]
    Internal(String),

    /// User lookup failed.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Email is already registered.
    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    /// Email address is malformed.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Password does not meet the strength rules.
    #[error("Weak password: {0}")]
    WeakPassword(String),

    /// Unknown email or wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Account is deactivated.
    #[error("Account is locked")]
    AccountLocked,

    /// Caller lacks the required role or ownership.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Product lookup failed.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// SKU is already used by another product.
    #[error("Duplicate SKU: {0}")]
    DuplicateSku(String),

    /// Product is inactive or has no stock.
    #[error("Product {0} is not available")]
    OutOfStock(ProductId),

    /// Category lookup failed.
    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    /// Category name is already taken.
    #[error("Category already exists: {0}")]
    CategoryAlreadyExists(String),

    /// Category still has subcategories.
    #[error("Category {0} has subcategories")]
    CategoryHasChildren(CategoryId),

    /// Order lookup failed.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Not enough stock to satisfy a request.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Product being decremented
        product_id: ProductId,
        /// Units requested
        requested: i64,
        /// Units on hand
        available: i64,
    },

    /// Status change not allowed by the order status graph.
    #[error("Cannot change order status from {current} to {requested}")]
    InvalidTransition {
        /// Status the order is in
        current: OrderStatus,
        /// Status that was requested
        requested: OrderStatus,
    },

    /// Items can only change while the order is pending.
    #[error("Order cannot be modified in status {0}")]
    OrderNotModifiable(OrderStatus),
}

impl DomainError {
    /// Stable error code exposed to API clients.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "COMMON_001",
            Self::Internal(_) => "COMMON_002",
            Self::UserNotFound(_) => "USER_001",
            Self::UserAlreadyExists(_) => "USER_002",
            Self::InvalidEmail(_) => "USER_003",
            Self::WeakPassword(_) => "USER_004",
            Self::InvalidCredentials => "USER_005",
            Self::AccountLocked => "USER_006",
            Self::AccessDenied(_) => "USER_007",
            Self::ProductNotFound(_) => "PRODUCT_001",
            Self::DuplicateSku(_) => "PRODUCT_003",
            Self::OutOfStock(_) => "PRODUCT_004",
            Self::CategoryNotFound(_) => "CATEGORY_001",
            Self::CategoryAlreadyExists(_) => "CATEGORY_002",
            Self::CategoryHasChildren(_) => "CATEGORY_003",
            Self::OrderNotFound(_) => "ORDER_001",
            Self::InsufficientStock { .. } => "ORDER_002",
            Self::InvalidTransition { .. } => "ORDER_003",
            Self::OrderNotModifiable(_) => "ORDER_004",
        }
    }

    /// Returns true if the error means a requested entity does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_)
                | Self::ProductNotFound(_)
                | Self::CategoryNotFound(_)
                | Self::OrderNotFound(_)
        )
    }

    /// Returns true if the request conflicts with current state.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::UserAlreadyExists(_)
                | Self::DuplicateSku(_)
                | Self::CategoryAlreadyExists(_)
                | Self::CategoryHasChildren(_)
                | Self::OutOfStock(_)
                | Self::InsufficientStock { .. }
                | Self::InvalidTransition { .. }
                | Self::OrderNotModifiable(_)
        )
    }

    /// Returns true if the error was caused by client input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::InvalidEmail(_) | Self::WeakPassword(_)
        )
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_names_both_states() {
        let err = DomainError::InvalidTransition {
            current: OrderStatus::Delivered,
            requested: OrderStatus::Cancelled,
        };
        assert_eq!(err.to_string(), "Cannot change order status from DELIVERED to CANCELLED");
        assert_eq!(err.code(), "ORDER_003");
        assert!(err.is_conflict());
    }

    #[test]
    fn error_classification() {
        assert!(DomainError::OrderNotFound(OrderId::new(1)).is_not_found());
        assert!(!DomainError::InvalidCredentials.is_not_found());
        assert!(DomainError::WeakPassword("short".into()).is_validation());
        assert_eq!(DomainError::AccountLocked.code(), "USER_006");
    }
}
