//! Storage providers.
//!
//! Services depend on these traits, never on a concrete database. Two
//! families of implementations exist:
//!
//! - **Testing / development**: in-memory repositories in `shopfront-testing`
//! - **Production**: `PostgreSQL` repositories in `shopfront-postgres`
//!
//! The traits use `async_trait` so they can be shared as `Arc<dyn ...>`.
//! Query methods take a filter struct; every `None` field means "no
//! constraint", so one method covers all combinations the API exposes.

use crate::error::DomainError;
use crate::ids::ProductId;
use thiserror::Error;

pub mod category;
pub mod order;
pub mod product;
pub mod user;

pub use category::{CategoryQuery, CategoryRepository, ParentFilter};
pub use order::{Cancellation, OrderQuery, OrderRepository};
pub use product::{ProductQuery, ProductRepository};
pub use user::{UserQuery, UserRepository};

/// Storage failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Query or connection failure.
    #[error("Database error: {0}")]
    Database(String),

    /// A stored row could not be mapped back to a domain value.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// In-process store failure (e.g. a poisoned lock).
    #[error("Internal storage error: {0}")]
    Internal(String),

    /// A guarded stock write addressed a product that does not exist.
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    /// A guarded stock write would take a product below zero units.
    /// Nothing was written.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Product that ran short
        product_id: ProductId,
        /// Units the write tried to remove
        requested: i64,
        /// Units on hand
        available: i64,
    },
}

impl From<RepositoryError> for DomainError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::ProductNotFound(id) => Self::ProductNotFound(id.to_string()),
            RepositoryError::InsufficientStock {
                product_id,
                requested,
                available,
            } => Self::InsufficientStock {
                product_id,
                requested,
                available,
            },
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Result type for repository operations.
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_errors_become_system_errors() {
        let err: DomainError = RepositoryError::Database("connection refused".into()).into();
        assert_eq!(err.code(), "COMMON_002");
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn stock_rejections_keep_their_meaning() {
        let missing: DomainError = RepositoryError::ProductNotFound(ProductId::new(7)).into();
        assert_eq!(missing.code(), "PRODUCT_001");

        let short: DomainError = RepositoryError::InsufficientStock {
            product_id: ProductId::new(7),
            requested: 5,
            available: 2,
        }
        .into();
        assert_eq!(
            short,
            DomainError::InsufficientStock {
                product_id: ProductId::new(7),
                requested: 5,
                available: 2
            }
        );
    }
}
