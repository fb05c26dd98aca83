//! # Shopfront Core
//!
//! Domain types for the Shopfront e-commerce backend.
//!
//! This crate holds everything that has no I/O:
//!
//! - **Orders**: the [`order::Order`] aggregate and its status graph
//! - **Catalog**: [`product::Product`] and [`category::Category`]
//! - **Users**: [`user::User`] with roles and account status
//! - **Errors**: [`error::DomainError`] with stable error codes
//! - **Providers**: repository traits implemented by the storage crates
//!
//! ## Order lifecycle
//!
//! ```text
//! PENDING ──▶ CONFIRMED ──▶ PAID ──▶ SHIPPED ──▶ DELIVERED
//!    │            │           │
//!    └────────────┴───────────┴──▶ CANCELLED
//! ```
//!
//! ## Example
//!
//! ```
//! use chrono::Utc;
//! use shopfront_core::money::Money;
//! use shopfront_core::ids::{OrderId, ProductId, UserId};
//! use shopfront_core::order::{Order, OrderItem, OrderStatus};
//!
//! let item = OrderItem::new(ProductId::new(1), "Keyboard".to_string(), Money::from_cents(4_999), 2)?;
//! let mut order = Order::new(OrderId::new(1), UserId::new(7), vec![item], None, None, Utc::now())?;
//! assert_eq!(order.total_amount(), Money::from_cents(9_998));
//!
//! order.confirm(Utc::now())?;
//! assert_eq!(order.status(), OrderStatus::Confirmed);
//! assert!(order.ship(Utc::now()).is_err());
//! # Ok::<(), shopfront_core::error::DomainError>(())
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

pub mod category;
pub mod error;
pub mod ids;
pub mod money;
pub mod order;
pub mod paging;
pub mod product;
pub mod providers;
pub mod user;
pub mod validation;

pub use error::{DomainError, Result};

/// Environment module - abstractions over ambient dependencies.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Services read the current time through this trait so tests can pin
    /// it with a fixed clock.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
