//! # Shopfront Commerce
//!
//! Application services for the catalog and for orders.
//!
//! Each service owns `Arc<dyn ...Repository>` handles and a [`Clock`], keeps
//! all business rules in the domain types from `shopfront-core`, and adds
//! only orchestration: uniqueness checks, cross-aggregate stock updates,
//! logging and metrics.
//!
//! - [`ProductService`]: catalog CRUD, search and stock
//! - [`CategoryService`]: the category tree
//! - [`OrderService`]: checkout and the order lifecycle
//!
//! [`Clock`]: shopfront_core::environment::Clock

pub mod category;
pub mod metrics;
pub mod order;
pub mod product;

pub use category::CategoryService;
pub use order::{OrderLine, OrderService, PlaceOrder};
pub use product::ProductService;
