//! # Shopfront Testing
//!
//! Testing utilities and helpers for Shopfront.
//!
//! This crate provides:
//! - A controllable [`FixedClock`] for deterministic timestamps
//! - In-memory implementations of every repository trait
//! - Fixture builders for common domain values
//!
//! The in-memory repositories double as the server's storage backend when no
//! database is configured.
//!
//! ## Example
//!
//! ```
//! use shopfront_testing::{fixtures, mocks::InMemoryProductRepository, test_clock};
//! use shopfront_core::environment::Clock;
//! use shopfront_core::product::Product;
//! use shopfront_core::providers::ProductRepository;
//! use shopfront_core::ids::ProductId;
//!
//! # tokio_test_block_on(async {
//! let repo = InMemoryProductRepository::new();
//! let product = Product::create(ProductId::new(1), fixtures::product_draft("SKU-1"), test_clock().now());
//! repo.save(&product).await.unwrap();
//! assert!(repo.find_by_sku("SKU-1").await.unwrap().is_some());
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

pub mod fixtures;
pub mod mocks;

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
