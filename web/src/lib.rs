//! Axum integration for Shopfront.
//!
//! This crate holds the HTTP plumbing shared by every route:
//!
//! - [`AppError`]: maps domain and auth errors to statuses and codes
//! - [`ApiResponse`]: the `{success, data, message, code}` envelope
//! - [`CorrelationId`] and [`correlation_id_layer`]: per-request ids
//! - [`PageParams`] and the `Api*` extractors
//! - liveness and readiness handlers
//!
//! # Request Flow
//!
//! 1. **Correlation** id is attached by the middleware
//! 2. **Extract** path, query and JSON body; rejections become envelopes
//! 3. **Call** the service layer
//! 4. **Wrap** the result in [`ApiResponse`], or map the error via [`AppError`]
//!
//! # Example
//!
//! ```
//! use axum::{Router, routing::get};
//! use shopfront_web::{ApiPath, ApiResponse, AppError, WebResult, correlation_id_layer};
//!
//! async fn get_product(ApiPath(id): ApiPath<i64>) -> WebResult<ApiResponse<i64>> {
//!     if id <= 0 {
//!         return Err(AppError::not_found("Product", id));
//!     }
//!     Ok(ApiResponse::ok(id))
//! }
//!
//! let app: Router = Router::new()
//!     .route("/api/v1/products/:id", get(get_product))
//!     .layer(correlation_id_layer());
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{ApiJson, ApiPath, ApiQuery, CorrelationId, PageParams};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use response::ApiResponse;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
