//! HTTP handlers, grouped by resource.

pub mod auth;
pub mod batch;
pub mod categories;
pub mod orders;
pub mod products;
pub mod users;
