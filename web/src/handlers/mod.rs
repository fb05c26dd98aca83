//! Shared HTTP handlers.

pub mod health;

pub use health::{HealthStatus, Liveness, Readiness, health_check};
