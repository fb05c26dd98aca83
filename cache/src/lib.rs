//! # Shopfront Cache
//!
//! Cache-aside support for read-heavy lookups.
//!
//! - [`CacheBackend`]: raw string storage with per-key expiry
//! - [`RedisCacheBackend`]: Redis via a pooled `ConnectionManager`
//! - [`InMemoryCacheBackend`]: process-local fallback when Redis is not configured
//! - [`CacheService`]: typed JSON facade with per-cache TTLs
//!
//! Callers read through [`CacheService::get`], fall back to the repository on
//! a miss, then [`CacheService::put`] the result. Writes evict the affected
//! keys.

pub mod backend;
pub mod config;
pub mod error;
pub mod service;

pub use backend::{CacheBackend, InMemoryCacheBackend, RedisCacheBackend};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use service::CacheService;

/// Describe the metrics emitted by this crate.
pub fn register_cache_metrics() {
    metrics::describe_counter!("shopfront_cache_hits_total", "Cache reads served from cache");
    metrics::describe_counter!(
        "shopfront_cache_misses_total",
        "Cache reads that fell through to storage"
    );
}
