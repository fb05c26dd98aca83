//! Cache configuration.

use std::collections::HashMap;
use std::time::Duration;

/// Cache of product lookups.
pub const PRODUCTS: &str = "products";
/// Cache of user lookups.
pub const USERS: &str = "users";
/// Cache of category lookups.
pub const CATEGORIES: &str = "categories";
/// Cache of order lookups.
pub const ORDERS: &str = "orders";

/// Cache TTLs and key layout.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for caches without an override.
    ///
    /// Default: 30 minutes
    pub default_ttl: Duration,

    /// Per-cache TTL overrides.
    ///
    /// Default: products 1 h, users 15 min, categories 2 h, orders 10 min
    pub cache_ttls: HashMap<String, Duration>,

    /// Prefix prepended to every key, e.g. `shopfront:`.
    pub key_prefix: Option<String>,
}

impl CacheConfig {
    /// Create a configuration with the default TTLs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback TTL.
    #[must_use]
    pub const fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Override the TTL of one cache.
    #[must_use]
    pub fn with_cache_ttl(mut self, cache: impl Into<String>, ttl: Duration) -> Self {
        self.cache_ttls.insert(cache.into(), ttl);
        self
    }

    /// Set the key prefix.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// TTL used for entries of `cache`.
    #[must_use]
    pub fn ttl_for(&self, cache: &str) -> Duration {
        self.cache_ttls
            .get(cache)
            .copied()
            .unwrap_or(self.default_ttl)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        let cache_ttls = [
            (PRODUCTS, Duration::from_secs(60 * 60)),
            (USERS, Duration::from_secs(15 * 60)),
            (CATEGORIES, Duration::from_secs(2 * 60 * 60)),
            (ORDERS, Duration::from_secs(10 * 60)),
        ]
        .into_iter()
        .map(|(name, ttl)| (name.to_string(), ttl))
        .collect();

        Self {
            default_ttl: Duration::from_secs(30 * 60),
            cache_ttls,
            key_prefix: None,
        }
    }
}
