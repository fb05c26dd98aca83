//! Typed cache facade.

use crate::backend::CacheBackend;
use crate::config::CacheConfig;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// JSON cache over a [`CacheBackend`].
///
/// Keys are laid out as `{prefix}{cache}::{key}`. Backend and
/// serialization failures are logged at `warn` and treated as a miss, so a
/// broken cache never fails a request.
///
/// # Example
///
/// ```
/// use shopfront_cache::{CacheConfig, CacheService, InMemoryCacheBackend};
/// use std::sync::Arc;
///
/// # tokio_test_block_on(async {
/// let cache = CacheService::new(Arc::new(InMemoryCacheBackend::new()), CacheConfig::default());
/// cache.put("products", "42", &"Keyboard").await;
/// assert_eq!(cache.get::<String>("products", "42").await.as_deref(), Some("Keyboard"));
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone)]
pub struct CacheService {
    backend: Arc<dyn CacheBackend>,
    config: CacheConfig,
}

impl CacheService {
    /// Creates a new `CacheService`.
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        Self { backend, config }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Full backend key for `key` in `cache`.
    #[must_use]
    pub fn key(&self, cache: &str, key: &str) -> String {
        format!("{}{cache}::{key}", self.prefix())
    }

    fn prefix(&self) -> &str {
        self.config.key_prefix.as_deref().unwrap_or_default()
    }

    /// Store `value` with the cache's configured TTL.
    pub async fn put<T: Serialize + Sync>(&self, cache: &str, key: &str, value: &T) {
        self.put_with_ttl(cache, key, value, self.config.ttl_for(cache))
            .await;
    }

    /// Store `value` with an explicit TTL.
    ///
    /// Values that serialize to JSON `null` are not stored.
    pub async fn put_with_ttl<T: Serialize + Sync>(
        &self,
        cache: &str,
        key: &str,
        value: &T,
        ttl: Duration,
    ) {
        let json = match serde_json::to_value(value) {
            Ok(serde_json::Value::Null) => return,
            Ok(json) => json.to_string(),
            Err(error) => {
                tracing::warn!(cache, key, %error, "Failed to serialize cache value");
                return;
            }
        };

        let full_key = self.key(cache, key);
        if let Err(error) = self.backend.set_with_ttl(&full_key, &json, ttl).await {
            tracing::warn!(key = %full_key, %error, "Failed to write cache entry");
        }
    }

    /// Read and decode a cached value.
    ///
    /// Returns `None` on a miss, a backend error, or a value that no longer
    /// decodes as `T`.
    pub async fn get<T: DeserializeOwned>(&self, cache: &str, key: &str) -> Option<T> {
        let full_key = self.key(cache, key);
        let raw = match self.backend.get(&full_key).await {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(key = %full_key, %error, "Failed to read cache entry");
                None
            }
        };

        let Some(raw) = raw else {
            metrics::counter!("shopfront_cache_misses_total", "cache" => cache.to_string())
                .increment(1);
            return None;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                metrics::counter!("shopfront_cache_hits_total", "cache" => cache.to_string())
                    .increment(1);
                Some(value)
            }
            Err(error) => {
                tracing::warn!(key = %full_key, %error, "Discarding undecodable cache entry");
                self.evict(cache, key).await;
                None
            }
        }
    }

    /// Remove one entry.
    pub async fn evict(&self, cache: &str, key: &str) {
        let full_key = self.key(cache, key);
        if let Err(error) = self.backend.delete(&full_key).await {
            tracing::warn!(key = %full_key, %error, "Failed to evict cache entry");
        }
    }

    /// Remove every entry of `cache`.
    pub async fn evict_all(&self, cache: &str) {
        let pattern = self.key(cache, "*");
        match self.backend.delete_matching(&pattern).await {
            Ok(removed) => tracing::debug!(cache, removed, "Cleared cache"),
            Err(error) => tracing::warn!(cache, %error, "Failed to clear cache"),
        }
    }

    /// Backend keys matching a raw glob `pattern`.
    pub async fn keys(&self, pattern: &str) -> Vec<String> {
        self.backend.keys(pattern).await.unwrap_or_else(|error| {
            tracing::warn!(pattern, %error, "Failed to list cache keys");
            Vec::new()
        })
    }

    /// Whether `key` is cached in `cache`.
    pub async fn has_key(&self, cache: &str, key: &str) -> bool {
        let full_key = self.key(cache, key);
        self.backend.exists(&full_key).await.unwrap_or_else(|error| {
            tracing::warn!(key = %full_key, %error, "Failed to check cache entry");
            false
        })
    }

    /// Remaining lifetime of an entry.
    pub async fn expire_of(&self, cache: &str, key: &str) -> Option<Duration> {
        let full_key = self.key(cache, key);
        self.backend.ttl(&full_key).await.unwrap_or_else(|error| {
            tracing::warn!(key = %full_key, %error, "Failed to read cache TTL");
            None
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::InMemoryCacheBackend;
    use crate::config::{CATEGORIES, PRODUCTS};
    use crate::error::{CacheError, Result};
    use async_trait::async_trait;
    use serde::Deserialize;
    use shopfront_testing::test_clock;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: i64,
        name: String,
    }

    fn service() -> CacheService {
        CacheService::new(
            Arc::new(InMemoryCacheBackend::with_clock(Arc::new(test_clock()))),
            CacheConfig::default().with_key_prefix("test:"),
        )
    }

    #[tokio::test]
    async fn put_then_get_uses_cache_ttl() {
        let cache = service();
        let item = Item {
            id: 1,
            name: "Mug".into(),
        };
        cache.put(PRODUCTS, "1", &item).await;

        assert_eq!(cache.get::<Item>(PRODUCTS, "1").await, Some(item));
        assert!(cache.has_key(PRODUCTS, "1").await);
        assert_eq!(
            cache.expire_of(PRODUCTS, "1").await,
            Some(Duration::from_secs(3600))
        );
        assert_eq!(cache.keys("test:products::*").await, vec!["test:products::1"]);
    }

    #[tokio::test]
    async fn null_values_are_not_stored() {
        let cache = service();
        cache.put::<Option<Item>>(PRODUCTS, "missing", &None).await;
        assert!(!cache.has_key(PRODUCTS, "missing").await);
    }

    #[tokio::test]
    async fn evict_all_clears_one_cache_only() {
        let cache = service();
        cache.put(PRODUCTS, "1", &1).await;
        cache.put(PRODUCTS, "2", &2).await;
        cache.put(CATEGORIES, "1", &3).await;

        cache.evict_all(PRODUCTS).await;
        assert_eq!(cache.get::<i32>(PRODUCTS, "1").await, None);
        assert_eq!(cache.get::<i32>(CATEGORIES, "1").await, Some(3));

        cache.evict(CATEGORIES, "1").await;
        assert!(!cache.has_key(CATEGORIES, "1").await);
    }

    #[tokio::test]
    async fn undecodable_entry_is_a_miss() {
        let cache = service();
        cache.put(PRODUCTS, "1", &"not an item").await;
        assert_eq!(cache.get::<Item>(PRODUCTS, "1").await, None);
        assert!(!cache.has_key(PRODUCTS, "1").await);
    }

    struct BrokenBackend;

    #[async_trait]
    impl CacheBackend for BrokenBackend {
        async fn get(&self, _: &str) -> Result<Option<String>> {
            Err(CacheError::Backend("down".into()))
        }
        async fn set_with_ttl(&self, _: &str, _: &str, _: Duration) -> Result<()> {
            Err(CacheError::Backend("down".into()))
        }
        async fn delete(&self, _: &str) -> Result<()> {
            Err(CacheError::Backend("down".into()))
        }
        async fn delete_matching(&self, _: &str) -> Result<usize> {
            Err(CacheError::Backend("down".into()))
        }
        async fn keys(&self, _: &str) -> Result<Vec<String>> {
            Err(CacheError::Backend("down".into()))
        }
        async fn exists(&self, _: &str) -> Result<bool> {
            Err(CacheError::Backend("down".into()))
        }
        async fn ttl(&self, _: &str) -> Result<Option<Duration>> {
            Err(CacheError::Backend("down".into()))
        }
    }

    #[tokio::test]
    async fn backend_failures_degrade_to_misses() {
        let cache = CacheService::new(Arc::new(BrokenBackend), CacheConfig::default());
        cache.put(PRODUCTS, "1", &1).await;
        cache.evict_all(PRODUCTS).await;
        assert_eq!(cache.get::<i32>(PRODUCTS, "1").await, None);
        assert!(!cache.has_key(PRODUCTS, "1").await);
        assert!(cache.keys("*").await.is_empty());
        assert_eq!(cache.expire_of(PRODUCTS, "1").await, None);
    }
}
