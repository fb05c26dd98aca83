//! Raw string key-value cache backends.

use crate::error::{CacheError, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use shopfront_core::environment::{Clock, SystemClock};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Number of keys requested per `SCAN` round trip.
const SCAN_BATCH: usize = 100;

/// A string-valued cache with per-key expiry.
///
/// Patterns use Redis glob syntax: `*` matches any run of characters and
/// `?` matches exactly one.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a value.
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value that expires after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Remove a key.
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every key matching `pattern`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable.
    async fn delete_matching(&self, pattern: &str) -> Result<usize>;

    /// List keys matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Check whether a key is present.
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Remaining lifetime of a key, `None` if absent or without expiry.
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>>;
}

/// Redis-backed cache.
///
/// # Example
///
/// ```no_run
/// use shopfront_cache::RedisCacheBackend;
///
/// # async fn example() -> Result<(), shopfront_cache::CacheError> {
/// let backend = RedisCacheBackend::connect("redis://127.0.0.1:6379").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisCacheBackend {
    conn_manager: ConnectionManager,
}

impl RedisCacheBackend {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Backend`] if the URL is invalid or the server is
    /// unreachable.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| CacheError::Backend(format!("Failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::Backend(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self { conn_manager })
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn_manager.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys)
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn_manager.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, seconds).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn delete_matching(&self, pattern: &str) -> Result<usize> {
        let keys = self.scan(pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn_manager.clone();
        let removed: usize = conn.del(&keys).await?;
        Ok(removed)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.scan(pattern).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let mut conn = self.conn_manager.clone();
        // -2 means missing, -1 means no expiry
        let seconds: i64 = conn.ttl(key).await?;
        Ok(u64::try_from(seconds).ok().map(Duration::from_secs))
    }
}

struct Entry {
    value: String,
    expires_at: chrono::DateTime<chrono::Utc>,
}

/// Process-local cache used when no Redis is configured.
///
/// Expired entries are dropped lazily on access.
#[derive(Clone)]
pub struct InMemoryCacheBackend {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryCacheBackend {
    /// Create an empty cache on the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty cache that reads time from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Backend("in-memory cache lock poisoned".to_string()))?;
        let now = self.clock.now();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(entries)
    }
}

impl Default for InMemoryCacheBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).map(|entry| entry.value.clone()))
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| CacheError::Backend(format!("TTL out of range: {e}")))?;
        let expires_at = self.clock.now() + ttl;
        self.lock()?.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn delete_matching(&self, pattern: &str) -> Result<usize> {
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|key, _| !glob_match(pattern, key));
        Ok(before - entries.len())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .lock()?
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.lock()?.contains_key(key))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let now = self.clock.now();
        Ok(self
            .lock()?
            .get(key)
            .and_then(|entry| (entry.expires_at - now).to_std().ok()))
    }
}

/// Redis-style glob match supporting `*` and `?`.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some(&'*') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    star = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}
