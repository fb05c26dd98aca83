//! Configuration management for the Shopfront server.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Storage and cache sections are optional: leaving `DATABASE_URL` or
//! `REDIS_URL` unset selects the in-memory backends.

use shopfront_auth::JwtConfig;
use shopfront_batch::{BatchConfig, DEFAULT_ORDER_REPORT_CRON, DEFAULT_USER_STATISTICS_CRON};
use shopfront_postgres::PostgresConfig;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Secret used when `JWT_SECRET` is unset. Only suitable for development.
pub const DEV_JWT_SECRET: &str = "shopfront-dev-secret-change-me";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listener
    pub server: ServerConfig,
    /// `PostgreSQL` storage, if `DATABASE_URL` is set
    pub postgres: Option<PostgresConfig>,
    /// Redis cache, if `REDIS_URL` is set
    pub redis: Option<RedisConfig>,
    /// Token and password settings
    pub auth: AuthConfig,
    /// Batch scheduling
    pub batch: BatchConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
}

impl ServerConfig {
    /// `host:port` for the listener.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Redis configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,
    /// Prefix put in front of every cache key
    pub key_prefix: Option<String>,
}

/// Authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for signing tokens
    pub jwt_secret: String,
    /// Access token lifetime in seconds (default: 1 day)
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime in seconds (default: 7 days)
    pub refresh_token_ttl_secs: i64,
    /// bcrypt work factor (default: 10)
    pub bcrypt_cost: u32,
}

impl AuthConfig {
    /// Token settings for [`shopfront_auth::JwtTokenProvider`].
    #[must_use]
    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig::new(self.jwt_secret.clone())
            .with_access_token_ttl(chrono::Duration::seconds(self.access_token_ttl_secs))
            .with_refresh_token_ttl(chrono::Duration::seconds(self.refresh_token_ttl_secs))
    }

    /// Whether the built-in development secret is in use.
    #[must_use]
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Unparseable values fall back to their defaults.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = ServerConfig {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed(&lookup, "PORT").unwrap_or(8080),
        };

        let postgres = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .map(|url| {
                let defaults = PostgresConfig::new(url);
                PostgresConfig {
                    max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS")
                        .unwrap_or(defaults.max_connections),
                    min_connections: parsed(&lookup, "DATABASE_MIN_CONNECTIONS")
                        .unwrap_or(defaults.min_connections),
                    acquire_timeout: parsed::<u64, _>(&lookup, "DATABASE_ACQUIRE_TIMEOUT_SECS")
                        .map_or(defaults.acquire_timeout, Duration::from_secs),
                    ..defaults
                }
            });

        let redis = lookup("REDIS_URL")
            .filter(|url| !url.trim().is_empty())
            .map(|url| RedisConfig {
                url,
                key_prefix: lookup("CACHE_KEY_PREFIX").filter(|p| !p.is_empty()),
            });

        let auth = AuthConfig {
            jwt_secret: lookup("JWT_SECRET")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEV_JWT_SECRET.to_string()),
            access_token_ttl_secs: parsed(&lookup, "JWT_ACCESS_TTL_SECS").unwrap_or(86_400),
            refresh_token_ttl_secs: parsed(&lookup, "JWT_REFRESH_TTL_SECS").unwrap_or(604_800),
            bcrypt_cost: parsed(&lookup, "BCRYPT_COST").unwrap_or(10),
        };

        let batch = BatchConfig::new()
            .with_enabled(parsed(&lookup, "BATCH_ENABLED").unwrap_or(true))
            .with_order_report_cron(
                lookup("ORDER_REPORT_CRON")
                    .unwrap_or_else(|| DEFAULT_ORDER_REPORT_CRON.to_string()),
            )
            .with_user_statistics_cron(
                lookup("USER_STATISTICS_CRON")
                    .unwrap_or_else(|| DEFAULT_USER_STATISTICS_CRON.to_string()),
            );

        Self {
            server,
            postgres,
            redis,
            auth,
            batch,
        }
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_select_in_memory_backends() {
        let config = config(&[]);

        assert_eq!(config.server.address(), "0.0.0.0:8080");
        assert!(config.postgres.is_none());
        assert!(config.redis.is_none());
        assert!(config.auth.uses_dev_secret());
        assert_eq!(config.auth.access_token_ttl_secs, 86_400);
        assert_eq!(config.auth.refresh_token_ttl_secs, 604_800);
        assert_eq!(config.auth.bcrypt_cost, 10);
        assert!(config.batch.enabled);
        assert_eq!(config.batch.order_report_cron, DEFAULT_ORDER_REPORT_CRON);
    }

    #[test]
    fn reads_every_section() {
        let config = config(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("DATABASE_MAX_CONNECTIONS", "25"),
            ("REDIS_URL", "redis://localhost:6379"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_ACCESS_TTL_SECS", "600"),
            ("BCRYPT_COST", "4"),
            ("BATCH_ENABLED", "false"),
            ("USER_STATISTICS_CRON", "0 15 3 * * *"),
        ]);

        assert_eq!(config.server.address(), "127.0.0.1:9000");
        let postgres = config.postgres.as_ref().map(|p| (p.url.as_str(), p.max_connections));
        assert_eq!(postgres, Some(("postgres://localhost/shop", 25)));
        assert_eq!(
            config.redis.map(|r| r.url),
            Some("redis://localhost:6379".to_string())
        );
        assert!(!config.auth.uses_dev_secret());
        assert_eq!(
            config.auth.jwt_config().access_token_ttl,
            chrono::Duration::seconds(600)
        );
        assert_eq!(config.auth.bcrypt_cost, 4);
        assert!(!config.batch.enabled);
        assert_eq!(config.batch.user_statistics_cron, "0 15 3 * * *");
    }

    #[test]
    fn unparseable_values_fall_back() {
        let config = config(&[("PORT", "eighty"), ("BATCH_ENABLED", "sometimes")]);
        assert_eq!(config.server.port, 8080);
        assert!(config.batch.enabled);
    }
}
