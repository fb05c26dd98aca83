//! `PostgreSQL` storage for Shopfront.
//!
//! Implements the repository traits from `shopfront-core` with runtime
//! `sqlx` queries, and embeds the schema migrations.
//!
//! - Money columns hold integer cents (`BIGINT`)
//! - Status and role columns hold the upper-case enum names (`TEXT`)
//! - Ids come from the tables' `BIGSERIAL` sequences via `next_id`
//!
//! # Example
//!
//! ```no_run
//! use shopfront_postgres::{PostgresConfig, PostgresProductRepository, connect, run_migrations};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = connect(&PostgresConfig::new("postgres://localhost/shopfront")).await?;
//! run_migrations(&pool).await?;
//! let products = PostgresProductRepository::new(pool);
//! # Ok(())
//! # }
//! ```

use shopfront_core::providers::{RepositoryError, RepositoryResult};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

mod categories;
mod orders;
mod products;
mod rows;
mod users;

pub use categories::PostgresCategoryRepository;
pub use orders::PostgresOrderRepository;
pub use products::PostgresProductRepository;
pub use users::PostgresUserRepository;

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Connection string
    pub url: String,
    /// Pool ceiling
    ///
    /// Default: 10
    pub max_connections: u32,
    /// Connections kept open when idle
    ///
    /// Default: 2
    pub min_connections: u32,
    /// How long to wait for a free connection
    ///
    /// Default: 5 seconds
    pub acquire_timeout: Duration,
}

impl PostgresConfig {
    /// Create a configuration with default pool sizes.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(5),
        }
    }

    /// Set max connections.
    #[must_use]
    pub const fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set min connections.
    #[must_use]
    pub const fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Set acquire timeout.
    #[must_use]
    pub const fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

/// Open a connection pool.
///
/// # Errors
///
/// Returns [`RepositoryError::Database`] if the database is unreachable.
pub async fn connect(config: &PostgresConfig) -> RepositoryResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.url)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to connect: {e}")))?;

    tracing::info!(
        max_connections = config.max_connections,
        "Connected to PostgreSQL"
    );
    Ok(pool)
}

/// Apply the embedded schema migrations.
///
/// # Errors
///
/// Returns [`RepositoryError::Database`] if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> RepositoryResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Migration failed: {e}")))?;
    Ok(())
}

/// Map a driver error to a repository error.
pub(crate) fn db_error(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(error.to_string())
}
