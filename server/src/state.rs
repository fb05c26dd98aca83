//! Application state and backend wiring.
//!
//! [`bootstrap`] picks storage and cache backends from [`Config`]:
//! `PostgreSQL` repositories when `DATABASE_URL` is set, Redis when
//! `REDIS_URL` is set, and the in-memory implementations otherwise.

use crate::config::Config;
use anyhow::Context;
use metrics_exporter_prometheus::PrometheusHandle;
use shopfront_auth::{AuthService, BcryptPasswordHasher, JwtTokenProvider, UserService};
use shopfront_batch::{
    InMemoryReportStore, JobLauncher, JobRepository, OrderReportJob, PgReportStore, ReportStore,
    UserStatisticsJob,
};
use shopfront_cache::{
    CacheBackend, CacheConfig, CacheService, InMemoryCacheBackend, RedisCacheBackend,
};
use shopfront_commerce::{CategoryService, OrderService, ProductService};
use shopfront_core::environment::{Clock, SystemClock};
use shopfront_core::providers::{
    CategoryRepository, OrderRepository, ProductRepository, UserRepository,
};
use shopfront_postgres::{
    PostgresCategoryRepository, PostgresOrderRepository, PostgresProductRepository,
    PostgresUserRepository,
};
use shopfront_testing::mocks::{
    InMemoryCategoryRepository, InMemoryOrderRepository, InMemoryProductRepository,
    InMemoryUserRepository,
};
use sqlx::PgPool;
use std::sync::Arc;

/// The four repositories behind the services.
#[derive(Clone)]
pub struct Repositories {
    /// User accounts
    pub users: Arc<dyn UserRepository>,
    /// Product catalog
    pub products: Arc<dyn ProductRepository>,
    /// Category tree
    pub categories: Arc<dyn CategoryRepository>,
    /// Orders and their items
    pub orders: Arc<dyn OrderRepository>,
}

impl Repositories {
    /// Process-local repositories. Data is lost on restart.
    #[must_use]
    pub fn in_memory() -> Self {
        let products = InMemoryProductRepository::new();
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            orders: Arc::new(InMemoryOrderRepository::with_products(&products)),
            products: Arc::new(products),
            categories: Arc::new(InMemoryCategoryRepository::new()),
        }
    }

    /// `PostgreSQL` repositories sharing `pool`.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            products: Arc::new(PostgresProductRepository::new(pool.clone())),
            categories: Arc::new(PostgresCategoryRepository::new(pool.clone())),
            orders: Arc::new(PostgresOrderRepository::new(pool.clone())),
        }
    }
}

/// Application state shared across all HTTP handlers.
///
/// Every field is cheap to clone; services hold their repositories behind
/// `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Product catalog
    pub products: ProductService,
    /// Category tree
    pub categories: CategoryService,
    /// Checkout and fulfilment
    pub orders: OrderService,
    /// Login, refresh and bearer token checks; also owns the user service
    pub auth: AuthService,
    /// Read cache for products, categories and users
    pub cache: CacheService,
    /// Batch jobs and their execution history
    pub batch: JobLauncher,
    /// Database pool, probed by readiness checks
    pub database: Option<PgPool>,
    /// Prometheus recorder handle served at `/metrics`
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire services over the given backends.
    #[must_use]
    pub fn new(
        repositories: &Repositories,
        cache: Arc<dyn CacheBackend>,
        reports: Arc<dyn ReportStore>,
        config: &Config,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let hasher = Arc::new(BcryptPasswordHasher::new(config.auth.bcrypt_cost));
        let users = UserService::new(
            Arc::clone(&repositories.users),
            hasher,
            Arc::clone(&clock),
        );
        let tokens = JwtTokenProvider::new(config.auth.jwt_config(), Arc::clone(&clock));

        let mut cache_config = CacheConfig::default();
        if let Some(prefix) = config.redis.as_ref().and_then(|r| r.key_prefix.clone()) {
            cache_config = cache_config.with_key_prefix(prefix);
        }

        let batch = JobLauncher::new(JobRepository::new(), Arc::clone(&clock))
            .register(Arc::new(OrderReportJob::new(
                Arc::clone(&reports),
                Arc::clone(&clock),
            )))
            .register(Arc::new(UserStatisticsJob::new(reports, Arc::clone(&clock))));

        Self {
            products: ProductService::new(Arc::clone(&repositories.products), Arc::clone(&clock)),
            categories: CategoryService::new(
                Arc::clone(&repositories.categories),
                Arc::clone(&clock),
            ),
            orders: OrderService::new(
                Arc::clone(&repositories.orders),
                Arc::clone(&repositories.products),
                Arc::clone(&clock),
            ),
            auth: AuthService::new(users, tokens),
            cache: CacheService::new(cache, cache_config),
            batch,
            database: None,
            metrics: None,
        }
    }

    /// Fully in-memory state: repositories, cache and report store.
    #[must_use]
    pub fn in_memory(config: &Config, clock: Arc<dyn Clock>) -> Self {
        let repositories = Repositories::in_memory();
        let reports = Arc::new(InMemoryReportStore::new(
            Arc::clone(&repositories.orders),
            Arc::clone(&repositories.users),
        ));
        Self::new(
            &repositories,
            Arc::new(InMemoryCacheBackend::new()),
            reports,
            config,
            clock,
        )
    }

    /// Attach the database pool checked by `/ready`.
    #[must_use]
    pub fn with_database(mut self, pool: PgPool) -> Self {
        self.database = Some(pool);
        self
    }

    /// Attach the Prometheus handle rendered at `/metrics`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// The user service behind [`AuthService`].
    #[must_use]
    pub const fn users(&self) -> &UserService {
        self.auth.users()
    }
}

/// Connect the configured backends and build the application state.
///
/// # Errors
///
/// Returns an error if `PostgreSQL` or Redis is configured but unreachable,
/// or if migrations fail.
pub async fn bootstrap(config: &Config) -> anyhow::Result<AppState> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let cache: Arc<dyn CacheBackend> = match &config.redis {
        Some(redis) => {
            let backend = RedisCacheBackend::connect(&redis.url)
                .await
                .context("Failed to connect to Redis")?;
            tracing::info!("Using Redis cache");
            Arc::new(backend)
        }
        None => {
            tracing::info!("REDIS_URL not set, using in-memory cache");
            Arc::new(InMemoryCacheBackend::new())
        }
    };

    let Some(postgres) = &config.postgres else {
        tracing::warn!("DATABASE_URL not set, using in-memory storage; data is lost on restart");
        let repositories = Repositories::in_memory();
        let reports = Arc::new(InMemoryReportStore::new(
            Arc::clone(&repositories.orders),
            Arc::clone(&repositories.users),
        ));
        return Ok(AppState::new(&repositories, cache, reports, config, clock));
    };

    let pool = shopfront_postgres::connect(postgres)
        .await
        .context("Failed to connect to PostgreSQL")?;
    shopfront_postgres::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!(
        max_connections = postgres.max_connections,
        "Connected to PostgreSQL"
    );

    let repositories = Repositories::postgres(&pool);
    let reports = Arc::new(PgReportStore::new(pool.clone()));
    Ok(AppState::new(&repositories, cache, reports, config, clock).with_database(pool))
}
