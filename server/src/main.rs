//! Shopfront HTTP server.
//!
//! Catalog, checkout and account API with cached reads and scheduled
//! reporting jobs.

use metrics_exporter_prometheus::PrometheusBuilder;
use shopfront_batch::{register_batch_metrics, JobScheduler};
use shopfront_core::environment::SystemClock;
use shopfront_server::{bootstrap, build_router, Config};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shopfront=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Shopfront HTTP Server");

    let config = Config::from_env();
    info!(
        address = %config.server.address(),
        postgres = config.postgres.is_some(),
        redis = config.redis.is_some(),
        batch_enabled = config.batch.enabled,
        "Configuration loaded"
    );
    if config.auth.uses_dev_secret() {
        warn!("JWT_SECRET not set; using the development secret");
    }

    // Metrics
    let metrics = PrometheusBuilder::new().install_recorder()?;
    shopfront_commerce::metrics::register_commerce_metrics();
    shopfront_auth::register_auth_metrics();
    shopfront_cache::register_cache_metrics();
    register_batch_metrics();

    let state = bootstrap(&config).await?.with_metrics(metrics);

    // Scheduled jobs
    let scheduler = if config.batch.enabled {
        let (scheduler, shutdown) =
            JobScheduler::new(state.batch.clone(), &config.batch, Arc::new(SystemClock))?;
        info!(
            order_report = %config.batch.order_report_cron,
            user_statistics = %config.batch.user_statistics_cron,
            "Batch scheduler started"
        );
        Some((tokio::spawn(scheduler.run()), shutdown))
    } else {
        info!("Batch scheduler disabled");
        None
    };

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.server.address()).await?;
    info!(address = %listener.local_addr()?, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some((handle, shutdown)) = scheduler {
        shutdown.send(true).ok();
        if let Err(e) = handle.await {
            error!(error = %e, "Batch scheduler task failed");
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Wait for a shutdown signal.
///
/// Waits for:
/// - Ctrl+C (SIGINT)
/// - SIGTERM (in production environments)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
