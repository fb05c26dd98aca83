//! Readiness and metrics endpoints.
//!
//! Liveness (`/health`) comes from `shopfront_web`; it never touches
//! dependencies.

use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use shopfront_web::handlers::Readiness;
use std::time::Duration;

const DATABASE_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Readiness check endpoint.
///
/// Probes the database when one is configured. Returns 503 if any probe
/// fails.
///
/// # Endpoint
///
/// ```text
/// GET /ready
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> Readiness {
    let mut components = Vec::new();

    if let Some(pool) = &state.database {
        let probe = sqlx::query("SELECT 1").execute(pool);
        let up = match tokio::time::timeout(DATABASE_PROBE_TIMEOUT, probe).await {
            Ok(Ok(_)) => true,
            Ok(Err(error)) => {
                tracing::warn!(%error, "Database probe failed");
                false
            }
            Err(_) => {
                tracing::warn!("Database probe timed out");
                false
            }
        };
        components.push(("database", up));
    }

    Readiness::from_components(components)
}

/// Prometheus scrape endpoint.
///
/// Answers 503 when no recorder is installed, as in tests.
#[allow(clippy::unused_async)]
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => {
            (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response()
        }
    }
}
