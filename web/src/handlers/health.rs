//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Health of one component or of the whole service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    /// Working
    Up,
    /// Not reachable or failing
    Down,
}

/// Liveness body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Liveness {
    /// Always `UP` while the process serves requests
    pub status: HealthStatus,
    /// Service name
    pub service: &'static str,
}

/// Simple health check endpoint (for basic liveness).
///
/// Returns 200 OK to indicate the service is running.
/// This endpoint does NOT check dependencies (database, etc.).
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// { "status": "UP", "service": "shopfront" }
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> Json<Liveness> {
    Json(Liveness {
        status: HealthStatus::Up,
        service: "shopfront",
    })
}

/// Readiness report over the service's dependencies.
///
/// Renders 200 when every component is up and 503 otherwise.
///
/// # Response
///
/// ```json
/// { "status": "DOWN", "components": { "database": "UP", "cache": "DOWN" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readiness {
    /// `UP` only if every component is up
    pub status: HealthStatus,
    /// Per-component status
    pub components: BTreeMap<String, HealthStatus>,
}

impl Readiness {
    /// Build a report from component results.
    pub fn from_components<I, K>(components: I) -> Self
    where
        I: IntoIterator<Item = (K, bool)>,
        K: Into<String>,
    {
        let components: BTreeMap<String, HealthStatus> = components
            .into_iter()
            .map(|(name, up)| {
                let status = if up { HealthStatus::Up } else { HealthStatus::Down };
                (name.into(), status)
            })
            .collect();
        let status = if components.values().all(|s| *s == HealthStatus::Up) {
            HealthStatus::Up
        } else {
            HealthStatus::Down
        };
        Self { status, components }
    }
}

impl IntoResponse for Readiness {
    fn into_response(self) -> Response {
        let status = match self.status {
            HealthStatus::Up => StatusCode::OK,
            HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
        };
        if status != StatusCode::OK {
            tracing::warn!(components = ?self.components, "Readiness check failed");
        }
        (status, Json(self)).into_response()
    }
}
