//! Health check handlers.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

/// Build the health router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/api/health", get(status))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Body of `GET /api/health`.
#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub success: bool,
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
    /// Seconds since start-up.
    pub uptime: f64,
    pub environment: String,
}

async fn status(State(state): State<AppState>) -> Json<ServiceStatus> {
    Json(ServiceStatus {
        success: true,
        message: "Bakery orders API is running",
        timestamp: Utc::now(),
        uptime: state.uptime().as_secs_f64(),
        environment: state.config().environment.clone(),
    })
}
