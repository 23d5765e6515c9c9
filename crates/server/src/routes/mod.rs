//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                  - Liveness check
//! GET    /health/ready            - Readiness check (database)
//! GET    /api/health              - Service status
//!
//! GET    /api/orders              - List orders (?status, ?date, ?page, ?limit)
//! GET    /api/orders/stats        - Order counts
//! GET    /api/orders/{id}         - Get one order
//! POST   /api/orders              - Create order
//! PUT    /api/orders/{id}         - Replace order
//! PATCH  /api/orders/{id}/status  - Set status
//! DELETE /api/orders/{id}         - Delete order
//! ```

pub mod health;
pub mod orders;

use axum::{
    Json, Router,
    extract::FromRequest,
    http::{StatusCode, Uri},
};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// Build the complete router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/orders", orders::router())
}

/// JSON extractor whose rejections use the API error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Pagination block of list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}

/// Success envelope: `{"success": true, "message"?, "data"?, "pagination"?}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> ApiResponse<T> {
    /// Response carrying `data`.
    pub const fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            pagination: None,
        }
    }

    /// Attach a message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    /// Response carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            pagination: None,
        }
    }
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<()>>) {
    tracing::debug!(path = %uri.path(), "Route not found");
    let body = ApiResponse {
        success: false,
        message: Some("Route not found".to_string()),
        data: None,
        pagination: None,
    };
    (StatusCode::NOT_FOUND, Json(body))
}
