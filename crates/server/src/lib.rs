//! Bakery Orders Server library.
//!
//! CRUD HTTP API for delivery orders, backed by `PostgreSQL`. The binary in
//! `main.rs` adds process set-up (tracing, Sentry, signals) around
//! [`app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use std::time::Duration;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use state::AppState;

/// Build the application router with request tracing, request ids and CORS.
pub fn app(state: AppState) -> Router {
    let cors = middleware::cors_layer(&state.config().allowed_origins);

    Router::new()
        .merge(routes::routes())
        .fallback(routes::not_found)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    /// Router over a pool that never connects; only paths that fail
    /// before reaching the database can be exercised.
    fn test_app() -> Router {
        let config = ServerConfig {
            database_url: SecretString::from("postgres://localhost/bakery_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            environment: "test".to_string(),
            allowed_origins: Vec::new(),
            log_json: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        };
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/bakery_test")
            .unwrap();
        app(AppState::new(config, pool))
    }

    async fn send(method: Method, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = test_app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_liveness() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_health() {
        let (status, json) = send(Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["environment"], "test");
        assert!(json["uptime"].is_number());
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (status, json) = send(Method::GET, "/api/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Route not found");
    }

    #[tokio::test]
    async fn test_malformed_id_is_400() {
        let (status, json) = send(Method::GET, "/api/orders/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Invalid order id");
    }

    #[tokio::test]
    async fn test_invalid_draft_is_400_with_fields() {
        let draft = serde_json::json!({
            "customerName": "",
            "deliveryDate": "2020-01-01",
            "deliveryTime": "10:00",
            "items": []
        });
        let (status, json) = send(Method::POST, "/api/orders", Some(draft)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);

        let fields: Vec<&str> = json["errors"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e["field"].as_str())
            .collect();
        assert!(fields.contains(&"customerName"));
        assert!(fields.contains(&"deliveryDate"));
        assert!(fields.contains(&"items"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_400_envelope() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/orders")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bad_list_params_are_400() {
        let (status, json) = send(Method::GET, "/api/orders?page=0&limit=500", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errors"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_status_patch_is_400() {
        let (status, json) = send(
            Method::PATCH,
            "/api/orders/6f1c2a4e-8a43-4c1b-9d53-2f0a9f3e7b10/status",
            Some(serde_json::json!({"status": "cancelado"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errors"][0]["field"], "status");
    }

    #[tokio::test]
    async fn test_request_id_header_set() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key(middleware::REQUEST_ID_HEADER));
    }
}
