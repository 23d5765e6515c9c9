//! Order CRUD handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;

use bakery_core::{
    DraftRules, FieldError, OrderDraft, OrderId, OrderStatus, ServerOrder, StatusWorkflow,
    ValidationErrors,
};

use super::{ApiResponse, AppJson, Pagination};
use crate::db::{ListParams, OrderRepository, OrderStats};
use crate::error::{AppError, Result};
use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 100;

/// Build the orders router (mounted at `/api/orders`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/stats", get(order_stats))
        .route(
            "/{id}",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/{id}/status", patch(update_status))
}

// =============================================================================
// Request Types
// =============================================================================

/// Query parameters for the order list.
///
/// Kept as raw strings so malformed values produce field errors in the
/// API envelope.
#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<String>,
    pub date: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl OrdersQuery {
    /// Validate the query into repository parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] naming every malformed parameter.
    pub fn into_params(self) -> std::result::Result<ListParams, ValidationErrors> {
        let mut errors = Vec::new();
        let mut fail = |field: &str, message: &str| {
            errors.push(FieldError {
                field: field.to_string(),
                message: message.to_string(),
            });
        };

        let status = match non_empty(self.status.as_deref()) {
            None => None,
            Some(raw) => OrderStatus::parse(raw)
                .map_err(|_| fail("status", "invalid status"))
                .ok(),
        };

        let date = match non_empty(self.date.as_deref()) {
            None => None,
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| fail("date", "date must be YYYY-MM-DD"))
                .ok(),
        };

        let page = match non_empty(self.page.as_deref()) {
            None => 1,
            Some(raw) => match raw.parse::<u32>() {
                Ok(page) if page >= 1 => page,
                _ => {
                    fail("page", "page must be a positive integer");
                    1
                }
            },
        };

        let limit = match non_empty(self.limit.as_deref()) {
            None => DEFAULT_LIMIT,
            Some(raw) => match raw.parse::<u32>() {
                Ok(limit) if (1..=MAX_LIMIT).contains(&limit) => limit,
                _ => {
                    fail("limit", "limit must be between 1 and 100");
                    DEFAULT_LIMIT
                }
            },
        };

        if !errors.is_empty() {
            return Err(ValidationErrors(errors));
        }

        Ok(ListParams {
            status,
            date,
            page,
            limit,
        })
    }
}

/// Body of `PATCH /api/orders/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub status: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_id(raw: &str) -> Result<OrderId> {
    OrderId::parse_server(raw).map_err(|_| AppError::BadRequest("Invalid order id".to_string()))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// =============================================================================
// Handlers
// =============================================================================

/// List orders with filters and pagination.
///
/// # Errors
///
/// Returns 400 for malformed query parameters, 500 on database failure.
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<ApiResponse<Vec<ServerOrder>>>> {
    let params = query.into_params()?;
    let page = OrderRepository::new(state.pool()).list(params).await?;

    let pagination = Pagination {
        page: page.page,
        limit: page.limit,
        total: page.total,
        pages: page.pages(),
    };

    Ok(Json(ApiResponse {
        pagination: Some(pagination),
        ..ApiResponse::data(page.orders)
    }))
}

/// Order counts: total, due today, and per status.
///
/// # Errors
///
/// Returns 500 on database failure.
pub async fn order_stats(State(state): State<AppState>) -> Result<Json<ApiResponse<OrderStats>>> {
    let stats = OrderRepository::new(state.pool()).stats(today()).await?;
    Ok(Json(ApiResponse::data(stats)))
}

/// Get one order.
///
/// # Errors
///
/// Returns 400 for a malformed id, 404 if the order does not exist.
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ServerOrder>>> {
    let id = parse_id(&id)?;
    let order = OrderRepository::new(state.pool())
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    Ok(Json(ApiResponse::data(order)))
}

/// Create an order.
///
/// # Errors
///
/// Returns 400 with field errors if the draft is invalid.
pub async fn create_order(
    State(state): State<AppState>,
    AppJson(draft): AppJson<OrderDraft>,
) -> Result<(StatusCode, Json<ApiResponse<ServerOrder>>)> {
    let valid = draft.validate::<OrderStatus>(DraftRules::SERVER, today())?;
    let order = OrderRepository::new(state.pool()).create(&valid).await?;

    tracing::info!(order_id = %order.id, "Order created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(order).with_message("Order created")),
    ))
}

/// Replace an order's fields.
///
/// # Errors
///
/// Returns 400 for a malformed id or invalid draft, 404 if the order does not exist.
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(draft): AppJson<OrderDraft>,
) -> Result<Json<ApiResponse<ServerOrder>>> {
    let id = parse_id(&id)?;
    let valid = draft.validate::<OrderStatus>(DraftRules::SERVER, today())?;
    let order = OrderRepository::new(state.pool()).update(&id, &valid).await?;

    tracing::info!(order_id = %order.id, "Order updated");
    Ok(Json(ApiResponse::data(order).with_message("Order updated")))
}

/// Set an order's status.
///
/// # Errors
///
/// Returns 400 for a malformed id or unknown status, 404 if the order does not exist.
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(body): AppJson<StatusUpdate>,
) -> Result<Json<ApiResponse<ServerOrder>>> {
    let id = parse_id(&id)?;
    let status = match non_empty(body.status.as_deref()) {
        None => Err(field_error("status", "status is required")),
        Some(raw) => OrderStatus::parse(raw).map_err(|_| field_error("status", "invalid status")),
    }?;

    let order = OrderRepository::new(state.pool())
        .set_status(&id, status)
        .await?;

    tracing::info!(order_id = %order.id, status = %order.status, "Order status changed");
    Ok(Json(ApiResponse::data(order).with_message("Status updated")))
}

/// Delete an order.
///
/// # Errors
///
/// Returns 400 for a malformed id, 404 if the order does not exist.
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    let id = parse_id(&id)?;
    OrderRepository::new(state.pool()).delete(&id).await?;

    tracing::info!(order_id = %id, "Order deleted");
    Ok(Json(ApiResponse::message("Order deleted")))
}

fn field_error(field: &str, message: &str) -> AppError {
    AppError::Validation(ValidationErrors(vec![FieldError {
        field: field.to_string(),
        message: message.to_string(),
    }]))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(status: &str, date: &str, page: &str, limit: &str) -> OrdersQuery {
        let opt = |s: &str| (!s.is_empty()).then(|| s.to_string());
        OrdersQuery {
            status: opt(status),
            date: opt(date),
            page: opt(page),
            limit: opt(limit),
        }
    }

    #[test]
    fn test_query_defaults() {
        let params = OrdersQuery::default().into_params().unwrap();
        assert_eq!(params, ListParams::default());
    }

    #[test]
    fn test_query_parses_filters() {
        let params = query("en_preparacion", "2026-08-01", "2", "10")
            .into_params()
            .unwrap();
        assert_eq!(params.status, Some(OrderStatus::EnPreparacion));
        assert_eq!(params.date, NaiveDate::from_ymd_opt(2026, 8, 1));
        assert_eq!(params.page, 2);
        assert_eq!(params.limit, 10);
    }

    #[test]
    fn test_query_reports_every_bad_param() {
        let err = query("cancelado", "01/08/2026", "0", "101")
            .into_params()
            .unwrap_err();
        for field in ["status", "date", "page", "limit"] {
            assert!(err.has_field(field), "expected error for {field}");
        }
    }

    #[test]
    fn test_query_limit_bounds() {
        assert_eq!(query("", "", "", "1").into_params().unwrap().limit, 1);
        assert_eq!(query("", "", "", "100").into_params().unwrap().limit, 100);
        assert!(query("", "", "", "abc").into_params().is_err());
    }

    #[test]
    fn test_parse_id() {
        assert!(parse_id("6f1c2a4e-8a43-4c1b-9d53-2f0a9f3e7b10").is_ok());
        assert!(matches!(
            parse_id("64b7f0c2e4b0a1a2b3c4d5e6"),
            Err(AppError::BadRequest(_))
        ));
    }
}
