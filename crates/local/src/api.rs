//! Client for the Bakery Orders HTTP API.
//!
//! Every response uses the `{success, message?, data?, pagination?}`
//! envelope; errors carry `{success: false, message, errors?}`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use bakery_core::{FieldError, OrderDraft, OrderId, OrderStatus, ServerOrder, StatusWorkflow};

use crate::store::{KeyValueStore, SERVER_CACHE_KEY, StoreError};

/// Errors that can occur when calling the API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server could not be reached.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server rejected the input.
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    /// The order does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The base URL is unusable.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Whether the failure means the server is unreachable rather than
    /// that it answered with an error.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<FieldError>,
}

/// Pagination block of a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}

/// `GET /api/health` body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceStatus {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the server started.
    pub uptime: f64,
    pub environment: String,
}

/// List filters and paging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub status: Option<OrderStatus>,
    /// `YYYY-MM-DD`.
    pub date: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListQuery {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_owned()));
        }
        if let Some(date) = &self.date {
            pairs.push(("date", date.clone()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

/// One page of orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderList {
    pub orders: Vec<ServerOrder>,
    pub pagination: Option<Pagination>,
}

/// Bakery Orders API client.
#[derive(Clone)]
pub struct ServerClient {
    inner: Arc<ServerClientInner>,
}

struct ServerClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl ServerClient {
    /// Create a client for the server at `base_url` (e.g. `http://127.0.0.1:3000`).
    ///
    /// # Errors
    ///
    /// Returns error if the URL does not parse or the HTTP client fails to build.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Config(format!("invalid server URL {base_url}: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            inner: Arc::new(ServerClientInner { client, base_url }),
        })
    }

    /// The server root this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| ApiError::Config(format!("invalid path {path}: {e}")))
    }

    fn order_url(&self, id: &OrderId, suffix: &str) -> Result<Url, ApiError> {
        self.url(&format!("api/orders/{id}{suffix}"))
    }

    /// Decode a success envelope, or map the error envelope.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Envelope<T>, ApiError> {
        if response.status().is_success() {
            return response
                .json()
                .await
                .map_err(|e| ApiError::Parse(format!("Failed to parse response: {e}")));
        }

        Err(Self::parse_error(response).await)
    }

    async fn parse_error(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let envelope: Option<ErrorEnvelope> = serde_json::from_str(&body).ok();
        let message = envelope
            .as_ref()
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| "Unknown error".to_string());

        match status {
            400 => ApiError::Validation {
                message,
                errors: envelope.map(|e| e.errors).unwrap_or_default(),
            },
            404 => ApiError::NotFound(message),
            _ => {
                tracing::error!(status, %message, "Bakery API error");
                ApiError::Api { status, message }
            }
        }
    }

    fn require_data<T>(envelope: Envelope<T>) -> Result<T, ApiError> {
        envelope
            .data
            .ok_or_else(|| ApiError::Parse("response has no data".to_string()))
    }

    /// `GET /api/health`.
    ///
    /// # Errors
    ///
    /// Returns error if the server is unreachable or unhealthy.
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<ServiceStatus, ApiError> {
        let response = self.inner.client.get(self.url("api/health")?).send().await?;
        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(format!("Failed to parse health: {e}")))
    }

    /// `GET /api/orders`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the query is rejected.
    #[instrument(skip(self))]
    pub async fn list(&self, query: &ListQuery) -> Result<OrderList, ApiError> {
        let mut url = self.url("api/orders")?;
        let pairs = query.pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        let response = self.inner.client.get(url).send().await?;
        let envelope: Envelope<Vec<ServerOrder>> = Self::handle_response(response).await?;
        let pagination = envelope.pagination;
        Ok(OrderList {
            orders: Self::require_data(envelope)?,
            pagination,
        })
    }

    /// `GET /api/orders/{id}`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown id.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get(&self, id: &OrderId) -> Result<ServerOrder, ApiError> {
        let response = self.inner.client.get(self.order_url(id, "")?).send().await?;
        Self::require_data(Self::handle_response(response).await?)
    }

    /// `POST /api/orders`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] with every failing field.
    #[instrument(skip(self, draft))]
    pub async fn create(&self, draft: &OrderDraft) -> Result<ServerOrder, ApiError> {
        let response = self
            .inner
            .client
            .post(self.url("api/orders")?)
            .json(draft)
            .send()
            .await?;
        let envelope: Envelope<ServerOrder> = Self::handle_response(response).await?;
        if let Some(message) = &envelope.message {
            tracing::debug!(%message, "Order created");
        }
        Self::require_data(envelope)
    }

    /// `PUT /api/orders/{id}`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] or [`ApiError::Validation`].
    #[instrument(skip(self, draft), fields(order_id = %id))]
    pub async fn update(&self, id: &OrderId, draft: &OrderDraft) -> Result<ServerOrder, ApiError> {
        let response = self
            .inner
            .client
            .put(self.order_url(id, "")?)
            .json(draft)
            .send()
            .await?;
        Self::require_data(Self::handle_response(response).await?)
    }

    /// `PATCH /api/orders/{id}/status`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown id.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn set_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<ServerOrder, ApiError> {
        let response = self
            .inner
            .client
            .patch(self.order_url(id, "/status")?)
            .json(&serde_json::json!({ "status": status.as_str() }))
            .send()
            .await?;
        Self::require_data(Self::handle_response(response).await?)
    }

    /// Move an order to the next state of the server workflow.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown id.
    pub async fn advance_status(&self, order: &ServerOrder) -> Result<ServerOrder, ApiError> {
        self.set_status(&order.id, order.status.next()).await
    }

    /// `DELETE /api/orders/{id}`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown id.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn delete(&self, id: &OrderId) -> Result<(), ApiError> {
        let response = self
            .inner
            .client
            .delete(self.order_url(id, "")?)
            .send()
            .await?;
        let _: Envelope<serde_json::Value> = Self::handle_response(response).await?;
        Ok(())
    }
}

impl std::fmt::Debug for ServerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Offline fallback
// =============================================================================

/// Whether orders came from the server or the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

/// Orders for display, with their provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedOrders {
    pub orders: Vec<ServerOrder>,
    pub connectivity: Connectivity,
}

/// Errors from [`load_with_fallback`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// The server answered with an error that is not a connectivity problem.
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Clean up orders received from the server before caching them.
pub fn normalize_orders(orders: &mut [ServerOrder]) {
    for order in orders {
        order.normalize_delivery_date();
        order.normalize_delivery_time();
    }
}

/// Fetch the server's orders, caching them locally; fall back to the cache
/// when the server cannot be reached.
///
/// # Errors
///
/// Returns [`LoadError::Api`] when the server answers with a client error
/// and [`LoadError::Store`] when the cache cannot be read or written.
#[instrument(skip_all)]
pub async fn load_with_fallback<S: KeyValueStore>(
    client: &ServerClient,
    store: &S,
    query: &ListQuery,
) -> Result<LoadedOrders, LoadError> {
    let fetched = async {
        client.health().await?;
        client.list(query).await
    }
    .await;

    match fetched {
        Ok(list) => {
            let mut orders = list.orders;
            normalize_orders(&mut orders);
            store.set_json(SERVER_CACHE_KEY, &orders)?;
            tracing::debug!(orders = orders.len(), "Server orders cached");
            Ok(LoadedOrders {
                orders,
                connectivity: Connectivity::Online,
            })
        }
        Err(err) if err.is_connectivity() => {
            tracing::warn!(error = %err, "Server unreachable, using cached orders");
            let orders = cached_orders(store)?;
            Ok(LoadedOrders {
                orders,
                connectivity: Connectivity::Offline,
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Orders from the offline cache. A missing cache is empty.
///
/// # Errors
///
/// Returns [`StoreError`] if the cache cannot be read or decoded.
pub fn cached_orders<S: KeyValueStore>(store: &S) -> Result<Vec<ServerOrder>, StoreError> {
    Ok(store.get_json(SERVER_CACHE_KEY)?.unwrap_or_default())
}
