//! Commands against a running Bakery Orders server.
//!
//! # Usage
//!
//! ```bash
//! bakery server health
//! bakery server list --status confirmado --date 2026-11-02
//! bakery server advance <ID>
//! bakery server delete <ID>
//! ```
//!
//! # Environment Variables
//!
//! - `BAKERY_SERVER_URL` - Server root (default `http://127.0.0.1:3000`)

use thiserror::Error;

use bakery_core::{InvalidStatus, OrderId, OrderStatus, StatusWorkflow};
use bakery_local::api::{Connectivity, ListQuery, load_with_fallback};
use bakery_local::{ApiError, KeyValueStore, LoadError, ServerClient};

use super::orders::print_order;

/// Errors from server commands.
#[derive(Debug, Error)]
pub enum ServerCommandError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Status(#[from] InvalidStatus),
}

/// Check that the server is up.
///
/// # Errors
///
/// Returns error if the server is unreachable or unhealthy.
pub async fn health(client: &ServerClient) -> Result<(), ServerCommandError> {
    let status = client.health().await?;
    tracing::info!(
        environment = %status.environment,
        uptime_secs = status.uptime,
        "{}",
        status.message
    );
    Ok(())
}

/// List server orders, falling back to the local cache when offline.
///
/// # Errors
///
/// Returns error if `status` is unknown or the server rejects the query.
pub async fn list<S: KeyValueStore>(
    client: &ServerClient,
    store: &S,
    status: Option<&str>,
    date: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
) -> Result<(), ServerCommandError> {
    let query = ListQuery {
        status: status.map(str::parse::<OrderStatus>).transpose()?,
        date,
        page,
        limit,
    };

    let loaded = load_with_fallback(client, store, &query).await?;
    if loaded.connectivity == Connectivity::Offline {
        tracing::warn!(url = %client.base_url(), "Server unreachable; showing cached orders");
    }
    for order in &loaded.orders {
        print_order(order);
    }
    Ok(())
}

/// Advance an order along the server workflow.
///
/// # Errors
///
/// Returns error if the order does not exist or the request fails.
pub async fn advance(client: &ServerClient, id: &OrderId) -> Result<(), ServerCommandError> {
    let order = client.get(id).await?;
    let updated = client.advance_status(&order).await?;
    tracing::info!(order_id = %id, "Status is now {}", updated.status.label());
    Ok(())
}

/// Delete an order on the server.
///
/// # Errors
///
/// Returns error if the order does not exist or the request fails.
pub async fn delete(client: &ServerClient, id: &OrderId) -> Result<(), ServerCommandError> {
    client.delete(id).await?;
    tracing::info!(order_id = %id, "Order deleted");
    Ok(())
}
