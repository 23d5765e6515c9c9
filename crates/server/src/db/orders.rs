//! Order repository.
//!
//! Queries are checked at runtime (`query_as::<_, T>`), so building the
//! crate does not need a live database.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use bakery_core::{OrderId, OrderItem, OrderStatus, ServerOrder, ValidOrder};

use super::RepositoryError;

macro_rules! order_columns {
    () => {
        "id, customer_name, customer_phone, delivery_date, delivery_time, items, \
         notes, total_amount, status, created_at, updated_at"
    };
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    customer_name: String,
    customer_phone: Option<String>,
    delivery_date: NaiveDate,
    delivery_time: String,
    items: Json<Vec<OrderItem>>,
    notes: Option<String>,
    total_amount: Option<String>,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for ServerOrder {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            delivery_date: row.delivery_date.format("%Y-%m-%d").to_string(),
            delivery_time: row.delivery_time,
            items: row.items.0,
            notes: row.notes,
            total_amount: row.total_amount,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// =============================================================================
// Query Types
// =============================================================================

/// Filter and page selection for [`OrderRepository::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    pub status: Option<OrderStatus>,
    pub date: Option<NaiveDate>,
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            status: None,
            date: None,
            page: 1,
            limit: 50,
        }
    }
}

impl ListParams {
    /// Rows to skip before this page.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }
}

/// One page of orders plus the total match count.
#[derive(Debug, Clone)]
pub struct OrderPage {
    pub orders: Vec<ServerOrder>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

impl OrderPage {
    /// Number of pages needed for `total` rows.
    #[must_use]
    pub fn pages(&self) -> i64 {
        if self.limit == 0 {
            return 0;
        }
        let limit = i64::from(self.limit);
        (self.total + limit - 1) / limit
    }
}

/// Order count for one status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

/// Summary counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total: i64,
    /// Orders due for delivery today.
    pub today_orders: i64,
    pub by_status: Vec<StatusCount>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List orders matching the filter, earliest delivery first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, params: ListParams) -> Result<OrderPage, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders
            WHERE ($1::order_status IS NULL OR status = $1)
              AND ($2::date IS NULL OR delivery_date = $2)
            ORDER BY delivery_date ASC, delivery_time ASC, created_at ASC
            LIMIT $3 OFFSET $4"
        ))
        .bind(params.status)
        .bind(params.date)
        .bind(i64::from(params.limit))
        .bind(params.offset())
        .fetch_all(self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*) FROM orders
            WHERE ($1::order_status IS NULL OR status = $1)
              AND ($2::date IS NULL OR delivery_date = $2)
            ",
        )
        .bind(params.status)
        .bind(params.date)
        .fetch_one(self.pool)
        .await?;

        Ok(OrderPage {
            orders: rows.into_iter().map(Into::into).collect(),
            total,
            page: params.page,
            limit: params.limit,
        })
    }

    /// Get an order by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get(&self, id: &OrderId) -> Result<Option<ServerOrder>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Insert a new order with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id already exists.
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, order), fields(customer = %order.customer_name))]
    pub async fn create(
        &self,
        order: &ValidOrder<OrderStatus>,
    ) -> Result<ServerOrder, RepositoryError> {
        let id = OrderId::new_server();
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "INSERT INTO orders
                (id, customer_name, customer_phone, delivery_date, delivery_time,
                 items, notes, total_amount, status)
            VALUES ($1, $2, $3, $4::date, $5, $6, $7, $8,
                    COALESCE($9, 'pendiente'::order_status))
            RETURNING ",
            order_columns!()
        ))
        .bind(&id)
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(&order.delivery_date)
        .bind(&order.delivery_time)
        .bind(Json(&order.items))
        .bind(&order.notes)
        .bind(&order.total_amount)
        .bind(order.status)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("order id already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(row.into())
    }

    /// Replace an order's fields. A `None` status keeps the current one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has this id.
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, order), fields(order_id = %id))]
    pub async fn update(
        &self,
        id: &OrderId,
        order: &ValidOrder<OrderStatus>,
    ) -> Result<ServerOrder, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "UPDATE orders SET
                customer_name = $2,
                customer_phone = $3,
                delivery_date = $4::date,
                delivery_time = $5,
                items = $6,
                notes = $7,
                total_amount = $8,
                status = COALESCE($9, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING ",
            order_columns!()
        ))
        .bind(id)
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(&order.delivery_date)
        .bind(&order.delivery_time)
        .bind(Json(&order.items))
        .bind(&order.notes)
        .bind(&order.total_amount)
        .bind(order.status)
        .fetch_optional(self.pool)
        .await?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Set an order's status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has this id.
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn set_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<ServerOrder, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "UPDATE orders SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING ",
            order_columns!()
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Delete an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has this id.
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn delete(&self, id: &OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Count orders overall, for `today`, and per status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn stats(&self, today: NaiveDate) -> Result<OrderStats, RepositoryError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders")
            .fetch_one(self.pool)
            .await?;

        let today_orders =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE delivery_date = $1")
                .bind(today)
                .fetch_one(self.pool)
                .await?;

        let by_status = sqlx::query_as::<_, StatusCount>(
            r"
            SELECT status, COUNT(*) AS count
            FROM orders
            GROUP BY status
            ORDER BY status
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(OrderStats {
            total,
            today_orders,
            by_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(total: i64, limit: u32) -> OrderPage {
        OrderPage {
            orders: Vec::new(),
            total,
            page: 1,
            limit,
        }
    }

    #[test]
    fn test_pages_rounds_up() {
        assert_eq!(page(0, 50).pages(), 0);
        assert_eq!(page(1, 50).pages(), 1);
        assert_eq!(page(50, 50).pages(), 1);
        assert_eq!(page(51, 50).pages(), 2);
        assert_eq!(page(7, 0).pages(), 0);
    }

    #[test]
    fn test_offset() {
        let params = ListParams {
            page: 3,
            limit: 20,
            ..ListParams::default()
        };
        assert_eq!(params.offset(), 40);
        assert_eq!(ListParams::default().offset(), 0);
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let stats = OrderStats {
            total: 3,
            today_orders: 1,
            by_status: vec![StatusCount {
                status: OrderStatus::Listo,
                count: 3,
            }],
        };
        let json = serde_json::to_value(&stats).unwrap_or_default();
        assert_eq!(json["todayOrders"], 1);
        assert_eq!(json["byStatus"][0]["status"], "listo");
    }
}
