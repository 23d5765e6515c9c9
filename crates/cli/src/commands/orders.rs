//! Local order book commands.
//!
//! # Usage
//!
//! ```bash
//! bakery orders add -n "Rosa" -d 2026-11-02 -t 08:30 -i "Pan de campo:2" -i "Medialunas:12:6000"
//! bakery orders list --status pendiente
//! bakery orders edit <ID> -t 09:00
//! bakery orders advance <ID>
//! bakery orders delete <ID>
//! ```

use chrono::{DateTime, Utc};
use clap::Args;
use thiserror::Error;

use bakery_core::{
    InvalidStatus, ItemDraft, LocalOrder, LocalStatus, OrderDraft, OrderFilter, OrderId,
    StatusWorkflow,
};
use bakery_local::{BookError, KeyValueStore, OrderBook};

/// Errors from order commands.
#[derive(Debug, Error)]
pub enum OrdersError {
    #[error(transparent)]
    Book(#[from] BookError),

    #[error(transparent)]
    Status(#[from] InvalidStatus),

    #[error("Invalid item {0:?}: expected PRODUCT:QUANTITY[:PRICE]")]
    InvalidItem(String),
}

/// Order fields. On `edit`, omitted fields keep their current value.
#[derive(Debug, Default, Args)]
pub struct OrderFields {
    /// Customer name
    #[arg(short, long)]
    pub name: Option<String>,

    /// Customer phone
    #[arg(long)]
    pub phone: Option<String>,

    /// Delivery date (YYYY-MM-DD)
    #[arg(short, long)]
    pub date: Option<String>,

    /// Delivery time (HH:MM)
    #[arg(short, long)]
    pub time: Option<String>,

    /// Line item, repeatable. Replaces all items on `edit`.
    #[arg(short, long = "item", value_name = "PRODUCT:QUANTITY[:PRICE]")]
    pub items: Vec<String>,

    /// Free-text notes
    #[arg(long)]
    pub notes: Option<String>,

    /// Order total, as entered
    #[arg(long)]
    pub total: Option<String>,

    /// Explicit status (`pendiente`, `en_proceso`, `completado`, `cancelado`)
    #[arg(long)]
    pub status: Option<String>,
}

impl OrderFields {
    /// Overlay the given fields on `draft`.
    fn apply(self, draft: &mut OrderDraft) -> Result<(), OrdersError> {
        if let Some(name) = self.name {
            draft.customer_name = name;
        }
        if let Some(phone) = self.phone {
            draft.customer_phone = Some(phone);
        }
        if let Some(date) = self.date {
            draft.delivery_date = date;
        }
        if let Some(time) = self.time {
            draft.delivery_time = time;
        }
        if !self.items.is_empty() {
            draft.items = self
                .items
                .iter()
                .map(|raw| parse_item(raw))
                .collect::<Result<_, _>>()?;
        }
        if let Some(notes) = self.notes {
            draft.notes = Some(notes);
        }
        if let Some(total) = self.total {
            draft.total_amount = Some(total);
        }
        if let Some(status) = self.status {
            draft.status = Some(status);
        }
        Ok(())
    }
}

/// Parse `PRODUCT:QUANTITY[:PRICE]`.
fn parse_item(raw: &str) -> Result<ItemDraft, OrdersError> {
    let mut parts = raw.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(product), Some(quantity), price) => Ok(ItemDraft {
            product: product.to_owned(),
            quantity: quantity.to_owned(),
            price: price.map(str::to_owned),
        }),
        _ => Err(OrdersError::InvalidItem(raw.to_owned())),
    }
}

/// The editable fields of an existing order.
fn draft_from(order: &LocalOrder) -> OrderDraft {
    OrderDraft {
        customer_name: order.customer_name.clone(),
        customer_phone: order.customer_phone.clone(),
        delivery_date: order.delivery_date.clone(),
        delivery_time: order.delivery_time.clone(),
        items: order
            .items
            .iter()
            .map(|item| ItemDraft {
                product: item.product.clone(),
                quantity: item.quantity.clone(),
                price: item.price.clone(),
            })
            .collect(),
        notes: order.notes.clone(),
        total_amount: order.total_amount.clone(),
        status: None,
    }
}

/// Create an order and print it.
///
/// # Errors
///
/// Returns error if an item is malformed, validation fails or the store
/// cannot be written.
pub fn add<S: KeyValueStore>(
    book: &mut OrderBook<S>,
    fields: OrderFields,
    now: DateTime<Utc>,
) -> Result<OrderId, OrdersError> {
    let mut draft = OrderDraft::default();
    fields.apply(&mut draft)?;
    let order = book.create(&draft, now)?;
    print_order(order);
    Ok(order.id.clone())
}

/// Print matching orders, earliest delivery first.
///
/// # Errors
///
/// Returns error if `status` is not a known status.
pub fn list<S: KeyValueStore>(
    book: &OrderBook<S>,
    status: Option<&str>,
    date: Option<String>,
) -> Result<(), OrdersError> {
    let filter = OrderFilter {
        status: status.map(str::parse::<LocalStatus>).transpose()?,
        date,
    };
    let orders = book.list(&filter);
    if orders.is_empty() {
        tracing::info!("No orders");
    }
    for order in orders {
        print_order(order);
    }
    Ok(())
}

/// Print one order in full.
///
/// # Errors
///
/// Returns [`BookError::NotFound`] for an unknown id.
pub fn show<S: KeyValueStore>(book: &OrderBook<S>, id: &OrderId) -> Result<(), OrdersError> {
    let order = book
        .get(id)
        .ok_or_else(|| BookError::NotFound(id.clone()))?;
    print_details(order);
    Ok(())
}

/// Change an order's fields.
///
/// # Errors
///
/// Returns error if the order is missing, an item is malformed or
/// validation fails.
pub fn edit<S: KeyValueStore>(
    book: &mut OrderBook<S>,
    id: &OrderId,
    fields: OrderFields,
    now: DateTime<Utc>,
) -> Result<(), OrdersError> {
    let mut draft = book
        .get(id)
        .map(draft_from)
        .ok_or_else(|| BookError::NotFound(id.clone()))?;
    fields.apply(&mut draft)?;
    print_order(book.update(id, &draft, now)?);
    Ok(())
}

/// Move an order to its next status.
///
/// # Errors
///
/// Returns [`BookError::NotFound`] for an unknown id.
pub fn advance<S: KeyValueStore>(
    book: &mut OrderBook<S>,
    id: &OrderId,
    now: DateTime<Utc>,
) -> Result<(), OrdersError> {
    let status = book.advance_status(id, now)?;
    tracing::info!(order_id = %id, "Status is now {}", status.label());
    Ok(())
}

/// Remove an order.
///
/// # Errors
///
/// Returns [`BookError::NotFound`] for an unknown id.
pub fn delete<S: KeyValueStore>(book: &mut OrderBook<S>, id: &OrderId) -> Result<(), OrdersError> {
    let removed = book.delete(id)?;
    tracing::info!(order_id = %id, customer = %removed.customer_name, "Order deleted");
    Ok(())
}

/// One-line summary.
#[allow(clippy::print_stdout)]
pub(crate) fn print_order<S: StatusWorkflow>(order: &bakery_core::Order<S>) {
    println!(
        "{}  {} {:<5}  {:<14}  {}  ({} items)",
        order.id,
        order.delivery_date,
        order.delivery_time,
        order.status.label(),
        order.customer_name,
        order.items.len()
    );
}

#[allow(clippy::print_stdout)]
fn print_details(order: &LocalOrder) {
    println!("Order     {}", order.id);
    println!("Customer  {}", order.customer_name);
    if let Some(phone) = &order.customer_phone {
        println!("Phone     {phone}");
    }
    println!("Delivery  {} {}", order.delivery_date, order.delivery_time);
    println!("Status    {}", order.status.label());
    for item in &order.items {
        match &item.price {
            Some(price) => println!("  - {} x {} ({price})", item.product, item.quantity),
            None => println!("  - {} x {}", item.product, item.quantity),
        }
    }
    if let Some(total) = &order.total_amount {
        println!("Total     {total}");
    }
    if let Some(notes) = &order.notes {
        println!("Notes     {notes}");
    }
    println!("Updated   {}", order.updated_at.to_rfc3339());
}
