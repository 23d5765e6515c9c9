//! The standalone order book.
//!
//! Holds the local order list in memory and writes it through to the
//! store under `bakery_orders` after every mutation.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::instrument;

use bakery_core::{
    DraftRules, LocalOrder, LocalStatus, Order, OrderDraft, OrderFilter, OrderId,
    ValidationErrors,
};

use crate::store::{KeyValueStore, ORDERS_KEY, StoreError};

/// Order book errors.
#[derive(Debug, Error)]
pub enum BookError {
    /// The draft failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// No order has this id.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// The store could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Local order list with write-through persistence.
#[derive(Debug)]
pub struct OrderBook<S> {
    store: S,
    orders: Vec<LocalOrder>,
}

impl<S: KeyValueStore> OrderBook<S> {
    /// Load the order book from `store`. A missing entry is an empty book.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the stored list cannot be read or decoded.
    pub fn open(store: S) -> Result<Self, StoreError> {
        let orders = store.get_json(ORDERS_KEY)?.unwrap_or_default();
        Ok(Self { store, orders })
    }

    /// The backing store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Every order, in storage order.
    #[must_use]
    pub fn orders(&self) -> &[LocalOrder] {
        &self.orders
    }

    /// Orders matching `filter`, earliest delivery first.
    #[must_use]
    pub fn list(&self, filter: &OrderFilter<LocalStatus>) -> Vec<&LocalOrder> {
        filter.apply(&self.orders)
    }

    /// Look up an order.
    #[must_use]
    pub fn get(&self, id: &OrderId) -> Option<&LocalOrder> {
        self.orders.iter().find(|o| &o.id == id)
    }

    /// Validate `draft` and append it as a new order.
    ///
    /// # Errors
    ///
    /// Returns [`BookError::Validation`] for an invalid draft and
    /// [`BookError::Store`] if the list cannot be persisted.
    #[instrument(skip(self, draft), fields(customer = %draft.customer_name.trim()))]
    pub fn create(&mut self, draft: &OrderDraft, now: DateTime<Utc>) -> Result<&LocalOrder, BookError> {
        let valid = draft.validate::<LocalStatus>(DraftRules::LOCAL, now.date_naive())?;

        let order = Order {
            id: OrderId::generate_local(now),
            customer_name: valid.customer_name,
            customer_phone: valid.customer_phone,
            delivery_date: valid.delivery_date,
            delivery_time: valid.delivery_time,
            items: valid.items,
            notes: valid.notes,
            total_amount: valid.total_amount,
            status: valid.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        let id = order.id.clone();
        tracing::debug!(order_id = %id, "Order created");
        self.orders.push(order);
        self.persist()?;
        self.orders.last().ok_or(BookError::NotFound(id))
    }

    /// Replace an order's fields, keeping its id, creation time and (unless
    /// the draft names one) its status.
    ///
    /// # Errors
    ///
    /// Returns [`BookError::NotFound`], [`BookError::Validation`] or
    /// [`BookError::Store`].
    #[instrument(skip(self, draft), fields(order_id = %id))]
    pub fn update(
        &mut self,
        id: &OrderId,
        draft: &OrderDraft,
        now: DateTime<Utc>,
    ) -> Result<&LocalOrder, BookError> {
        let index = self.position(id)?;
        let valid = draft.validate::<LocalStatus>(DraftRules::LOCAL, now.date_naive())?;

        if let Some(order) = self.orders.get_mut(index) {
            order.customer_name = valid.customer_name;
            order.customer_phone = valid.customer_phone;
            order.delivery_date = valid.delivery_date;
            order.delivery_time = valid.delivery_time;
            order.items = valid.items;
            order.notes = valid.notes;
            order.total_amount = valid.total_amount;
            if let Some(status) = valid.status {
                order.status = status;
            }
            order.updated_at = now;
        }

        self.persist()?;
        self.orders
            .get(index)
            .ok_or_else(|| BookError::NotFound(id.clone()))
    }

    /// Move an order to its next status.
    ///
    /// # Errors
    ///
    /// Returns [`BookError::NotFound`] or [`BookError::Store`].
    #[instrument(skip(self), fields(order_id = %id))]
    pub fn advance_status(
        &mut self,
        id: &OrderId,
        now: DateTime<Utc>,
    ) -> Result<LocalStatus, BookError> {
        let order = self
            .orders
            .iter_mut()
            .find(|o| &o.id == id)
            .ok_or_else(|| BookError::NotFound(id.clone()))?;

        let status = order.advance_status(now);
        tracing::debug!(%status, "Order status advanced");
        self.persist()?;
        Ok(status)
    }

    /// Remove an order and return it.
    ///
    /// # Errors
    ///
    /// Returns [`BookError::NotFound`] or [`BookError::Store`].
    #[instrument(skip(self), fields(order_id = %id))]
    pub fn delete(&mut self, id: &OrderId) -> Result<LocalOrder, BookError> {
        let index = self.position(id)?;
        let removed = self.orders.remove(index);
        self.persist()?;
        Ok(removed)
    }

    /// Replace the whole list (used after a sync).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the list cannot be persisted.
    pub fn replace_all(&mut self, orders: Vec<LocalOrder>) -> Result<(), StoreError> {
        self.orders = orders;
        self.persist()
    }

    /// Re-read the list from the store, discarding in-memory state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the stored list cannot be read or decoded.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        self.orders = self.store.get_json(ORDERS_KEY)?.unwrap_or_default();
        Ok(())
    }

    fn position(&self, id: &OrderId) -> Result<usize, BookError> {
        self.orders
            .iter()
            .position(|o| &o.id == id)
            .ok_or_else(|| BookError::NotFound(id.clone()))
    }

    fn persist(&self) -> Result<(), StoreError> {
        self.store.set_json(ORDERS_KEY, &self.orders)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use bakery_core::ItemDraft;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, 8, 0, 0).unwrap()
    }

    fn draft(name: &str) -> OrderDraft {
        OrderDraft {
            customer_name: name.to_owned(),
            delivery_date: "2026-09-02".to_owned(),
            delivery_time: "10:00".to_owned(),
            items: vec![ItemDraft {
                product: "Pan de campo".to_owned(),
                quantity: "2".to_owned(),
                price: None,
            }],
            ..OrderDraft::default()
        }
    }

    #[test]
    fn test_create_persists() {
        let store = MemoryStore::new();
        let mut book = OrderBook::open(&store).unwrap();
        let id = book.create(&draft("Rosa"), now()).unwrap().id.clone();

        let reopened = OrderBook::open(&store).unwrap();
        let order = reopened.get(&id).unwrap();
        assert_eq!(order.customer_name, "Rosa");
        assert_eq!(order.status, LocalStatus::Pendiente);
        assert_eq!(order.created_at, now());
        assert_eq!(order.updated_at, now());
    }

    #[test]
    fn test_create_rejects_invalid_draft() {
        let mut book = OrderBook::open(MemoryStore::new()).unwrap();
        let err = book.create(&draft(""), now()).unwrap_err();
        assert!(matches!(err, BookError::Validation(_)));
        assert!(book.orders().is_empty());
    }

    #[test]
    fn test_update_keeps_identity_and_refreshes_updated_at() {
        let mut book = OrderBook::open(MemoryStore::new()).unwrap();
        let id = book.create(&draft("Rosa"), now()).unwrap().id.clone();
        book.advance_status(&id, now()).unwrap();

        let later = now() + Duration::minutes(3);
        let updated = book.update(&id, &draft("Rosa María"), later).unwrap();
        assert_eq!(updated.id, id);
        assert_eq!(updated.customer_name, "Rosa María");
        assert_eq!(updated.created_at, now());
        assert_eq!(updated.updated_at, later);
        assert_eq!(updated.status, LocalStatus::EnProceso);
    }

    #[test]
    fn test_advance_status_cycles() {
        let mut book = OrderBook::open(MemoryStore::new()).unwrap();
        let id = book.create(&draft("Rosa"), now()).unwrap().id.clone();

        let statuses: Vec<_> = (0..4)
            .map(|_| book.advance_status(&id, now()).unwrap())
            .collect();
        assert_eq!(
            statuses,
            [
                LocalStatus::EnProceso,
                LocalStatus::Completado,
                LocalStatus::Cancelado,
                LocalStatus::Pendiente
            ]
        );
    }

    #[test]
    fn test_delete_and_missing_ids() {
        let store = MemoryStore::new();
        let mut book = OrderBook::open(&store).unwrap();
        let id = book.create(&draft("Rosa"), now()).unwrap().id.clone();

        assert_eq!(book.delete(&id).unwrap().customer_name, "Rosa");
        assert!(OrderBook::open(&store).unwrap().orders().is_empty());

        assert!(matches!(book.delete(&id), Err(BookError::NotFound(_))));
        assert!(matches!(
            book.advance_status(&id, now()),
            Err(BookError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_filters_and_sorts() {
        let mut book = OrderBook::open(MemoryStore::new()).unwrap();
        let mut late = draft("Late");
        late.delivery_time = "18:00".to_owned();
        book.create(&late, now()).unwrap();
        book.create(&draft("Early"), now()).unwrap();

        let names: Vec<_> = book
            .list(&OrderFilter::default())
            .into_iter()
            .map(|o| o.customer_name.as_str())
            .collect();
        assert_eq!(names, ["Early", "Late"]);
    }
}
