//! Integration test support for Bakery Orders.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bakery-integration-tests
//! ```
//!
//! No network or database is needed: the gist is replaced by
//! [`FakeRemote`] and storage by [`bakery_local::MemoryStore`].
//!
//! # Test Files
//!
//! - `local_order_book` - order book mutations and persistence
//! - `local_sync` - push, pull and merge through the sync engine

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeZone, Utc};
use secrecy::SecretString;

use bakery_core::{
    ItemDraft, LocalOrder, LocalStatus, Order, OrderDraft, OrderId, OrderItem, Snapshot,
};
use bakery_local::gist::LocalSnapshot;
use bakery_local::store::LAST_SYNC_KEY;
use bakery_local::{KeyValueStore, MemoryStore, RemoteError, SnapshotStore, SyncConfig};

/// Remote operation, as recorded by [`FakeRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Fetch(String),
    Create,
    Update(String),
    Verify,
}

/// Scripted remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Unauthorized,
    Forbidden,
    NotFound,
    /// Stands in for a network failure.
    Unavailable,
}

impl Failure {
    fn into_error(self) -> RemoteError {
        match self {
            Self::Unauthorized => RemoteError::Unauthorized,
            Self::Forbidden => RemoteError::Forbidden,
            Self::NotFound => RemoteError::NotFound("gist not found".to_owned()),
            Self::Unavailable => RemoteError::Api {
                status: 503,
                message: "service unavailable".to_owned(),
            },
        }
    }
}

#[derive(Debug, Default)]
struct FakeState {
    gists: BTreeMap<String, LocalSnapshot>,
    created: u32,
    calls: Vec<Call>,
    fetch_failures: VecDeque<Failure>,
    create_failures: VecDeque<Failure>,
    update_failures: VecDeque<Failure>,
    verify_failures: VecDeque<Failure>,
}

/// In-memory gist service.
#[derive(Debug, Default)]
pub struct FakeRemote {
    state: Mutex<FakeState>,
}

impl FakeRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a gist.
    pub fn insert(&self, gist_id: &str, snapshot: LocalSnapshot) {
        self.state().gists.insert(gist_id.to_owned(), snapshot);
    }

    /// Current content of a gist.
    #[must_use]
    pub fn gist(&self, gist_id: &str) -> Option<LocalSnapshot> {
        self.state().gists.get(gist_id).cloned()
    }

    /// Number of gists held.
    #[must_use]
    pub fn gist_count(&self) -> usize {
        self.state().gists.len()
    }

    /// Every call so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn fail_next_fetch(&self, failure: Failure) {
        self.state().fetch_failures.push_back(failure);
    }

    pub fn fail_next_create(&self, failure: Failure) {
        self.state().create_failures.push_back(failure);
    }

    pub fn fail_next_update(&self, failure: Failure) {
        self.state().update_failures.push_back(failure);
    }

    pub fn fail_next_verify(&self, failure: Failure) {
        self.state().verify_failures.push_back(failure);
    }
}

impl SnapshotStore for FakeRemote {
    async fn fetch(&self, gist_id: &str) -> Result<LocalSnapshot, RemoteError> {
        let mut state = self.state();
        state.calls.push(Call::Fetch(gist_id.to_owned()));
        if let Some(failure) = state.fetch_failures.pop_front() {
            return Err(failure.into_error());
        }
        state
            .gists
            .get(gist_id)
            .cloned()
            .ok_or_else(|| Failure::NotFound.into_error())
    }

    async fn create(&self, snapshot: &LocalSnapshot) -> Result<String, RemoteError> {
        let mut state = self.state();
        state.calls.push(Call::Create);
        if let Some(failure) = state.create_failures.pop_front() {
            return Err(failure.into_error());
        }
        state.created += 1;
        let gist_id = format!("gist-{}", state.created);
        state.gists.insert(gist_id.clone(), snapshot.clone());
        Ok(gist_id)
    }

    async fn update(&self, gist_id: &str, snapshot: &LocalSnapshot) -> Result<(), RemoteError> {
        let mut state = self.state();
        state.calls.push(Call::Update(gist_id.to_owned()));
        if let Some(failure) = state.update_failures.pop_front() {
            return Err(failure.into_error());
        }
        match state.gists.get_mut(gist_id) {
            Some(existing) => {
                *existing = snapshot.clone();
                Ok(())
            }
            None => Err(Failure::NotFound.into_error()),
        }
    }

    async fn verify(&self) -> Result<String, RemoteError> {
        let mut state = self.state();
        state.calls.push(Call::Verify);
        if let Some(failure) = state.verify_failures.pop_front() {
            return Err(failure.into_error());
        }
        Ok("panadera".to_owned())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// 2026-10-01 at `hour:minute` UTC.
///
/// # Panics
///
/// Panics on an out-of-range time.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, hour, minute, 0).unwrap()
}

/// A valid draft delivering tomorrow.
#[must_use]
pub fn draft(customer: &str) -> OrderDraft {
    OrderDraft {
        customer_name: customer.to_owned(),
        delivery_date: "2026-10-02".to_owned(),
        delivery_time: "08:00".to_owned(),
        items: vec![ItemDraft {
            product: "Pan de campo".to_owned(),
            quantity: "1".to_owned(),
            price: None,
        }],
        ..OrderDraft::default()
    }
}

/// A stored order with a fixed id and modification time.
#[must_use]
pub fn order(id: &str, customer: &str, updated_at: DateTime<Utc>) -> LocalOrder {
    Order {
        id: OrderId::new(id),
        customer_name: customer.to_owned(),
        customer_phone: None,
        delivery_date: "2026-10-02".to_owned(),
        delivery_time: "08:00".to_owned(),
        items: vec![OrderItem {
            product: "Facturas".to_owned(),
            quantity: "6".to_owned(),
            price: None,
        }],
        notes: None,
        total_amount: None,
        status: LocalStatus::Pendiente,
        created_at: updated_at,
        updated_at,
    }
}

/// Snapshot with an explicit `lastSync`.
#[must_use]
pub fn snapshot(orders: Vec<LocalOrder>, last_sync: DateTime<Utc>) -> LocalSnapshot {
    Snapshot::new(orders, last_sync)
}

/// A store holding a token and, optionally, a gist id and last sync stamp.
///
/// # Panics
///
/// Panics if the in-memory store fails, which it does not.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn linked_store(gist_id: Option<&str>, last_sync: Option<DateTime<Utc>>) -> MemoryStore {
    let store = MemoryStore::new();
    SyncConfig {
        token: Some(SecretString::from("ghp_testtoken")),
        gist_id: gist_id.map(str::to_owned),
    }
    .save(&store)
    .unwrap();
    if let Some(stamp) = last_sync {
        store.set(LAST_SYNC_KEY, &stamp.to_rfc3339()).unwrap();
    }
    store
}
