//! Integration tests for the standalone order book on a file-backed store.

use std::path::PathBuf;

use bakery_core::{LocalStatus, OrderFilter, OrderId, StatusWorkflow};
use bakery_integration_tests::{at, draft, order};
use bakery_local::store::{CONFIG_KEY, ORDERS_KEY};
use bakery_local::{BookError, FileStore, KeyValueStore, OrderBook, StoreError, SyncConfig};

struct TempDir(PathBuf);

impl TempDir {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "bakery-it-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&path);
        Self(path)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

#[test]
fn test_mutations_survive_reopen() {
    let dir = TempDir::new("reopen");
    let store = FileStore::open(&dir.0).unwrap();

    let (rosa, juan) = {
        let mut book = OrderBook::open(&store).unwrap();
        let rosa = book.create(&draft("Rosa"), at(8, 0)).unwrap().id.clone();
        let juan = book.create(&draft("Juan"), at(8, 1)).unwrap().id.clone();
        book.advance_status(&rosa, at(8, 2)).unwrap();
        book.delete(&juan).unwrap();
        (rosa, juan)
    };

    let reopened = OrderBook::open(FileStore::open(&dir.0).unwrap()).unwrap();
    assert_eq!(reopened.orders().len(), 1);
    let order = reopened.get(&rosa).unwrap();
    assert_eq!(order.status, LocalStatus::EnProceso);
    assert_eq!(order.updated_at, at(8, 2));
    assert_eq!(order.created_at, at(8, 0));
    assert!(reopened.get(&juan).is_none());
}

#[test]
fn test_order_list_shares_file_with_config() {
    let dir = TempDir::new("shared");
    let store = FileStore::open(&dir.0).unwrap();

    let mut book = OrderBook::open(&store).unwrap();
    book.create(&draft("Rosa"), at(8, 0)).unwrap();
    SyncConfig {
        token: None,
        gist_id: Some("abc".to_owned()),
    }
    .save(&store)
    .unwrap();

    assert!(store.get(ORDERS_KEY).unwrap().is_some());
    assert!(store.get(CONFIG_KEY).unwrap().is_some());
    assert_eq!(OrderBook::open(&store).unwrap().orders().len(), 1);
}

#[test]
fn test_stored_list_uses_camel_case_keys() {
    let dir = TempDir::new("shape");
    let store = FileStore::open(&dir.0).unwrap();
    let mut book = OrderBook::open(&store).unwrap();
    book.create(&draft("Rosa"), at(8, 0)).unwrap();

    let raw: serde_json::Value = store.get_json(ORDERS_KEY).unwrap().unwrap();
    let first = &raw[0];
    assert_eq!(first["customerName"], "Rosa");
    assert_eq!(first["deliveryDate"], "2026-10-02");
    assert_eq!(first["status"], "pendiente");
    assert!(first["updatedAt"].is_string());
}

#[test]
fn test_foreign_records_load_leniently() {
    let dir = TempDir::new("lenient");
    let store = FileStore::open(&dir.0).unwrap();
    store
        .set(
            ORDERS_KEY,
            r#"[{"id":"legacy-1","customerName":"Vieja","deliveryDate":"2026-10-02","deliveryTime":"07:00","items":[],"status":"listo"}]"#,
        )
        .unwrap();

    let book = OrderBook::open(&store).unwrap();
    let legacy = &book.orders()[0];
    assert_eq!(legacy.status, LocalStatus::Unknown("listo".to_owned()));
    assert!(legacy.has_unknown_update_time());

    let pending = OrderFilter {
        status: Some(LocalStatus::Pendiente),
        date: None,
    };
    assert!(book.list(&pending).is_empty());
}

#[test]
fn test_unknown_status_advances_to_pending() {
    let dir = TempDir::new("unknown-status");
    let store = FileStore::open(&dir.0).unwrap();
    store
        .set(
            ORDERS_KEY,
            r#"[{"id":"x1","customerName":"Ajena","deliveryDate":"2026-10-02","deliveryTime":"07:00","items":[],"status":"confirmado"},{"id":"x2","customerName":"Nula","deliveryDate":"2026-10-02","deliveryTime":"07:30","items":[],"status":null}]"#,
        )
        .unwrap();

    let mut book = OrderBook::open(&store).unwrap();
    book.create(&draft("Rosa"), at(8, 0)).unwrap();

    let raw: serde_json::Value = store.get_json(ORDERS_KEY).unwrap().unwrap();
    assert_eq!(raw[0]["status"], "confirmado");
    assert_eq!(raw[1]["status"], "pendiente");

    let x1 = OrderId::new("x1");
    let status = book.advance_status(&x1, at(8, 1)).unwrap();
    assert_eq!(status, LocalStatus::Pendiente);
    assert_eq!(book.get(&x1).unwrap().updated_at, at(8, 1));
}

#[test]
fn test_corrupt_list_is_reported() {
    let dir = TempDir::new("corrupt");
    let store = FileStore::open(&dir.0).unwrap();
    store.set(ORDERS_KEY, "not json").unwrap();

    let err = OrderBook::open(&store).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { ref key, .. } if key == ORDERS_KEY));
}

#[test]
fn test_filter_by_status_and_date() {
    let dir = TempDir::new("filter");
    let store = FileStore::open(&dir.0).unwrap();
    let mut book = OrderBook::open(&store).unwrap();

    let mut other_day = order("b", "Otro día", at(8, 0));
    other_day.delivery_date = "2026-10-03".to_owned();
    let mut done = order("c", "Hecho", at(8, 0));
    done.status = LocalStatus::Completado;
    book.replace_all(vec![order("a", "Hoy", at(8, 0)), other_day, done])
        .unwrap();

    let pending_today = OrderFilter {
        status: Some(LocalStatus::Pendiente),
        date: Some("2026-10-02".to_owned()),
    };
    let names: Vec<_> = book
        .list(&pending_today)
        .into_iter()
        .map(|o| o.customer_name.as_str())
        .collect();
    assert_eq!(names, ["Hoy"]);

    let completed = OrderFilter {
        status: Some(LocalStatus::Completado),
        date: None,
    };
    assert_eq!(book.list(&completed).len(), 1);
}

#[test]
fn test_status_cycle_wraps() {
    let dir = TempDir::new("cycle");
    let store = FileStore::open(&dir.0).unwrap();
    let mut book = OrderBook::open(&store).unwrap();
    let id = book.create(&draft("Rosa"), at(8, 0)).unwrap().id.clone();

    for _ in LocalStatus::SEQUENCE {
        book.advance_status(&id, at(8, 1)).unwrap();
    }
    assert_eq!(book.get(&id).unwrap().status, LocalStatus::Pendiente);
}

#[test]
fn test_invalid_draft_lists_every_field() {
    let dir = TempDir::new("invalid");
    let store = FileStore::open(&dir.0).unwrap();
    let mut book = OrderBook::open(&store).unwrap();

    let mut bad = draft("  ");
    bad.delivery_date = String::new();
    bad.items.clear();

    let Err(BookError::Validation(errors)) = book.create(&bad, at(8, 0)) else {
        panic!("expected validation errors");
    };
    assert!(errors.has_field("customerName"));
    assert!(errors.has_field("deliveryDate"));
    assert!(errors.has_field("items"));
    assert!(book.orders().is_empty());
}
