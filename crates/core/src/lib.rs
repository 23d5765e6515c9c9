//! Bakery Orders Core - Shared types library.
//!
//! This crate provides the domain types used by every Bakery Orders component:
//! - `server` - CRUD HTTP API backed by `PostgreSQL`
//! - `local` - Standalone order book with optional gist synchronization
//! - `cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. Callers pass in the current time so every
//! function here is deterministic and testable.
//!
//! # Modules
//!
//! - [`types`] - Order records, ids, status workflows and input validation
//! - [`query`] - Filtering and delivery-time ordering of order lists
//! - [`sync`] - Reconciliation of a local order list with a remote snapshot

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod query;
pub mod sync;
pub mod types;

pub use query::{OrderFilter, sort_by_delivery};
pub use sync::{
    LocalOnlyPolicy, MergePolicy, Reconciliation, Resolution, Snapshot, TieBreak, reconcile,
};
pub use types::*;
