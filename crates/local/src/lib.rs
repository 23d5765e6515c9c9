//! Bakery Orders Local - standalone order book and clients.
//!
//! # Modules
//!
//! - [`store`] - Key-value persistence (`FileStore`, `MemoryStore`)
//! - [`book`] - The order book, written through to the store
//! - [`config`] - Gist sync credentials
//! - [`gist`] - GitHub gist client (`SnapshotStore`)
//! - [`sync`] - Push, pull and merge against the gist
//! - [`api`] - Client for the server API with an offline cache
//!
//! # Example
//!
//! ```rust,ignore
//! use bakery_local::{FileStore, GistClient, OrderBook, SyncConfig, SyncEngine};
//!
//! let store = FileStore::open(".bakery")?;
//! let mut book = OrderBook::open(&store)?;
//! let config = SyncConfig::load(&store)?;
//! if let Some(token) = &config.token {
//!     let engine = SyncEngine::new(GistClient::new(token)?);
//!     engine.pull(&mut book, chrono::Utc::now()).await?;
//! }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod book;
pub mod config;
pub mod gist;
pub mod store;
pub mod sync;

pub use api::{ApiError, Connectivity, ListQuery, LoadError, LoadedOrders, ServerClient};
pub use book::{BookError, OrderBook};
pub use config::{ConfigError, SyncConfig, validate_token_format};
pub use gist::{GistClient, RemoteError, SnapshotStore};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use sync::{PullOutcome, PullReport, PushOutcome, SyncEngine, SyncError};
