//! # feedsync core
//!
//! The local side of feedsync: an ordered cache of remote items plus the two
//! remote keys (`After`, `Before`) that record how far synchronization has
//! progressed in each direction.
//!
//! This crate provides:
//! - [`Item`] and [`RemoteKey`], the two row types
//! - a journal (write-ahead log) that makes every merge durable
//! - [`Transaction`], the single write scope that item and key writes are
//!   recorded against
//! - the storage traits the sync mediator is written against:
//!   [`ItemStore`], [`RemoteKeyStore`] and [`TransactionCoordinator`]
//! - [`Cache`], which implements all three over in-memory tables rebuilt
//!   from the journal on open
//!
//! ```rust
//! use feedsync_core::{Cache, Item, ItemId, ItemStore, RemoteKey, RemoteKeyStore,
//!     TransactionCoordinator};
//!
//! let cache = Cache::open_in_memory().unwrap();
//! cache
//!     .run_atomic(|txn| {
//!         cache.upsert(txn, RemoteKey::after(ItemId::new(7)))?;
//!         cache.insert_all(txn, &[Item::new(ItemId::new(7), b"{}".to_vec())])
//!     })
//!     .unwrap();
//!
//! assert_eq!(cache.max_after_id().unwrap(), Some(ItemId::new(7)));
//! assert_eq!(cache.item_count().unwrap(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod dir;
mod error;
mod item;
pub mod journal;
mod store;
pub mod transaction;
mod types;

pub use cache::Cache;
pub use config::Config;
pub use dir::JOURNAL_FILE;
pub use error::{CoreError, CoreResult};
pub use item::{Item, RemoteKey};
pub use store::{ItemStore, RemoteKeyStore, TransactionCoordinator};
pub use transaction::Transaction;
pub use types::{ItemId, KeyKind, SequenceNumber, TransactionId};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
