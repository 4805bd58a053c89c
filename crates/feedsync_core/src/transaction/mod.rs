//! Atomic write scopes.
//!
//! A [`Transaction`] buffers item inserts and remote key upserts. Nothing
//! is visible to readers until [`TransactionManager`] commits it:
//!
//! - **Atomicity**: the journal gets the whole batch or nothing, and the
//!   tables are only touched after the journal flush succeeded
//! - **Isolation**: one writer at a time; readers see committed state only
//! - **Durability**: the journal is flushed (and by default synced) before
//!   commit returns

mod manager;
mod state;

pub use manager::{TransactionManager, WriteTransaction};
pub use state::{Transaction, TransactionState};
