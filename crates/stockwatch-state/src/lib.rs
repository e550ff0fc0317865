//! Durable snapshot storage for stockwatch.
//!
//! A single JSON slot file holds the last successful [`Snapshot`], replaced
//! atomically on every save. [`RunLock`] keeps two processes from cycling
//! against the same state directory at once.
//!
//! [`Snapshot`]: stockwatch_core::Snapshot

mod error;
mod file_store;
mod lock;

pub use error::StateError;
pub use file_store::{FileStateStore, STATE_FILE};
pub use lock::{RunLock, LOCK_FILE};
