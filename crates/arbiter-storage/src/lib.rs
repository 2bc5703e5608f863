//! # arbiter-storage
//!
//! SQLite persistence for the decision ledger, version registry, experiments,
//! approval queue, insights and daily snapshots. One serialized write
//! connection plus a read pool, versioned migrations, and an append-only
//! audit log written in the same transaction as every status transition.

pub mod audit;
pub mod engine;
pub mod migrations;
pub mod pool;
pub mod queries;

pub use engine::StorageEngine;

use arbiter_core::errors::{ArbiterError, StorageError};

/// Wrap a low-level failure message as a storage error.
pub(crate) fn to_storage_err(message: String) -> ArbiterError {
    ArbiterError::StorageError(StorageError::SqliteError { message })
}
