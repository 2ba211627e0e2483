//! SQLite-backed persistence for the Souvenir memory engine.
//!
//! [`StorageEngine`] owns a [`pool::ConnectionPool`] and implements both
//! [`souvenir_core::EpisodeRepository`] and [`souvenir_core::MemoryRepository`]
//! by delegating to the `queries` submodules.

mod engine;
mod migrations;
pub mod pool;
mod queries;

pub use engine::StorageEngine;

use souvenir_core::errors::StorageError;

/// Map any `rusqlite`/formatting failure into the crate-wide storage error.
pub(crate) fn to_storage_err(message: impl Into<String>) -> StorageError {
    StorageError::Backend { message: message.into() }
}

pub(crate) fn rusqlite_err(e: rusqlite::Error) -> StorageError {
    to_storage_err(e.to_string())
}
