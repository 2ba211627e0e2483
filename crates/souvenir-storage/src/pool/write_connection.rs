use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use souvenir_core::errors::StorageError;

use super::pragmas::apply_pragmas;
use crate::rusqlite_err;

/// The single writer connection, serialised behind a mutex. SQLite permits
/// exactly one writer at a time regardless of process-internal locking, so
/// this mutex is the only coordination point mutations need.
pub struct WriteConnection {
    conn: Mutex<Connection>,
}

impl WriteConnection {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(rusqlite_err)?;
        apply_pragmas(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(rusqlite_err)?;
        apply_pragmas(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|e| crate::to_storage_err(format!("writer lock poisoned: {e}")))?;
        f(&guard)
    }
}
