//! PRAGMA configuration applied to every connection: WAL mode, NORMAL sync,
//! 256MB mmap, 64MB cache, 5s busy_timeout, foreign_keys ON, incremental
//! auto_vacuum.

use rusqlite::Connection;
use souvenir_core::errors::StorageError;

use crate::rusqlite_err;

pub fn apply_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA mmap_size = 268435456;
        PRAGMA cache_size = -64000;
        PRAGMA busy_timeout = 5000;
        PRAGMA foreign_keys = ON;
        PRAGMA auto_vacuum = INCREMENTAL;
        ",
    )
    .map_err(rusqlite_err)
}

pub fn apply_read_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA busy_timeout = 5000;
        PRAGMA foreign_keys = ON;
        ",
    )
    .map_err(rusqlite_err)
}
