//! Connection pool: one writer, a round-robin pool of readers.

mod pragmas;
mod read_pool;
mod write_connection;

pub use read_pool::ReadPool;
pub use write_connection::WriteConnection;

use std::path::Path;

use souvenir_core::errors::StorageError;

pub struct ConnectionPool {
    pub writer: WriteConnection,
    pub readers: ReadPool,
}

impl ConnectionPool {
    pub fn open(path: &Path, read_pool_size: usize) -> Result<Self, StorageError> {
        let writer = WriteConnection::open(path)?;
        let readers = ReadPool::open(path, read_pool_size)?;
        Ok(Self { writer, readers })
    }

    pub fn open_in_memory(read_pool_size: usize) -> Result<Self, StorageError> {
        let writer = WriteConnection::open_in_memory()?;
        let readers = ReadPool::open_in_memory(read_pool_size)?;
        Ok(Self { writer, readers })
    }
}
