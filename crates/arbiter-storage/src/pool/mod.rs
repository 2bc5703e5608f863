//! Connection pool managing read/write connections.

pub mod pragmas;
pub mod read_pool;
pub mod write_connection;

use std::path::{Path, PathBuf};

use arbiter_core::errors::ArbiterResult;

pub use read_pool::ReadPool;
pub use write_connection::WriteConnection;

/// Manages the single write connection and the read connection pool.
pub struct ConnectionPool {
    pub writer: WriteConnection,
    /// Absent in in-memory mode, where a separate connection would open a
    /// separate empty database.
    pub readers: Option<ReadPool>,
    pub db_path: Option<PathBuf>,
}

impl ConnectionPool {
    /// Open a connection pool for the given database file.
    ///
    /// The writer is opened first so WAL mode is set before readers attach.
    pub fn open(path: &Path, read_pool_size: usize) -> ArbiterResult<Self> {
        let writer = WriteConnection::open(path)?;
        Ok(Self {
            writer,
            readers: None,
            db_path: Some(path.to_path_buf()),
        }
        .with_readers(read_pool_size))
    }

    /// Open an in-memory connection pool (for testing).
    pub fn open_in_memory() -> ArbiterResult<Self> {
        let writer = WriteConnection::open_in_memory()?;
        Ok(Self {
            writer,
            readers: None,
            db_path: None,
        })
    }

    /// Attach the read pool. A failure leaves reads on the writer.
    fn with_readers(mut self, read_pool_size: usize) -> Self {
        if let Some(path) = &self.db_path {
            match ReadPool::open(path, read_pool_size) {
                Ok(pool) => self.readers = Some(pool),
                Err(e) => {
                    tracing::warn!(error = %e, "read pool unavailable, routing reads through writer");
                }
            }
        }
        self
    }
}
