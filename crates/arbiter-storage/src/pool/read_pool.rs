//! Read-only connections for file-backed storage.
//!
//! Routing lookups, analysis windows and health counts run here so they
//! never queue behind the single writer. Every connection is opened
//! read-only and set `query_only`, so a query routed here by mistake fails
//! instead of bypassing the writer's audit trail.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags};

use arbiter_core::errors::ArbiterResult;

use super::pragmas::apply_read_pragmas;
use crate::to_storage_err;

const MAX_READERS: usize = 8;

pub struct ReadPool {
    readers: Vec<Mutex<Connection>>,
    cursor: AtomicUsize,
}

impl ReadPool {
    /// `size` is clamped to `1..=8`.
    pub fn open(path: &Path, size: usize) -> ArbiterResult<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let readers = (0..size.clamp(1, MAX_READERS))
            .map(|_| {
                let conn = Connection::open_with_flags(path, flags)
                    .map_err(|e| to_storage_err(e.to_string()))?;
                apply_read_pragmas(&conn)?;
                Ok(Mutex::new(conn))
            })
            .collect::<ArbiterResult<Vec<_>>>()?;
        Ok(Self {
            readers,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Run `f` on an idle reader when one is free, otherwise wait on the
    /// next one in rotation.
    pub fn with_conn<F, T>(&self, f: F) -> ArbiterResult<T>
    where
        F: FnOnce(&Connection) -> ArbiterResult<T>,
    {
        let start = self.cursor.fetch_add(1, Ordering::Relaxed);
        let n = self.readers.len();
        for offset in 0..n {
            if let Ok(guard) = self.readers[(start + offset) % n].try_lock() {
                return f(&guard);
            }
        }
        let guard = self.readers[start % n]
            .lock()
            .map_err(|e| to_storage_err(format!("reader poisoned: {e}")))?;
        f(&guard)
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }
}
