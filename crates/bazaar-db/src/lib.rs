pub mod comments;
pub mod items;
mod migrations;
mod models;
pub mod threads;
pub mod votes;

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bazaar_types::{BazaarError, Result};
use rusqlite::{Connection, ErrorCode, OpenFlags, Transaction, TransactionBehavior};
use tracing::{error, info};

pub use comments::CommentCursor;

#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Number of read-only connections kept next to the single writer.
    pub readers: usize,
    /// How long a connection waits on a locked database before giving up.
    pub busy_timeout: Duration,
    /// Comments fetched per round trip by `CommentCursor`.
    pub comment_page_size: usize,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            readers: 4,
            busy_timeout: Duration::from_millis(5000),
            comment_page_size: 50,
        }
    }
}

/// The entity store. All writes go through one connection, each inside an
/// immediate transaction, so derived thread fields are recomputed without
/// lost updates. Reads are spread over a small pool of read-only connections
/// that see committed WAL snapshots.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
    comment_page_size: usize,
}

impl Database {
    pub fn open(path: &Path, config: &DbConfig) -> anyhow::Result<Self> {
        let writer = Connection::open(path)?;

        // WAL mode for concurrent reads
        writer.pragma_update(None, "journal_mode", "WAL")?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        writer.busy_timeout(config.busy_timeout)?;

        migrations::run(&writer)?;

        let reader_count = config.readers.max(1);
        let mut readers = Vec::with_capacity(reader_count);
        for _ in 0..reader_count {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.busy_timeout(config.busy_timeout)?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Database opened at {} (1 writer + {} readers)",
            path.display(),
            reader_count
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
            comment_page_size: config.comment_page_size.max(1),
        })
    }

    /// Run `f` inside a read transaction on one of the reader connections.
    /// Everything `f` reads comes from a single snapshot.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx]
            .lock()
            .map_err(|e| BazaarError::Internal(format!("Reader lock poisoned: {}", e)))?;
        let tx = conn.unchecked_transaction().map_err(storage_error)?;
        let value = f(&tx)?;
        tx.commit().map_err(storage_error)?;
        Ok(value)
    }

    /// Run `f` inside an immediate write transaction. The transaction commits
    /// only if `f` succeeds; any error rolls back every statement it issued.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .writer
            .lock()
            .map_err(|e| BazaarError::Internal(format!("Writer lock poisoned: {}", e)))?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)
            .map_err(storage_error)?;
        let value = f(&tx)?;
        tx.commit().map_err(storage_error)?;
        Ok(value)
    }
}

/// Map a SQLite failure onto the service's error taxonomy.
pub(crate) fn storage_error(err: rusqlite::Error) -> BazaarError {
    match err.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
            BazaarError::ConcurrencyConflict(err.to_string())
        }
        _ => {
            error!("Storage error: {}", err);
            BazaarError::Internal(err.to_string())
        }
    }
}
