//! Store access for the relay.
//!
//! The store is a single SQLite file opened once per process. Its sqlx pool
//! is the only state shared between concurrent calls; each call acquires a
//! connection, binds it to its own deadline, and hands it back on return.

pub mod deadline;
pub mod sanitize;
mod types;

pub use deadline::{Deadline, MAX_DEADLINE_SECS};
pub use types::{BatchOutcome, Cell, ResultTable, Row, StatementOutcome};

use crate::error::{RelayError, Result};
use deadline::PROGRESS_HANDLER_OPS;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Sqlite;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default number of pooled connections.
pub const DEFAULT_POOL_SIZE: u32 = 5;

/// Handle to the relational store, cheap to clone.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
    path: PathBuf,
}

impl Store {
    /// Opens (or creates) the SQLite file at `path` with the default pool size.
    pub async fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, DEFAULT_POOL_SIZE).await
    }

    /// Opens (or creates) the SQLite file at `path`.
    pub async fn open_with(path: &Path, max_connections: u32) -> Result<Self> {
        let conn_str = format!("sqlite:{}?mode=rwc", path.display());
        let options = SqliteConnectOptions::from_str(&conn_str)
            .map_err(|e| RelayError::connection(format!("Invalid database path: {e}")))?
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(MAX_DEADLINE_SECS))
            .connect_with(options)
            .await
            .map_err(|e| {
                RelayError::connection(format!(
                    "Failed to open database {}: {e}",
                    path.display()
                ))
            })?;

        info!("Store opened at {}", path.display());
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Returns the path of the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Acquires a connection and binds it to `deadline`.
    ///
    /// Waiting for a free connection counts against the deadline. Once
    /// acquired, statements run on the connection are interrupted by SQLite
    /// when the deadline passes.
    pub async fn acquire(&self, deadline: &Deadline) -> Result<BoundConnection> {
        let mut conn = deadline
            .bound(self.pool.acquire())
            .await?
            .map_err(|e| {
                deadline.classify(e, |m| {
                    RelayError::prepare(format!("connection unavailable: {m}"))
                })
            })?;

        {
            let mut handle = conn
                .lock_handle()
                .await
                .map_err(|e| RelayError::prepare(format!("connection unavailable: {e}")))?;
            handle.set_progress_handler(PROGRESS_HANDLER_OPS, deadline.keep_running());
        }

        Ok(BoundConnection {
            conn,
            released: false,
        })
    }

    /// Closes the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// A pooled connection carrying one call's deadline.
///
/// Call [`BoundConnection::release`] to return it to the pool for reuse.
/// Dropping it without releasing closes the underlying connection, so a
/// connection with a stale deadline or an unfinished statement is never
/// handed to another call.
pub struct BoundConnection {
    conn: PoolConnection<Sqlite>,
    released: bool,
}

impl BoundConnection {
    /// The raw connection to run statements on.
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    /// Removes the deadline from the connection and returns it to the pool.
    ///
    /// A connection left inside a transaction is rolled back and closed
    /// instead, so the next call never inherits the transaction or its locks.
    pub async fn release(mut self) {
        match self.conn.lock_handle().await {
            Ok(mut handle) => handle.remove_progress_handler(),
            Err(e) => {
                warn!("Discarding connection that could not be reset: {e}");
                return;
            }
        }

        match sqlx::query("ROLLBACK").execute(&mut *self.conn).await {
            Err(e) if is_no_transaction(&e) => self.released = true,
            Ok(_) => warn!("Rolled back a transaction left open by the call, discarding connection"),
            Err(e) => warn!("Discarding connection that could not be reset: {e}"),
        }
    }

    /// Closes the connection instead of returning it to the pool.
    pub fn discard(self) {
        debug!("Discarding pooled connection");
    }
}

fn is_no_transaction(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(e) if e.message().contains("no transaction is active"))
}

impl Drop for BoundConnection {
    fn drop(&mut self) {
        if !self.released {
            self.conn.close_on_drop();
        }
    }
}
