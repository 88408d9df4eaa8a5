//! Batch statement execution.
//!
//! All statements of a batch share one deadline and one connection. Blank
//! statements are skipped and the first failure stops the batch. Statements
//! that ran before the failure stay applied.

use std::time::Instant;

use sqlx::sqlite::SqliteConnection;
use sqlx::{Executor, Statement};
use tracing::{debug, error};

use crate::db::sanitize;
use crate::db::{BatchOutcome, Deadline, Store};
use crate::error::{RelayError, Result};

/// Runs batches of effectful statements against the store.
pub struct StatementRunner<'a> {
    store: &'a Store,
}

impl<'a> StatementRunner<'a> {
    /// Creates a new statement runner.
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Executes `statements` in order under one deadline of `deadline_secs`.
    ///
    /// Failures carry the position of the failing statement in `statements`.
    /// A failed batch closes its connection instead of returning it to the
    /// pool, so a transaction opened by the batch never leaks into another
    /// call.
    pub async fn run<S>(&self, statements: &[S], deadline_secs: u64) -> Result<BatchOutcome>
    where
        S: AsRef<str>,
    {
        let t0 = Instant::now();
        let deadline = Deadline::after_secs(deadline_secs);

        let mut conn = self.store.acquire(&deadline).await?;
        let result = execute_all(conn.connection(), statements, &deadline).await;

        match &result {
            Ok(outcome) => {
                conn.release().await;
                debug!(
                    executed = outcome.executed(),
                    skipped = outcome.skipped,
                    rows_affected = outcome.rows_affected,
                    elapsed = ?t0.elapsed(),
                    "Batch finished"
                );
            }
            Err(e) => {
                conn.discard();
                error!("Batch failed: {e}");
            }
        }

        result
    }
}

async fn execute_all<S>(
    conn: &mut SqliteConnection,
    statements: &[S],
    deadline: &Deadline,
) -> Result<BatchOutcome>
where
    S: AsRef<str>,
{
    let mut outcome = BatchOutcome::default();

    for (position, statement) in statements.iter().enumerate() {
        let sql = statement.as_ref();
        if sanitize::is_blank(sql) {
            outcome.skipped += 1;
            continue;
        }

        let prepared = deadline
            .bound((&mut *conn).prepare(sql))
            .await
            .and_then(|r| r.map_err(|e| deadline.classify(e, RelayError::prepare)))
            .map_err(|e| e.at_position(position))?;

        debug!("Running statement {position}: {sql}");
        let done = deadline
            .bound(prepared.query().execute(&mut *conn))
            .await
            .and_then(|r| r.map_err(|e| deadline.classify(e, RelayError::execution)))
            .map_err(|e| e.at_position(position))?;

        debug!("{} rows affected", done.rows_affected());
        outcome.record(position, done.rows_affected());
    }

    Ok(outcome)
}
