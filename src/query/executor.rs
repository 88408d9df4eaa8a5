//! Read query execution.
//!
//! Runs one query under its own deadline and decodes every value into a
//! [`Cell`] according to the storage class SQLite reports for it.

use std::time::Instant;

use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnection, SqliteRow, SqliteValueRef};
use sqlx::{Column, Decode, Executor, Row as SqlxRow, Sqlite, Statement, TypeInfo, ValueRef};
use tracing::{debug, error};

use crate::db::{Cell, Deadline, ResultTable, Row, Store};
use crate::error::{RelayError, Result};

/// Initial row buffer capacity. Only a pre-sizing hint, never a limit.
pub const DEFAULT_CAPACITY_HINT: usize = 1000;

/// Runs read queries against the store.
pub struct QueryExecutor<'a> {
    store: &'a Store,
    capacity_hint: usize,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new query executor.
    pub fn new(store: &'a Store) -> Self {
        Self {
            store,
            capacity_hint: DEFAULT_CAPACITY_HINT,
        }
    }

    /// Sets the number of rows the result buffer is pre-sized for.
    pub fn with_capacity_hint(mut self, capacity_hint: usize) -> Self {
        self.capacity_hint = capacity_hint;
        self
    }

    /// Runs `sql` and returns its full result, or a classified failure.
    ///
    /// Nothing is returned on failure: rows decoded before an error or an
    /// elapsed deadline are discarded.
    pub async fn run(&self, sql: &str, deadline_secs: u64) -> Result<ResultTable> {
        let t0 = Instant::now();
        let deadline = Deadline::after_secs(deadline_secs);

        let mut conn = self.store.acquire(&deadline).await?;
        debug!("Running query {sql}");
        let result = deadline
            .bound(self.collect(conn.connection(), sql, &deadline))
            .await
            .and_then(|inner| inner);

        match &result {
            Ok(table) => {
                conn.release().await;
                debug!(
                    columns = table.width(),
                    rows = table.rows().len(),
                    elapsed = ?t0.elapsed(),
                    "Query finished"
                );
            }
            Err(e) if e.is_timeout() => {
                conn.discard();
                error!("Query timed out after {deadline_secs}s: {e}");
            }
            Err(e) => {
                conn.release().await;
                error!("Query failed: {e}");
            }
        }

        result
    }

    async fn collect(
        &self,
        conn: &mut SqliteConnection,
        sql: &str,
        deadline: &Deadline,
    ) -> Result<ResultTable> {
        let statement = (&mut *conn)
            .prepare(sql)
            .await
            .map_err(|e| deadline.classify(e, RelayError::prepare))?;

        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();
        debug!("Number of columns {}", columns.len());

        let mut table = ResultTable::with_capacity(columns, self.capacity_hint);
        let mut rows = statement.query().fetch(&mut *conn);

        while let Some(row) = rows
            .try_next()
            .await
            .map_err(|e| deadline.classify(e, RelayError::execution))?
        {
            let decoded = decode_row(&row, table.width(), table.rows().len())?;
            table.push_row(decoded)?;
        }

        Ok(table)
    }
}

/// Decodes every column of one row.
fn decode_row(row: &SqliteRow, width: usize, index: usize) -> Result<Row> {
    if row.len() != width {
        return Err(RelayError::schema(format!(
            "row {index} reports {} columns, statement reported {width}",
            row.len()
        )));
    }

    (0..width)
        .map(|column| {
            let value = row.try_get_raw(column).map_err(|e| RelayError::Scan {
                row: index,
                column,
                message: e.to_string(),
            })?;
            decode_value(value).map_err(|message| RelayError::Scan {
                row: index,
                column,
                message,
            })
        })
        .collect()
}

/// Converts a single value to a cell based on its runtime storage class.
fn decode_value(value: SqliteValueRef<'_>) -> std::result::Result<Cell, String> {
    if value.is_null() {
        return Ok(Cell::Null);
    }

    let storage_class = value.type_info().name().to_string();
    let decoded = match storage_class.as_str() {
        "INTEGER" => <i64 as Decode<'_, Sqlite>>::decode(value).map(Cell::Integer),
        "REAL" => <f64 as Decode<'_, Sqlite>>::decode(value).map(Cell::Real),
        "TEXT" => <String as Decode<'_, Sqlite>>::decode(value).map(Cell::Text),
        "BLOB" => <Vec<u8> as Decode<'_, Sqlite>>::decode(value).map(Cell::Blob),
        other => return Err(format!("unsupported storage class {other}")),
    };

    decoded.map_err(|e| e.to_string())
}
