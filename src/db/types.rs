//! Result types for the relay.
//!
//! Defines the generic, schema-less table produced by a read query and the
//! outcome reported by a statement batch.

use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A row of cells from a query result.
pub type Row = Vec<Cell>;

/// The result of a read query.
///
/// Column count and cell types are only known once the query has run.
/// Every row has exactly one cell per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl ResultTable {
    /// Creates a table from columns and rows, checking the row widths.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Result<Self> {
        let mut table = Self::with_capacity(columns, rows.len());
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Creates an empty table whose row buffer is pre-sized to `capacity`.
    ///
    /// The capacity is only a hint, the buffer grows past it as needed.
    pub(crate) fn with_capacity(columns: Vec<String>, capacity: usize) -> Self {
        Self {
            columns,
            rows: Vec::with_capacity(capacity),
        }
    }

    /// Appends a row, rejecting one whose width differs from the column count.
    pub(crate) fn push_row(&mut self, row: Row) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(RelayError::schema(format!(
                "row {} has {} values but the result has {} columns",
                self.rows.len(),
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names in database order. Names need not be unique.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in cursor order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the query produced no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A single decoded value from a query result.
///
/// The variant follows the storage class SQLite reports for the value
/// itself, so one column may hold different variants across rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Cell {
    /// NULL value.
    #[default]
    Null,

    /// Signed 64-bit integer.
    Integer(i64),

    /// Double precision float.
    Real(f64),

    /// Text value.
    Text(String),

    /// Binary data.
    Blob(Vec<u8>),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => write!(f, "NULL"),
            Cell::Integer(i) => write!(f, "{i}"),
            Cell::Real(r) => write!(f, "{r}"),
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Integer(v)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Real(v)
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Cell {
    fn from(v: Vec<u8>) -> Self {
        Cell::Blob(v)
    }
}

/// Outcome of one executed statement in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementOutcome {
    /// Position of the statement in the submitted batch, blanks included.
    pub position: usize,

    /// Rows changed by the statement.
    pub rows_affected: u64,
}

/// Outcome of a successfully executed statement batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Total rows changed across the batch.
    pub rows_affected: u64,

    /// Number of blank statements that were skipped.
    pub skipped: usize,

    /// Executed statements, in execution order.
    pub statements: Vec<StatementOutcome>,
}

impl BatchOutcome {
    pub(crate) fn record(&mut self, position: usize, rows_affected: u64) {
        self.rows_affected += rows_affected;
        self.statements.push(StatementOutcome {
            position,
            rows_affected,
        });
    }

    /// Number of statements that were executed.
    pub fn executed(&self) -> usize {
        self.statements.len()
    }
}
