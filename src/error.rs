//! Error types for the relay.
//!
//! Every failure the engine can produce is classified here. The HTTP layer
//! may flatten these into one response shape, but the kind and the batch
//! position of a failing statement stay available to callers and tests.

use thiserror::Error;

/// Main error type for relay operations.
#[derive(Error, Debug)]
pub enum RelayError {
    /// The statement could not be prepared (syntax error, unknown table or
    /// column, no connection available).
    #[error("Prepare error{}: {message}", at(.position))]
    Prepare {
        position: Option<usize>,
        message: String,
    },

    /// The statement failed while running (constraint violation, etc.)
    #[error("Execution error{}: {message}", at(.position))]
    Execution {
        position: Option<usize>,
        message: String,
    },

    /// The call's deadline elapsed before it completed.
    #[error("Timeout{}: deadline of {seconds}s elapsed", at(.position))]
    Timeout {
        position: Option<usize>,
        seconds: u64,
    },

    /// Column metadata could not be read from the result.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A row value could not be decoded into a cell.
    #[error("Scan error at row {row}, column {column}: {message}")]
    Scan {
        row: usize,
        column: usize,
        message: String,
    },

    /// A result could not be serialized to the wire format.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A wire payload could not be turned back into a result table.
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// The store could not be opened.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration errors (invalid config file, bad environment value, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

fn at(position: &Option<usize>) -> String {
    match position {
        Some(p) => format!(" in statement {p}"),
        None => String::new(),
    }
}

impl RelayError {
    /// Creates a prepare error for a single query.
    pub fn prepare(msg: impl Into<String>) -> Self {
        Self::Prepare {
            position: None,
            message: msg.into(),
        }
    }

    /// Creates an execution error for a single query.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution {
            position: None,
            message: msg.into(),
        }
    }

    /// Creates a timeout error for a single query.
    pub fn timeout(seconds: u64) -> Self {
        Self::Timeout {
            position: None,
            seconds,
        }
    }

    /// Creates a schema error with the given message.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Creates an encoding error with the given message.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Creates a decoding error with the given message.
    pub fn decoding(msg: impl Into<String>) -> Self {
        Self::Decoding(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Attaches a batch position to statement-level errors.
    ///
    /// Other kinds are returned unchanged.
    pub fn at_position(self, index: usize) -> Self {
        match self {
            Self::Prepare { message, .. } => Self::Prepare {
                position: Some(index),
                message,
            },
            Self::Execution { message, .. } => Self::Execution {
                position: Some(index),
                message,
            },
            Self::Timeout { seconds, .. } => Self::Timeout {
                position: Some(index),
                seconds,
            },
            other => other,
        }
    }

    /// Returns the batch position of the failing statement, if any.
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Prepare { position, .. }
            | Self::Execution { position, .. }
            | Self::Timeout { position, .. } => *position,
            _ => None,
        }
    }

    /// Returns true if the failure was caused by an elapsed deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns a stable, machine-readable name for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Prepare { .. } => "prepare",
            Self::Execution { .. } => "execution",
            Self::Timeout { .. } => "timeout",
            Self::Schema(_) => "schema",
            Self::Scan { .. } => "scan",
            Self::Encoding(_) => "encoding",
            Self::Decoding(_) => "decoding",
            Self::Connection(_) => "connection",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias using RelayError.
pub type Result<T> = std::result::Result<T, RelayError>;
