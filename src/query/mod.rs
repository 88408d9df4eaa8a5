//! Query and statement execution for the relay.
//!
//! `QueryExecutor` materializes one read query into a generic table;
//! `StatementRunner` runs a batch of write statements under a shared
//! deadline, failing fast.

pub mod batch;
pub mod executor;

pub use batch::StatementRunner;
pub use executor::{QueryExecutor, DEFAULT_CAPACITY_HINT};
