//! db-relay - ad-hoc SQL over HTTP against a single SQLite store.
//!
//! This library exposes the core modules for use by the binary and in
//! integration tests.

pub mod cli;
pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod query;
pub mod server;
pub mod worker;
