//! Configuration management for the relay.
//!
//! Settings come from an optional TOML file and are overridden by CLI flags
//! or their environment variables (see `cli.rs`). Anything left unset keeps
//! its default.

use crate::db::MAX_DEADLINE_SECS;
use crate::error::{RelayError, Result};
use crate::query::DEFAULT_CAPACITY_HINT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Main configuration structure for the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Verbose logging and debug-only endpoint output.
    pub debug: bool,

    /// HTTP listen port.
    pub port: u16,

    /// Upstream API endpoint, reported at start-up.
    pub api_endpoint: Option<String>,

    /// Path of the SQLite store file.
    pub database: PathBuf,

    /// Number of pooled store connections.
    pub pool_size: u32,

    /// Row buffer pre-sizing hint for read queries.
    pub max_lines: usize,

    /// Deadline applied to read queries and batches, in seconds.
    pub query_timeout_secs: u64,

    /// Interval of the background worker, in seconds.
    pub worker_interval_secs: u64,

    /// Directory served under `/static/`.
    pub static_dir: PathBuf,

    /// HTML template for the home page; the built-in page when unset.
    pub template: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: true,
            port: 5000,
            api_endpoint: None,
            database: PathBuf::from("test.db"),
            pool_size: crate::db::DEFAULT_POOL_SIZE,
            max_lines: DEFAULT_CAPACITY_HINT,
            query_timeout_secs: 60,
            worker_interval_secs: 60,
            static_dir: PathBuf::from("static"),
            template: None,
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("db-relay")
            .join("relay.toml")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| RelayError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            RelayError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Checks values that would make the server unusable.
    pub fn validate(&self) -> Result<()> {
        if self.query_timeout_secs == 0 {
            return Err(RelayError::config("query timeout must be at least 1 second"));
        }
        if self.query_timeout_secs > MAX_DEADLINE_SECS {
            return Err(RelayError::config(format!(
                "query timeout must be at most {MAX_DEADLINE_SECS} seconds"
            )));
        }
        if self.worker_interval_secs == 0 {
            return Err(RelayError::config("worker interval must be at least 1 second"));
        }
        if self.pool_size == 0 {
            return Err(RelayError::config("pool size must be at least 1"));
        }
        self.endpoint()?;
        Ok(())
    }

    /// Parses the upstream API endpoint, if one is configured.
    pub fn endpoint(&self) -> Result<Option<Url>> {
        match self.api_endpoint.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => Url::parse(raw)
                .map(Some)
                .map_err(|e| RelayError::config(format!("Invalid API endpoint '{raw}': {e}"))),
        }
    }
}

/// Interprets a `DEBUG` value: `1` enables, any other non-empty value
/// disables, and an empty value leaves the current setting alone.
pub fn parse_debug_flag(value: &str, current: bool) -> bool {
    if value.is_empty() {
        current
    } else {
        value == "1"
    }
}
