//! Command-line argument parsing for the relay.
//!
//! Every setting can also be given through the environment variable named
//! next to it; flags and variables both override the config file.

use crate::config::{parse_debug_flag, Config};
use crate::error::Result;
use clap::Parser;
use std::path::PathBuf;

/// Ad-hoc SQL over HTTP for a single SQLite store.
#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", env = "RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Debug output: 1 enables, any other value disables
    #[arg(long, value_name = "FLAG", env = "DEBUG")]
    pub debug: Option<String>,

    /// HTTP listen port
    #[arg(short = 'p', long, value_name = "PORT", env = "PORT")]
    pub port: Option<u16>,

    /// Upstream API endpoint
    #[arg(long, value_name = "URL", env = "API_ENDPOINT")]
    pub api_endpoint: Option<String>,

    /// SQLite store file
    #[arg(short = 'd', long, value_name = "PATH", env = "DATABASE")]
    pub database: Option<PathBuf>,

    /// Number of pooled store connections
    #[arg(long, value_name = "N", env = "POOL_SIZE")]
    pub pool_size: Option<u32>,

    /// Expected rows per query, used to pre-size result buffers
    #[arg(long, value_name = "N", env = "MAX_LINES")]
    pub max_lines: Option<usize>,

    /// Query and batch deadline in seconds
    #[arg(long, value_name = "SECS", env = "QUERY_TIMEOUT")]
    pub query_timeout: Option<u64>,

    /// Background worker interval in seconds
    #[arg(long, value_name = "SECS", env = "WORKER_INTERVAL")]
    pub worker_interval: Option<u64>,

    /// Directory served under /static/
    #[arg(long, value_name = "PATH", env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// HTML template for the home page
    #[arg(long, value_name = "PATH", env = "TEMPLATE")]
    pub template: Option<PathBuf>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path, falling back to the platform default.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies the flags that were given on top of `config`.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(debug) = &self.debug {
            config.debug = parse_debug_flag(debug, config.debug);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(endpoint) = &self.api_endpoint {
            config.api_endpoint = Some(endpoint.clone());
        }
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(pool_size) = self.pool_size {
            config.pool_size = pool_size;
        }
        if let Some(max_lines) = self.max_lines {
            config.max_lines = max_lines;
        }
        if let Some(timeout) = self.query_timeout {
            config.query_timeout_secs = timeout;
        }
        if let Some(interval) = self.worker_interval {
            config.worker_interval_secs = interval;
        }
        if let Some(dir) = &self.static_dir {
            config.static_dir = dir.clone();
        }
        if let Some(template) = &self.template {
            config.template = Some(template.clone());
        }
    }

    /// Resolves the final configuration with precedence:
    /// 1. CLI flags and environment variables (highest)
    /// 2. Config file
    /// 3. Defaults
    pub fn resolve(&self) -> Result<Config> {
        let mut config = Config::load_from_file(&self.config_path())?;
        self.apply_to(&mut config);
        config.validate()?;
        Ok(config)
    }
}
