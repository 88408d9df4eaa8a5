//! Logging configuration for the relay.
//!
//! Logs go to stderr. `RUST_LOG` takes precedence; otherwise the debug flag
//! picks between `debug` and `info`.

use tracing_subscriber::EnvFilter;

/// Returns the filter directive used when `RUST_LOG` is not set.
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

/// Initializes logging to stderr.
pub fn init_stderr_logging(debug: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive(debug))),
        )
        .with_target(false)
        .init();
}
