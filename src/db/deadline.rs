//! Per-call execution deadlines.
//!
//! A deadline bounds every wait of one engine call: pool acquisition,
//! statement preparation, execution and row iteration. Async waits are
//! bounded with `tokio::time::timeout_at`; statements already running inside
//! SQLite are interrupted through a progress handler that checks the same
//! instant.

use crate::error::{RelayError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Number of SQLite VM instructions between progress handler checks.
pub const PROGRESS_HANDLER_OPS: i32 = 1000;

/// Longest deadline a call may ask for, one day. Longer requests are clamped.
pub const MAX_DEADLINE_SECS: u64 = 24 * 60 * 60;

/// A fixed wall-clock bound owned by a single call.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    seconds: u64,
    expires_at: Instant,
}

impl Deadline {
    /// Starts a deadline that elapses `seconds` from now, at most
    /// [`MAX_DEADLINE_SECS`].
    pub fn after_secs(seconds: u64) -> Self {
        let seconds = seconds.min(MAX_DEADLINE_SECS);
        Self {
            seconds,
            expires_at: Instant::now() + Duration::from_secs(seconds),
        }
    }

    /// Returns true once the deadline has passed.
    pub fn has_elapsed(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Error reported when this deadline stops a call.
    pub fn timeout_error(&self) -> RelayError {
        RelayError::timeout(self.seconds)
    }

    /// Runs `fut` until it completes or the deadline elapses.
    pub async fn bound<F>(&self, fut: F) -> Result<F::Output>
    where
        F: Future,
    {
        tokio::time::timeout_at(self.expires_at, fut)
            .await
            .map_err(|_| self.timeout_error())
    }

    /// Classifies a driver error raised during a bounded step.
    ///
    /// Once the deadline has passed, any driver failure is reported as a
    /// timeout: an interrupted statement surfaces as a generic driver error.
    pub fn classify(
        &self,
        error: sqlx::Error,
        otherwise: impl FnOnce(String) -> RelayError,
    ) -> RelayError {
        if self.has_elapsed() {
            self.timeout_error()
        } else {
            otherwise(error.to_string())
        }
    }

    /// Builds the callback installed as the SQLite progress handler.
    ///
    /// SQLite aborts the running statement as soon as it returns false.
    pub(crate) fn keep_running(&self) -> impl FnMut() -> bool + Send + 'static {
        let expires_at = self.expires_at.into_std();
        move || std::time::Instant::now() < expires_at
    }
}
