//! Background worker and process memory reporting.
//!
//! The worker wakes up on a fixed interval and logs memory usage until it
//! is cancelled at shutdown.

use serde::Serialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Memory used by this process, in bytes.
///
/// Read from `/proc/self/status`; every field is zero where that file is
/// not available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryUsage {
    /// Resident set size.
    pub rss: u64,
    /// Peak resident set size.
    pub peak: u64,
    /// Virtual memory size.
    #[serde(rename = "virtual")]
    pub virtual_size: u64,
}

impl MemoryUsage {
    /// Samples the current process.
    pub fn current() -> Self {
        std::fs::read_to_string("/proc/self/status")
            .map(|status| Self::parse(&status))
            .unwrap_or_default()
    }

    /// Parses the `Vm*` lines of a `/proc/<pid>/status` file.
    pub fn parse(status: &str) -> Self {
        let mut usage = Self::default();
        for line in status.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let bytes = parse_kb(value);
            match key {
                "VmRSS" => usage.rss = bytes,
                "VmHWM" => usage.peak = bytes,
                "VmSize" => usage.virtual_size = bytes,
                _ => {}
            }
        }
        usage
    }

    /// Logs usage in MiB at debug level.
    pub fn log(&self) {
        debug!(
            "RSS = {} MiB \t Peak = {} MiB \t Virtual = {} MiB",
            to_mib(self.rss),
            to_mib(self.peak),
            to_mib(self.virtual_size)
        );
    }
}

fn parse_kb(value: &str) -> u64 {
    value
        .split_whitespace()
        .next()
        .and_then(|n| n.parse::<u64>().ok())
        .map(|kb| kb * 1024)
        .unwrap_or(0)
}

fn to_mib(bytes: u64) -> u64 {
    bytes / 1024 / 1024
}

/// One tick of the background worker.
pub fn worker_task() {
    debug!(">>> WorkerTask");
    MemoryUsage::current().log();
}

/// Starts the background worker.
///
/// The first tick fires one full interval after start.
pub fn spawn(interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
    debug!(">>> StartWorker");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Worker stopped");
                    break;
                }
                _ = ticker.tick() => worker_task(),
            }
        }
    })
}
