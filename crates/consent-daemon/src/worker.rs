//! Background sweep worker.
//!
//! Runs [`ExpirySweeper::sweep_at`] on a fixed interval until shutdown is
//! requested. The sweep does blocking `SQLite` work, so each tick runs
//! inside `spawn_blocking` to keep the async runtime responsive.
//!
//! Authorization never waits on this worker: the access gate re-derives
//! expiry on every check, so a late tick only delays bookkeeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use consent_core::sweep::ExpirySweeper;
use consent_core::time::current_timestamp_ns;
use tracing::{debug, info, warn};

/// Configuration for the sweep worker.
#[derive(Debug, Clone)]
pub struct SweepWorkerConfig {
    /// Time between sweep ticks.
    pub interval: Duration,
}

impl Default for SweepWorkerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

impl SweepWorkerConfig {
    /// Sets the tick interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// The background worker driving the expiry sweep.
pub struct SweepWorker {
    sweeper: Arc<ExpirySweeper>,
    config: SweepWorkerConfig,
    shutdown: Arc<AtomicBool>,
}

impl SweepWorker {
    /// Creates a worker over the given sweeper.
    #[must_use]
    pub fn new(sweeper: Arc<ExpirySweeper>, config: SweepWorkerConfig) -> Self {
        Self {
            sweeper,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a handle for requesting shutdown.
    #[must_use]
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Runs the sweep loop until shutdown is requested.
    ///
    /// Tick failures are logged and the loop continues; a failed tick means
    /// the next one simply has more to do.
    #[allow(clippy::cast_possible_truncation)] // interval is always well below u64::MAX ms
    pub async fn run(self) {
        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            "sweep worker started"
        );

        while !self.shutdown.load(Ordering::Relaxed) {
            let sweeper = Arc::clone(&self.sweeper);
            let result =
                tokio::task::spawn_blocking(move || sweeper.sweep_at(current_timestamp_ns()))
                    .await;
            match result {
                Ok(Ok(outcome)) => {
                    if outcome.expired > 0 || outcome.skipped > 0 {
                        debug!(
                            expired = outcome.expired,
                            skipped = outcome.skipped,
                            "sweep tick complete"
                        );
                    }
                }
                Ok(Err(error)) => warn!(%error, "sweep tick failed"),
                Err(error) => warn!(%error, "sweep task failed to run"),
            }

            tokio::time::sleep(self.config.interval).await;
        }

        info!("sweep worker stopped");
    }
}
