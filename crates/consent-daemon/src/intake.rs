//! Revocation signal intake.
//!
//! Suspicious-activity flags, breach reports, policy-violation reports, and
//! patient withdrawals arrive from the operational layer through an mpsc
//! channel; this worker drains the queue and feeds each signal to the
//! [`RevocationTrigger`] behind `spawn_blocking`.
//!
//! The intake stops when every sender handle has been dropped.

use std::sync::Arc;

use consent_core::revocation::{RevocationSignal, RevocationTrigger};
use consent_core::time::current_timestamp_ns;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Default depth of the signal queue.
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

/// The worker draining revocation signals into the trigger.
pub struct RevocationIntake {
    trigger: Arc<RevocationTrigger>,
    rx: mpsc::Receiver<RevocationSignal>,
}

impl RevocationIntake {
    /// Creates an intake with its sender side.
    #[must_use]
    pub fn channel(
        trigger: Arc<RevocationTrigger>,
        queue_depth: usize,
    ) -> (mpsc::Sender<RevocationSignal>, Self) {
        let (tx, rx) = mpsc::channel(queue_depth);
        (tx, Self { trigger, rx })
    }

    /// Drains signals until all senders are dropped.
    ///
    /// Signal failures are logged and the loop continues: one unprocessable
    /// signal must not stall breach handling behind it.
    pub async fn run(mut self) {
        info!("revocation intake started");

        while let Some(signal) = self.rx.recv().await {
            let trigger = Arc::clone(&self.trigger);
            let result = tokio::task::spawn_blocking(move || {
                trigger.handle_signal(&signal, current_timestamp_ns())
            })
            .await;
            match result {
                Ok(Ok(revoked)) => info!(revoked, "revocation signal processed"),
                Ok(Err(error)) => warn!(%error, "revocation signal failed"),
                Err(error) => warn!(%error, "revocation task failed to run"),
            }
        }

        info!("revocation intake stopped");
    }
}
