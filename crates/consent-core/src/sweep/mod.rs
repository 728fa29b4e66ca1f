//! The expiry sweep that transitions lapsed grants to `expired`.
//!
//! The sweep is bookkeeping, not authorization: the access gate already
//! refuses any grant past its expiry, so nothing is at stake if a tick runs
//! late. That is also why the sweep never contends: a compare-and-swap
//! conflict means another process already transitioned the grant, and the
//! sweep simply skips it.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::audit::{AuditError, AuditEvent, AuditEventKind, AuditLog, SYSTEM_ACTOR};
use crate::grant::GrantStatus;
use crate::store::{ContractStore, StoreError};

/// Errors that can occur during a sweep tick.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SweepError {
    /// The store could not be read or written.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A committed expiry could not be audited.
    #[error("audit error: {0}")]
    Audit(#[from] AuditError),
}

/// What one sweep tick accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Grants transitioned to `expired` by this tick.
    pub expired: usize,
    /// Grants another writer got to first.
    pub skipped: usize,
}

/// The background sweep over the contract store.
pub struct ExpirySweeper {
    store: Arc<dyn ContractStore>,
    audit: Arc<dyn AuditLog>,
}

impl ExpirySweeper {
    /// Creates a sweeper over the given store and audit ledger.
    #[must_use]
    pub fn new(store: Arc<dyn ContractStore>, audit: Arc<dyn AuditLog>) -> Self {
        Self { store, audit }
    }

    /// Runs one sweep: every approved grant whose expiry lies at or before
    /// `now_ns` is transitioned to `expired`, with one audit event per
    /// committed transition.
    ///
    /// # Errors
    ///
    /// Returns an error if the store listing fails or a committed expiry
    /// cannot be audited. Per-grant compare-and-swap conflicts are skips,
    /// not errors.
    pub fn sweep_at(&self, now_ns: u64) -> Result<SweepOutcome, SweepError> {
        let due = self.store.list_expiring_before(now_ns)?;
        let mut outcome = SweepOutcome::default();

        for grant in due {
            if grant.is_terminal() {
                outcome.skipped += 1;
                continue;
            }
            let result = self.store.compare_and_swap(
                &grant.id,
                grant.version,
                &mut |g| g.expired(),
            );
            match result {
                Ok(committed) => {
                    self.audit.append(AuditEvent::transition(
                        committed.id.clone(),
                        committed.patient_id.clone(),
                        AuditEventKind::Expired,
                        SYSTEM_ACTOR,
                        now_ns,
                        None,
                        GrantStatus::Approved,
                        GrantStatus::Expired,
                    ))?;
                    outcome.expired += 1;
                }
                Err(StoreError::ConcurrentModification { .. } | StoreError::Mutation(_)) => {
                    // Another process already transitioned it. Expiry is not
                    // urgent enough to contend.
                    debug!(id = %grant.id, "expiry already handled elsewhere");
                    outcome.skipped += 1;
                }
                Err(other) => return Err(other.into()),
            }
        }

        if outcome.expired > 0 || outcome.skipped > 0 {
            info!(expired = outcome.expired, skipped = outcome.skipped, "sweep tick");
        }
        Ok(outcome)
    }
}

// =============================================================================
// Tests
// =============================================================================
