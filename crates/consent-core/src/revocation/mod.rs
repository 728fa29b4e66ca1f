//! Forced termination of grants in response to external signals.
//!
//! [`RevocationTrigger::handle_signal`] resolves a signal's scope to the
//! set of affected grants and drives each one still in `approved` through
//! the approved -> revoked transition. The revocation reason is the signal
//! kind.
//!
//! Revocation is idempotent: a grant that is already terminal when the
//! trigger reaches it is skipped without error and without a second audit
//! event, because the sweep and the trigger may observe the same grant
//! concurrently. A compare-and-swap conflict against a grant that is still
//! live is retried once; a second conflict is logged and skipped.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::audit::{AuditError, AuditEvent, AuditEventKind, AuditLog, SYSTEM_ACTOR};
use crate::grant::{AccessGrant, GrantId, GrantStatus, RevocationReason};
use crate::store::{ContractStore, StoreError};

/// Errors that can occur while handling a revocation signal.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RevocationError {
    /// The store could not be read or written.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A committed revocation could not be audited.
    #[error("audit error: {0}")]
    Audit(#[from] AuditError),
}

/// An external signal that forces matching active grants into `revoked`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RevocationSignal {
    /// A targeted flag against one requester's access to one patient.
    SuspiciousActivity {
        /// The patient whose grants are affected.
        patient_id: String,
        /// The flagged requester.
        requester_id: String,
    },
    /// An organization-wide breach report: every grant held by the
    /// requester is affected.
    BreachReport {
        /// The breached requester.
        requester_id: String,
    },
    /// A policy-violation report against a requester organization.
    PolicyViolation {
        /// The offending requester.
        requester_id: String,
    },
    /// A patient-initiated withdrawal of a single grant.
    PatientWithdrawal {
        /// The withdrawn contract.
        contract_id: GrantId,
    },
}

impl RevocationSignal {
    /// Returns the revocation reason recorded for this signal kind.
    #[must_use]
    pub const fn reason(&self) -> RevocationReason {
        match self {
            Self::SuspiciousActivity { .. } => RevocationReason::SuspiciousActivity,
            Self::BreachReport { .. } => RevocationReason::BreachReport,
            Self::PolicyViolation { .. } => RevocationReason::PolicyViolation,
            Self::PatientWithdrawal { .. } => RevocationReason::PatientWithdrawal,
        }
    }
}

/// The component that force-terminates grants on external signals.
pub struct RevocationTrigger {
    store: Arc<dyn ContractStore>,
    audit: Arc<dyn AuditLog>,
}

impl RevocationTrigger {
    /// Creates a trigger over the given store and audit ledger.
    #[must_use]
    pub fn new(store: Arc<dyn ContractStore>, audit: Arc<dyn AuditLog>) -> Self {
        Self { store, audit }
    }

    /// Revokes every grant the signal's scope resolves to that is still in
    /// `approved` state. Returns the number of grants actually transitioned.
    ///
    /// # Errors
    ///
    /// Returns [`RevocationError::Store`] if scope resolution fails; for a
    /// withdrawal, that includes an unknown contract id. Per-grant
    /// compare-and-swap conflicts are not errors.
    pub fn handle_signal(
        &self,
        signal: &RevocationSignal,
        now_ns: u64,
    ) -> Result<usize, RevocationError> {
        let affected = self.resolve_scope(signal)?;
        let reason = signal.reason();
        let mut revoked = 0usize;

        for grant in &affected {
            if self.revoke_one(grant, reason, now_ns)? {
                revoked += 1;
            }
        }

        info!(
            reason = reason.as_str(),
            affected = affected.len(),
            revoked,
            "revocation signal handled"
        );
        Ok(revoked)
    }

    fn resolve_scope(&self, signal: &RevocationSignal) -> Result<Vec<AccessGrant>, StoreError> {
        match signal {
            RevocationSignal::SuspiciousActivity {
                patient_id,
                requester_id,
            } => Ok(self
                .store
                .list_active_for_patient(patient_id)?
                .into_iter()
                .filter(|g| g.requester_id == *requester_id)
                .collect()),
            RevocationSignal::BreachReport { requester_id }
            | RevocationSignal::PolicyViolation { requester_id } => {
                self.store.list_active_for_requester(requester_id)
            }
            RevocationSignal::PatientWithdrawal { contract_id } => {
                Ok(vec![self.store.get(contract_id)?])
            }
        }
    }

    /// Attempts the approved -> revoked transition for one grant.
    ///
    /// Returns `Ok(true)` if this call committed the transition.
    fn revoke_one(
        &self,
        grant: &AccessGrant,
        reason: RevocationReason,
        now_ns: u64,
    ) -> Result<bool, RevocationError> {
        let mut current = grant.clone();

        // One fresh read plus one retry after a conflict.
        for attempt in 0..2 {
            if current.is_terminal() {
                // Already handled elsewhere; idempotent success, no event.
                debug!(id = %current.id, status = %current.status, "grant already terminal");
                return Ok(false);
            }
            if current.status != GrantStatus::Approved {
                // Pending grants are not revocable; they are rejected, not
                // revoked, and a withdrawal of a pending grant is handled by
                // the approval path.
                debug!(id = %current.id, status = %current.status, "grant not revocable");
                return Ok(false);
            }

            let result = self.store.compare_and_swap(
                &current.id,
                current.version,
                &mut |g| g.revoked(reason, now_ns),
            );
            match result {
                Ok(committed) => {
                    self.audit.append(AuditEvent::transition(
                        committed.id.clone(),
                        committed.patient_id.clone(),
                        AuditEventKind::Revoked,
                        Self::actor_for(reason, &committed),
                        now_ns,
                        Some(reason.as_str().to_string()),
                        GrantStatus::Approved,
                        GrantStatus::Revoked,
                    ))?;
                    return Ok(true);
                }
                Err(StoreError::ConcurrentModification { .. }) if attempt == 0 => {
                    current = self.store.get(&current.id)?;
                }
                Err(StoreError::ConcurrentModification { .. }) => {
                    warn!(id = %current.id, "revocation still contended after retry, skipping");
                    return Ok(false);
                }
                Err(other) => return Err(other.into()),
            }
        }
        Ok(false)
    }

    fn actor_for(reason: RevocationReason, grant: &AccessGrant) -> String {
        match reason {
            RevocationReason::PatientWithdrawal => grant.patient_id.clone(),
            _ => SYSTEM_ACTOR.to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
