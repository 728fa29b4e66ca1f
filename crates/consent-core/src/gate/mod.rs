//! The per-request authorization oracle.
//!
//! [`AccessGate::check_access`] answers whether a given (requester, patient,
//! data-type, instant) access is currently permitted, and audits every
//! decision.
//!
//! # Correctness model
//!
//! - The gate always reads current records from the store, never a cached
//!   copy: once a revocation or expiry commits, every later check observes
//!   the terminal state.
//! - Activity is re-derived from `status` AND `expires_at` together; a
//!   grant the sweep has not yet marked expired is never treated as active
//!   past its expiry. The sweep is bookkeeping, not authorization.
//! - Infrastructure failure fails closed: if the store cannot be reached,
//!   or an allow cannot be audited, the caller gets a denial.

use std::sync::Arc;

use tracing::warn;

use crate::audit::{AuditEvent, AuditLog};
use crate::grant::{AccessCheckResult, AccessGrant, GrantId};
use crate::store::ContractStore;

/// Why an access check was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DenialReason {
    /// No approved grant covers this requester and patient at the instant.
    NoGrant,
    /// A live grant exists, but none covers the requested data type.
    ScopeMismatch,
    /// A covering grant exists, but the instant falls outside its
    /// allowed-hours window.
    OutsideTimeWindow,
    /// The store or the audit ledger could not be reached; denied by
    /// fail-closed policy.
    StoreUnavailable,
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DenialReason {
    /// Returns the wire string for this reason.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoGrant => "no_grant",
            Self::ScopeMismatch => "scope_mismatch",
            Self::OutsideTimeWindow => "outside_time_window",
            Self::StoreUnavailable => "store_unavailable",
        }
    }
}

/// The outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AccessDecision {
    /// Access permitted under the named grant.
    Allowed {
        /// The grant that authorized the access.
        grant_id: GrantId,
    },
    /// Access denied.
    Denied {
        /// Why.
        reason: DenialReason,
    },
}

impl AccessDecision {
    /// Returns true if access was permitted.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

impl From<&AccessDecision> for AccessCheckResult {
    fn from(decision: &AccessDecision) -> Self {
        match decision {
            AccessDecision::Allowed { grant_id } => Self {
                allowed: true,
                reason: None,
                grant_id: Some(grant_id.to_string()),
            },
            AccessDecision::Denied { reason } => Self {
                allowed: false,
                reason: Some(reason.as_str().to_string()),
                grant_id: None,
            },
        }
    }
}

/// The synchronous authorization check consulted on every data read.
pub struct AccessGate {
    store: Arc<dyn ContractStore>,
    audit: Arc<dyn AuditLog>,
}

impl AccessGate {
    /// Creates a gate over the given store and audit ledger.
    #[must_use]
    pub fn new(store: Arc<dyn ContractStore>, audit: Arc<dyn AuditLog>) -> Self {
        Self { store, audit }
    }

    /// Decides whether `requester_id` may read `data_type` for
    /// `patient_id` at `instant_ns`, and audits the decision.
    ///
    /// Never errors: every failure mode collapses to a denial.
    #[must_use]
    pub fn check_access(
        &self,
        requester_id: &str,
        patient_id: &str,
        data_type: &str,
        instant_ns: u64,
    ) -> AccessDecision {
        let grants = match self.store.list_active_for_patient(patient_id) {
            Ok(grants) => grants,
            Err(error) => {
                warn!(%error, patient_id, requester_id, "store unreachable, denying access");
                let decision = AccessDecision::Denied {
                    reason: DenialReason::StoreUnavailable,
                };
                self.record_denial(&decision, requester_id, patient_id, instant_ns);
                return decision;
            }
        };

        let decision = Self::decide(&grants, requester_id, data_type, instant_ns);

        match &decision {
            AccessDecision::Allowed { grant_id } => {
                let event = AuditEvent::access_check(
                    Some(grant_id.clone()),
                    patient_id,
                    requester_id,
                    instant_ns,
                    true,
                    None,
                );
                if let Err(error) = self.audit.append(event) {
                    // An allow that cannot be audited must not stand.
                    warn!(%error, %grant_id, "audit ledger unreachable, denying access");
                    return AccessDecision::Denied {
                        reason: DenialReason::StoreUnavailable,
                    };
                }
                decision
            }
            AccessDecision::Denied { .. } => {
                self.record_denial(&decision, requester_id, patient_id, instant_ns);
                decision
            }
        }
    }

    /// Pure decision over a snapshot of the patient's approved grants.
    fn decide(
        grants: &[AccessGrant],
        requester_id: &str,
        data_type: &str,
        instant_ns: u64,
    ) -> AccessDecision {
        let live: Vec<&AccessGrant> = grants
            .iter()
            .filter(|g| g.requester_id == requester_id && g.is_active_at(instant_ns))
            .collect();
        if live.is_empty() {
            return AccessDecision::Denied {
                reason: DenialReason::NoGrant,
            };
        }

        let scoped: Vec<&AccessGrant> =
            live.into_iter().filter(|g| g.covers_scope(data_type)).collect();
        if scoped.is_empty() {
            return AccessDecision::Denied {
                reason: DenialReason::ScopeMismatch,
            };
        }

        match scoped.iter().find(|g| g.window_admits(instant_ns)) {
            Some(grant) => AccessDecision::Allowed {
                grant_id: grant.id.clone(),
            },
            None => AccessDecision::Denied {
                reason: DenialReason::OutsideTimeWindow,
            },
        }
    }

    fn record_denial(
        &self,
        decision: &AccessDecision,
        requester_id: &str,
        patient_id: &str,
        instant_ns: u64,
    ) {
        let AccessDecision::Denied { reason } = decision else {
            return;
        };
        let event = AuditEvent::access_check(
            None,
            patient_id,
            requester_id,
            instant_ns,
            false,
            Some(reason.as_str().to_string()),
        );
        if let Err(error) = self.audit.append(event) {
            // The check is already denied; the lost denial record is logged
            // and nothing else can be done synchronously.
            warn!(%error, patient_id, requester_id, "failed to audit denial");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
