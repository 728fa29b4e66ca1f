//! The engine facade that wires policy, store, and audit together.
//!
//! [`ConsentEngine`] owns the request path: a collaborator submits a
//! [`GrantRequest`], the policy evaluator decides, the store persists, and
//! the audit ledger records. Manual approval is not a separate mechanism:
//! a held request parks in `pending`, and the admin collaborator's eventual
//! verdict arrives as [`ConsentEngine::approve`] or
//! [`ConsentEngine::reject`], the same transition API the evaluator uses.
//!
//! Policy rules are read-only here; an administrative collaborator swaps
//! rule sets through a [`PolicyProvider`].

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::info;

use crate::audit::{
    AuditError, AuditEvent, AuditEventKind, AuditFilter, AuditLog, SYSTEM_ACTOR,
};
use crate::grant::{
    AccessGrant, GrantError, GrantId, GrantRequest, GrantResource, GrantStatus, TimeWindow,
    parse_duration_secs,
};
use crate::policy::{Decision, GrantTerms, PolicyRule, evaluate};
use crate::store::{ContractStore, StoreError};
use crate::time::NANOS_PER_SEC;

/// Default grant duration applied when a request names none: 24 hours.
pub const DEFAULT_DURATION_SECS: u64 = 86_400;

/// Default bound on compare-and-swap attempts for manual transitions.
pub const DEFAULT_MAX_TRANSITION_ATTEMPTS: u32 = 3;

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// The request or transition is invalid. Not retried.
    #[error("validation error: {0}")]
    Validation(#[from] GrantError),

    /// The store could not complete the operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The audit ledger could not record a committed transition.
    #[error("audit error: {0}")]
    Audit(#[from] AuditError),

    /// A manual transition kept losing compare-and-swap races.
    #[error("gave up on grant {id} after {attempts} contended attempts")]
    RetriesExhausted {
        /// The contested grant.
        id: GrantId,
        /// How many attempts were made.
        attempts: u32,
    },
}

/// Source of the currently active policy rules.
pub trait PolicyProvider: Send + Sync {
    /// Returns a snapshot of the active rules, in precedence order.
    fn active_rules(&self) -> Vec<PolicyRule>;
}

/// A policy provider holding its rule set in memory.
///
/// The administrative collaborator replaces the whole set atomically;
/// evaluations in flight keep the snapshot they read.
#[derive(Debug, Default)]
pub struct InMemoryPolicyProvider {
    rules: RwLock<Vec<PolicyRule>>,
}

impl InMemoryPolicyProvider {
    /// Creates a provider with an initial rule set.
    #[must_use]
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self {
            rules: RwLock::new(rules),
        }
    }

    /// Atomically replaces the active rule set.
    #[allow(clippy::missing_panics_doc)] // poisoning is unrecoverable
    pub fn replace(&self, rules: Vec<PolicyRule>) {
        *self.rules.write().unwrap() = rules;
    }
}

impl PolicyProvider for InMemoryPolicyProvider {
    #[allow(clippy::missing_panics_doc)]
    fn active_rules(&self) -> Vec<PolicyRule> {
        self.rules.read().unwrap().clone()
    }
}

/// The consent/access-grant engine.
pub struct ConsentEngine {
    store: Arc<dyn ContractStore>,
    audit: Arc<dyn AuditLog>,
    policies: Arc<dyn PolicyProvider>,
    default_duration_secs: u64,
    max_transition_attempts: u32,
}

impl ConsentEngine {
    /// Creates an engine over the given store, ledger, and policy source.
    #[must_use]
    pub fn new(
        store: Arc<dyn ContractStore>,
        audit: Arc<dyn AuditLog>,
        policies: Arc<dyn PolicyProvider>,
    ) -> Self {
        Self {
            store,
            audit,
            policies,
            default_duration_secs: DEFAULT_DURATION_SECS,
            max_transition_attempts: DEFAULT_MAX_TRANSITION_ATTEMPTS,
        }
    }

    /// Sets the duration applied to requests that name none.
    #[must_use]
    pub const fn with_default_duration_secs(mut self, secs: u64) -> Self {
        self.default_duration_secs = secs;
        self
    }

    /// Sets the bound on contended transition attempts.
    #[must_use]
    pub const fn with_max_transition_attempts(mut self, attempts: u32) -> Self {
        self.max_transition_attempts = attempts;
        self
    }

    /// Processes a grant request end to end: validate, evaluate, persist,
    /// audit. Returns the persisted grant in its decided state.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for malformed requests before
    /// anything is persisted. Policy rejection is not an error: the grant
    /// comes back in `rejected` status with the reason on its audit trail.
    pub fn submit(&self, request: &GrantRequest, now_ns: u64) -> Result<AccessGrant, EngineError> {
        request.validate()?;
        let requested_duration_secs = match request.duration.as_deref() {
            Some(raw) => parse_duration_secs(raw)?,
            None => self.default_duration_secs,
        };
        let time_restrictions = request
            .time_restrictions
            .as_deref()
            .map(TimeWindow::parse)
            .transpose()?;
        let access_level = request.access_level.unwrap_or_default();

        let terms = GrantTerms {
            purpose_code: request.purpose_code.clone(),
            requested_duration_secs,
            access_level,
            created_at: now_ns,
        };
        let decision = evaluate(&terms, &self.policies.active_rules());

        let (status, expires_at, approved_at, reject_reason) = match decision {
            Decision::Approve { expires_at } => {
                (GrantStatus::Approved, expires_at, Some(now_ns), None)
            }
            Decision::Hold { expires_at } => (GrantStatus::Pending, expires_at, None, None),
            Decision::Reject { reason } => (
                GrantStatus::Rejected,
                now_ns.saturating_add(requested_duration_secs.saturating_mul(NANOS_PER_SEC)),
                None,
                Some(reason),
            ),
        };

        let grant = AccessGrant {
            id: GrantId::generate(),
            patient_id: request.patient_id.clone(),
            requester_id: request.requester_id.clone(),
            scopes: request.data_types.iter().cloned().collect::<BTreeSet<_>>(),
            purpose: request.purpose.clone(),
            purpose_code: request.purpose_code.clone(),
            access_level,
            time_restrictions,
            status,
            created_at: now_ns,
            expires_at,
            approved_at,
            revoked_at: None,
            revocation_reason: None,
            version: 1,
        };
        self.store.create(&grant)?;

        self.audit.append(AuditEvent::created(
            grant.id.clone(),
            grant.patient_id.clone(),
            grant.requester_id.clone(),
            now_ns,
        ))?;
        match (grant.status, reject_reason) {
            (GrantStatus::Approved, _) => {
                self.audit.append(AuditEvent::transition(
                    grant.id.clone(),
                    grant.patient_id.clone(),
                    AuditEventKind::Approved,
                    SYSTEM_ACTOR,
                    now_ns,
                    None,
                    GrantStatus::Pending,
                    GrantStatus::Approved,
                ))?;
            }
            (GrantStatus::Rejected, reason) => {
                self.audit.append(AuditEvent::transition(
                    grant.id.clone(),
                    grant.patient_id.clone(),
                    AuditEventKind::Rejected,
                    SYSTEM_ACTOR,
                    now_ns,
                    reason.map(|r| r.as_str().to_string()),
                    GrantStatus::Pending,
                    GrantStatus::Rejected,
                ))?;
            }
            _ => {}
        }

        info!(id = %grant.id, status = %grant.status, "grant request processed");
        Ok(grant)
    }

    /// The deferred manual-approval verdict: pending -> approved.
    ///
    /// Approving an already-approved grant is an idempotent success, and a
    /// transition attempt on a terminal grant is a no-op that succeeds
    /// without firing an audit event.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RetriesExhausted`] if the record stays
    /// contended past the attempt bound.
    pub fn approve(
        &self,
        id: &GrantId,
        actor: &str,
        now_ns: u64,
    ) -> Result<AccessGrant, EngineError> {
        self.manual_transition(id, actor, now_ns, GrantStatus::Approved, None)
    }

    /// The deferred manual-rejection verdict: pending -> rejected.
    ///
    /// # Errors
    ///
    /// As [`ConsentEngine::approve`]; additionally returns
    /// [`EngineError::Validation`] when rejecting a grant that is already
    /// approved (not a legal transition).
    pub fn reject(
        &self,
        id: &GrantId,
        actor: &str,
        reason: &str,
        now_ns: u64,
    ) -> Result<AccessGrant, EngineError> {
        self.manual_transition(
            id,
            actor,
            now_ns,
            GrantStatus::Rejected,
            Some(reason.to_string()),
        )
    }

    fn manual_transition(
        &self,
        id: &GrantId,
        actor: &str,
        now_ns: u64,
        target: GrantStatus,
        reason: Option<String>,
    ) -> Result<AccessGrant, EngineError> {
        let mut attempts = 0u32;
        loop {
            let current = self.store.get(id)?;
            if current.status == target || current.is_terminal() {
                // Idempotent no-op: nothing changes, no event fires.
                return Ok(current);
            }
            if !current.status.permits_transition_to(target) {
                return Err(EngineError::Validation(GrantError::InvalidTransition {
                    from: current.status,
                    to: target,
                }));
            }

            let result = self.store.compare_and_swap(id, current.version, &mut |g| {
                match target {
                    GrantStatus::Approved => g.approved_at_instant(now_ns),
                    _ => g.rejected(),
                }
            });
            match result {
                Ok(committed) => {
                    let kind = match target {
                        GrantStatus::Approved => AuditEventKind::Approved,
                        _ => AuditEventKind::Rejected,
                    };
                    self.audit.append(AuditEvent::transition(
                        committed.id.clone(),
                        committed.patient_id.clone(),
                        kind,
                        actor,
                        now_ns,
                        reason,
                        GrantStatus::Pending,
                        target,
                    ))?;
                    return Ok(committed);
                }
                Err(StoreError::ConcurrentModification { .. }) => {
                    attempts += 1;
                    if attempts >= self.max_transition_attempts {
                        return Err(EngineError::RetriesExhausted {
                            id: id.clone(),
                            attempts,
                        });
                    }
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    /// Fetches the current record for a grant.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] wrapped in
    /// [`EngineError::Store`] for an unknown id.
    pub fn grant(&self, id: &GrantId) -> Result<AccessGrant, EngineError> {
        Ok(self.store.get(id)?)
    }

    /// Returns the external resource view of a grant.
    ///
    /// # Errors
    ///
    /// As [`ConsentEngine::grant`].
    pub fn resource(&self, id: &GrantId) -> Result<GrantResource, EngineError> {
        Ok(GrantResource::from(&self.store.get(id)?))
    }

    /// Lists the approved grants for a patient as external resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub fn list_active_for_patient(
        &self,
        patient_id: &str,
    ) -> Result<Vec<GrantResource>, EngineError> {
        Ok(self
            .store
            .list_active_for_patient(patient_id)?
            .iter()
            .map(GrantResource::from)
            .collect())
    }

    /// The compliance export: an ordered, paginated, filtered audit feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger query fails.
    pub fn export_audit(
        &self,
        filter: &AuditFilter,
        cursor: u64,
        limit: u64,
    ) -> Result<Vec<AuditEvent>, EngineError> {
        Ok(self.audit.export(filter, cursor, limit)?)
    }
}

// =============================================================================
// Tests
// =============================================================================
