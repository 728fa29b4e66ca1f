//! Append-only audit ledger of lifecycle events and access decisions.
//!
//! Every committed grant transition and every access-gate decision appends
//! exactly one [`AuditEvent`]. Events are never updated or deleted. Each
//! event carries `prev_hash`/`event_hash` forming a SHA-256 chain from a
//! genesis hash of 32 zero bytes, so any retroactive edit breaks
//! [`AuditLog::verify_chain`].
//!
//! # Example
//!
//! ```rust
//! use consent_core::audit::{AuditLog, SqliteAuditLog};
//!
//! # fn example() -> Result<(), consent_core::audit::AuditError> {
//! let log = SqliteAuditLog::in_memory()?;
//! log.verify_chain()?; // empty chain is trivially intact
//! # Ok(())
//! # }
//! ```

mod sqlite;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grant::{GrantError, GrantId, GrantStatus};

pub use sqlite::SqliteAuditLog;

/// The actor recorded for engine-initiated events.
pub const SYSTEM_ACTOR: &str = "system";

/// Errors that can occur during audit-log operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuditError {
    /// Database error from `SQLite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored column could not be decoded.
    #[error("corrupt audit record: {0}")]
    Decode(#[from] GrantError),

    /// Hash chain verification failed.
    #[error("audit chain broken at seq_id={seq_id}: {details}")]
    ChainBroken {
        /// The sequence ID where the chain broke.
        seq_id: u64,
        /// Details about the failure.
        details: String,
    },
}

/// One lifecycle transition or access decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AuditEventKind {
    /// A grant record was created (pending).
    Created,
    /// pending -> approved.
    Approved,
    /// pending -> rejected.
    Rejected,
    /// A successful access-gate check.
    Accessed,
    /// A denied access-gate check.
    AccessDenied,
    /// approved -> expired.
    Expired,
    /// approved -> revoked.
    Revoked,
}

impl std::fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AuditEventKind {
    /// Parses an event kind from its wire string.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::InvalidStatus`] if the string is not
    /// recognized.
    pub fn parse(s: &str) -> Result<Self, GrantError> {
        match s {
            "created" => Ok(Self::Created),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "accessed" => Ok(Self::Accessed),
            "access_denied" => Ok(Self::AccessDenied),
            "expired" => Ok(Self::Expired),
            "revoked" => Ok(Self::Revoked),
            _ => Err(GrantError::InvalidStatus {
                value: s.to_string(),
            }),
        }
    }

    /// Returns the wire string for this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Accessed => "accessed",
            Self::AccessDenied => "access_denied",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }
}

/// An immutable record of one lifecycle transition or access decision.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct AuditEvent {
    /// Sequence ID, assigned by the log on append.
    pub seq_id: Option<u64>,
    /// The grant the event concerns; absent for denials matching no grant.
    pub contract_id: Option<GrantId>,
    /// The patient whose data the event concerns.
    pub patient_id: Option<String>,
    /// What happened.
    pub kind: AuditEventKind,
    /// Who caused it: a requester id, a patient id, or `"system"`.
    pub actor: String,
    /// When it happened (Unix nanos, UTC).
    pub timestamp_ns: u64,
    /// Free-text reason, where the transition requires one.
    pub reason: Option<String>,
    /// Status before a transition; absent for access checks.
    pub previous_status: Option<GrantStatus>,
    /// Status after a transition; absent for access checks.
    pub new_status: Option<GrantStatus>,
    /// Hash of the previous event (chain link), assigned on append.
    pub prev_hash: Option<Vec<u8>>,
    /// Hash of this event's content, assigned on append.
    pub event_hash: Option<Vec<u8>>,
}

impl AuditEvent {
    /// Creates a state-transition event.
    #[must_use]
    pub fn transition(
        contract_id: GrantId,
        patient_id: impl Into<String>,
        kind: AuditEventKind,
        actor: impl Into<String>,
        timestamp_ns: u64,
        reason: Option<String>,
        previous_status: GrantStatus,
        new_status: GrantStatus,
    ) -> Self {
        Self {
            seq_id: None,
            contract_id: Some(contract_id),
            patient_id: Some(patient_id.into()),
            kind,
            actor: actor.into(),
            timestamp_ns,
            reason,
            previous_status: Some(previous_status),
            new_status: Some(new_status),
            prev_hash: None,
            event_hash: None,
        }
    }

    /// Creates the record-creation event. There is no state before
    /// creation, so `previous_status` is absent and `new_status` is
    /// `pending`.
    #[must_use]
    pub fn created(
        contract_id: GrantId,
        patient_id: impl Into<String>,
        actor: impl Into<String>,
        timestamp_ns: u64,
    ) -> Self {
        Self {
            seq_id: None,
            contract_id: Some(contract_id),
            patient_id: Some(patient_id.into()),
            kind: AuditEventKind::Created,
            actor: actor.into(),
            timestamp_ns,
            reason: None,
            previous_status: None,
            new_status: Some(GrantStatus::Pending),
            prev_hash: None,
            event_hash: None,
        }
    }

    /// Creates an access-check event (`Accessed` or `AccessDenied`).
    #[must_use]
    pub fn access_check(
        contract_id: Option<GrantId>,
        patient_id: impl Into<String>,
        actor: impl Into<String>,
        timestamp_ns: u64,
        allowed: bool,
        reason: Option<String>,
    ) -> Self {
        Self {
            seq_id: None,
            contract_id,
            patient_id: Some(patient_id.into()),
            kind: if allowed {
                AuditEventKind::Accessed
            } else {
                AuditEventKind::AccessDenied
            },
            actor: actor.into(),
            timestamp_ns,
            reason,
            previous_status: None,
            new_status: None,
            prev_hash: None,
            event_hash: None,
        }
    }

    /// Returns the canonical bytes hashed into the chain.
    ///
    /// Optional fields are length-prefixed with zero length when absent, so
    /// the encoding is unambiguous.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        fn push_field(bytes: &mut Vec<u8>, value: Option<&str>) {
            let value = value.unwrap_or("");
            bytes.extend_from_slice(&(value.len() as u32).to_be_bytes());
            bytes.extend_from_slice(value.as_bytes());
        }

        let mut bytes = Vec::new();
        push_field(&mut bytes, self.contract_id.as_ref().map(GrantId::as_str));
        push_field(&mut bytes, self.patient_id.as_deref());
        push_field(&mut bytes, Some(self.kind.as_str()));
        push_field(&mut bytes, Some(&self.actor));
        bytes.extend_from_slice(&self.timestamp_ns.to_be_bytes());
        push_field(&mut bytes, self.reason.as_deref());
        push_field(&mut bytes, self.previous_status.map(|s| s.as_str()));
        push_field(&mut bytes, self.new_status.map(|s| s.as_str()));
        bytes
    }
}

/// Filter for the audit export feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    /// Only events for this contract.
    pub contract_id: Option<GrantId>,
    /// Only events for this patient.
    pub patient_id: Option<String>,
    /// Only events of this kind.
    pub kind: Option<AuditEventKind>,
}

/// Append-only ledger of audit events.
///
/// Any component may append; none may mutate existing entries. Safe for
/// concurrent writers by construction.
pub trait AuditLog: Send + Sync {
    /// Appends an event, assigning its sequence ID and chain hashes.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be persisted.
    fn append(&self, event: AuditEvent) -> Result<u64, AuditError>;

    /// Reads events with sequence IDs >= `cursor`, in sequence order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn read_from(&self, cursor: u64, limit: u64) -> Result<Vec<AuditEvent>, AuditError>;

    /// The compliance export: an ordered, paginated, filtered feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn export(
        &self,
        filter: &AuditFilter,
        cursor: u64,
        limit: u64,
    ) -> Result<Vec<AuditEvent>, AuditError>;

    /// Walks the whole chain and verifies every hash link.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::ChainBroken`] at the first broken link.
    fn verify_chain(&self) -> Result<(), AuditError>;
}
