//! consent-core - Consent/Access-Grant Engine
//!
//! This library is the core of the consent subsystem of an electronic
//! medical records deployment: it issues, enforces, times out, and revokes
//! time-bound permissions for external organizations to read a patient's
//! medical data, and keeps a tamper-evident audit trail of every decision.
//!
//! Presentation and delivery layers (portals, dashboards, notification
//! transports) are collaborators, not residents: they submit grant
//! requests and read grant status through [`engine::ConsentEngine`], and
//! the data-serving layer consults [`gate::AccessGate`] on every read.
//!
//! # Modules
//!
//! - [`grant`]: grant records, the lifecycle state machine, and wire types
//! - [`policy`]: pure evaluation of grant requests against policy rules
//! - [`store`]: the durable grant repository with optimistic versioning
//! - [`audit`]: the append-only, hash-chained audit ledger
//! - [`gate`]: the per-request authorization oracle
//! - [`revocation`]: forced termination on external signals
//! - [`sweep`]: the expiry sweep over the store
//! - [`engine`]: the facade wiring policy, store, and ledger together
//! - [`time`]: UTC instant helpers
//!
//! # Concurrency model
//!
//! The store is the single source of truth and every writer goes through
//! compare-and-swap; the audit ledger is append-only and concurrent-safe by
//! construction. The gate and the evaluator are pure with respect to their
//! inputs and hold no state of their own. No component owns process-wide
//! singleton state: stores are injected as `Arc` handles.

pub mod audit;
pub mod engine;
pub mod gate;
pub mod grant;
pub mod policy;
pub mod revocation;
pub mod store;
pub mod sweep;
pub mod time;

pub use audit::{AuditEvent, AuditEventKind, AuditFilter, AuditLog, SqliteAuditLog};
pub use engine::{ConsentEngine, EngineError, InMemoryPolicyProvider, PolicyProvider};
pub use gate::{AccessDecision, AccessGate, DenialReason};
pub use grant::{
    AccessGrant, AccessLevel, GrantId, GrantRequest, GrantResource, GrantStatus, TimeWindow,
};
pub use policy::{Decision, GrantTerms, PolicyRule, RejectReason};
pub use revocation::{RevocationSignal, RevocationTrigger};
pub use store::{ContractStore, SqliteContractStore, StoreError};
pub use sweep::{ExpirySweeper, SweepOutcome};
