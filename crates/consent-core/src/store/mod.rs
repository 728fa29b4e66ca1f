//! Durable repository of grant records with optimistic versioning.
//!
//! The store is the single source of truth for [`AccessGrant`] records.
//! Every mutation goes through [`ContractStore::compare_and_swap`]: the
//! caller reads the current record, computes a successor, and submits the
//! version it read; if another writer committed first, the call fails with
//! [`StoreError::ConcurrentModification`] and the caller must re-read. This
//! is the mechanism that prevents a revocation and an unrelated update from
//! silently clobbering each other.
//!
//! # Example
//!
//! ```rust
//! use consent_core::store::{ContractStore, SqliteContractStore};
//!
//! # fn example() -> Result<(), consent_core::store::StoreError> {
//! let store = SqliteContractStore::in_memory()?;
//! let expiring = store.list_expiring_before(1_000_000_000)?;
//! assert!(expiring.is_empty());
//! # Ok(())
//! # }
//! ```

mod sqlite;

use thiserror::Error;

use crate::grant::{AccessGrant, GrantError, GrantId};

pub use sqlite::SqliteContractStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// No grant exists with the given id.
    #[error("grant not found: {id}")]
    NotFound {
        /// The missing grant id.
        id: GrantId,
    },

    /// Another writer committed a newer version first.
    #[error("concurrent modification of grant {id}: expected version {expected}, found {actual}")]
    ConcurrentModification {
        /// The contested grant id.
        id: GrantId,
        /// The version the caller read.
        expected: u64,
        /// The version currently committed.
        actual: u64,
    },

    /// A grant with this id already exists.
    #[error("grant already exists: {id}")]
    AlreadyExists {
        /// The duplicate grant id.
        id: GrantId,
    },

    /// The mutation callback refused the update.
    #[error("mutation rejected: {0}")]
    Mutation(#[from] GrantError),

    /// Database error from `SQLite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored column could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store backend cannot be reached.
    #[error("store unavailable: {reason}")]
    Unavailable {
        /// What failed.
        reason: String,
    },
}

/// The mutation callback handed to [`ContractStore::compare_and_swap`].
///
/// Receives the current record and returns its successor; the store bumps
/// `version` on commit.
pub type Mutator<'a> = &'a mut dyn FnMut(&AccessGrant) -> Result<AccessGrant, GrantError>;

/// Durable repository of grant records.
///
/// Implementations are safe for concurrent use; writers serialize through
/// optimistic versioning rather than long-held locks.
pub trait ContractStore: Send + Sync {
    /// Persists a freshly minted grant.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] on id collision, or a
    /// validation error if the record violates its invariants.
    fn create(&self, grant: &AccessGrant) -> Result<(), StoreError>;

    /// Fetches the current record for a grant.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    fn get(&self, id: &GrantId) -> Result<AccessGrant, StoreError>;

    /// Atomically replaces a grant with the mutator's successor, provided
    /// the committed version still equals `expected_version`.
    ///
    /// Returns the committed successor record (version already bumped).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConcurrentModification`] if another writer got
    /// there first, [`StoreError::NotFound`] for an unknown id, or
    /// [`StoreError::Mutation`] if the callback refuses the update.
    fn compare_and_swap(
        &self,
        id: &GrantId,
        expected_version: u64,
        mutate: Mutator<'_>,
    ) -> Result<AccessGrant, StoreError>;

    /// Lists grants in `approved` status for a patient.
    ///
    /// Callers must still re-derive liveness from `expires_at`; a grant the
    /// sweep has not yet expired is returned here.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn list_active_for_patient(&self, patient_id: &str) -> Result<Vec<AccessGrant>, StoreError>;

    /// Lists grants in `approved` status for a requester.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn list_active_for_requester(&self, requester_id: &str)
    -> Result<Vec<AccessGrant>, StoreError>;

    /// Lists approved grants whose expiry lies at or before `instant_ns`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn list_expiring_before(&self, instant_ns: u64) -> Result<Vec<AccessGrant>, StoreError>;
}
