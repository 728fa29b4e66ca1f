//! `SQLite`-backed contract store implementation.
//!
//! Uses WAL mode for concurrent reads. Compare-and-swap runs inside a
//! transaction: the row is re-read, the caller's expected version compared
//! against the committed one, and the successor written with a bumped
//! version, so two racing writers can never both commit against the same
//! expected version.

// SQLite returns i64 for integer columns; timestamps and versions are
// always non-negative and fit u64 until the year 2554.
// Mutex poisoning indicates a panic in another thread, which is
// unrecoverable.
#![allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::missing_panics_doc
)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};

use super::{ContractStore, Mutator, StoreError};
use crate::grant::{
    AccessGrant, AccessLevel, GrantId, GrantStatus, RevocationReason, TimeWindow,
};

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

const GRANT_COLUMNS: &str = "id, patient_id, requester_id, scopes, purpose, purpose_code, \
     access_level, time_restrictions, status, created_at, expires_at, \
     approved_at, revoked_at, revocation_reason, version";

/// The contract store backed by `SQLite`.
pub struct SqliteContractStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteContractStore {
    /// Opens or creates a store at the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn read_grant(conn: &Connection, id: &GrantId) -> Result<Option<AccessGrant>, StoreError> {
        let sql = format!("SELECT {GRANT_COLUMNS} FROM grants WHERE id = ?1");
        let row: Option<GrantRow> = conn
            .query_row(&sql, params![id.as_str()], GrantRow::from_row)
            .optional()?;
        row.map(GrantRow::into_grant).transpose()
    }

    fn query_grants(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<AccessGrant>, StoreError> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, GrantRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(GrantRow::into_grant).collect()
    }

    fn write_grant(conn: &Connection, grant: &AccessGrant) -> Result<usize, StoreError> {
        let scopes = serde_json::to_string(&grant.scopes)?;
        let window = grant
            .time_restrictions
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let n = conn.execute(
            "UPDATE grants SET status = ?2, approved_at = ?3, revoked_at = ?4, \
             revocation_reason = ?5, expires_at = ?6, scopes = ?7, \
             time_restrictions = ?8, version = ?9 \
             WHERE id = ?1 AND version = ?9 - 1",
            params![
                grant.id.as_str(),
                grant.status.as_str(),
                grant.approved_at.map(|v| v as i64),
                grant.revoked_at.map(|v| v as i64),
                grant.revocation_reason.map(|r| r.as_str()),
                grant.expires_at as i64,
                scopes,
                window,
                grant.version as i64,
            ],
        )?;
        Ok(n)
    }
}

impl ContractStore for SqliteContractStore {
    fn create(&self, grant: &AccessGrant) -> Result<(), StoreError> {
        grant.validate()?;
        let scopes = serde_json::to_string(&grant.scopes)?;
        let window = grant
            .time_restrictions
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        if Self::read_grant(&tx, &grant.id)?.is_some() {
            return Err(StoreError::AlreadyExists {
                id: grant.id.clone(),
            });
        }
        tx.execute(
            "INSERT INTO grants (id, patient_id, requester_id, scopes, purpose, \
             purpose_code, access_level, time_restrictions, status, created_at, \
             expires_at, approved_at, revoked_at, revocation_reason, version) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                grant.id.as_str(),
                grant.patient_id,
                grant.requester_id,
                scopes,
                grant.purpose,
                grant.purpose_code,
                grant.access_level.as_str(),
                window,
                grant.status.as_str(),
                grant.created_at as i64,
                grant.expires_at as i64,
                grant.approved_at.map(|v| v as i64),
                grant.revoked_at.map(|v| v as i64),
                grant.revocation_reason.map(|r| r.as_str()),
                grant.version as i64,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get(&self, id: &GrantId) -> Result<AccessGrant, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::read_grant(&conn, id)?.ok_or_else(|| StoreError::NotFound { id: id.clone() })
    }

    fn compare_and_swap(
        &self,
        id: &GrantId,
        expected_version: u64,
        mutate: Mutator<'_>,
    ) -> Result<AccessGrant, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let current =
            Self::read_grant(&tx, id)?.ok_or_else(|| StoreError::NotFound { id: id.clone() })?;
        if current.version != expected_version {
            return Err(StoreError::ConcurrentModification {
                id: id.clone(),
                expected: expected_version,
                actual: current.version,
            });
        }

        let mut next = mutate(&current)?;
        next.version = current.version + 1;
        next.validate()?;

        let n = Self::write_grant(&tx, &next)?;
        if n == 0 {
            return Err(StoreError::ConcurrentModification {
                id: id.clone(),
                expected: expected_version,
                actual: current.version,
            });
        }
        tx.commit()?;
        Ok(next)
    }

    fn list_active_for_patient(&self, patient_id: &str) -> Result<Vec<AccessGrant>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {GRANT_COLUMNS} FROM grants \
             WHERE patient_id = ?1 AND status = 'approved' \
             ORDER BY created_at ASC"
        );
        Self::query_grants(&conn, &sql, params![patient_id])
    }

    fn list_active_for_requester(
        &self,
        requester_id: &str,
    ) -> Result<Vec<AccessGrant>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {GRANT_COLUMNS} FROM grants \
             WHERE requester_id = ?1 AND status = 'approved' \
             ORDER BY created_at ASC"
        );
        Self::query_grants(&conn, &sql, params![requester_id])
    }

    fn list_expiring_before(&self, instant_ns: u64) -> Result<Vec<AccessGrant>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {GRANT_COLUMNS} FROM grants \
             WHERE status = 'approved' AND expires_at <= ?1 \
             ORDER BY expires_at ASC"
        );
        Self::query_grants(&conn, &sql, params![instant_ns as i64])
    }
}

/// Raw column values read back from a grant row, converted to the typed
/// record outside the rusqlite row callback.
struct GrantRow {
    id: String,
    patient_id: String,
    requester_id: String,
    scopes: String,
    purpose: String,
    purpose_code: String,
    access_level: String,
    time_restrictions: Option<String>,
    status: String,
    created_at: i64,
    expires_at: i64,
    approved_at: Option<i64>,
    revoked_at: Option<i64>,
    revocation_reason: Option<String>,
    version: i64,
}

impl GrantRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            requester_id: row.get(2)?,
            scopes: row.get(3)?,
            purpose: row.get(4)?,
            purpose_code: row.get(5)?,
            access_level: row.get(6)?,
            time_restrictions: row.get(7)?,
            status: row.get(8)?,
            created_at: row.get(9)?,
            expires_at: row.get(10)?,
            approved_at: row.get(11)?,
            revoked_at: row.get(12)?,
            revocation_reason: row.get(13)?,
            version: row.get(14)?,
        })
    }

    fn into_grant(self) -> Result<AccessGrant, StoreError> {
        let time_restrictions: Option<TimeWindow> = self
            .time_restrictions
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(AccessGrant {
            id: GrantId::from(self.id),
            patient_id: self.patient_id,
            requester_id: self.requester_id,
            scopes: serde_json::from_str(&self.scopes)?,
            purpose: self.purpose,
            purpose_code: self.purpose_code,
            access_level: AccessLevel::parse(&self.access_level)?,
            time_restrictions,
            status: GrantStatus::parse(&self.status)?,
            created_at: self.created_at as u64,
            expires_at: self.expires_at as u64,
            approved_at: self.approved_at.map(|v| v as u64),
            revoked_at: self.revoked_at.map(|v| v as u64),
            revocation_reason: self
                .revocation_reason
                .as_deref()
                .map(RevocationReason::parse)
                .transpose()?,
            version: self.version as u64,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
