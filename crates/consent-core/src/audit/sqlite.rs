//! `SQLite`-backed audit ledger implementation.
//!
//! Appends run under the connection mutex, so the hash chain is extended
//! atomically: each event's `event_hash` is SHA-256 over the previous
//! event's hash concatenated with the event's canonical bytes.

// SQLite returns i64 for integer columns; sequence ids and timestamps are
// always non-negative. Mutex poisoning indicates a panic in another thread,
// which is unrecoverable.
#![allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::missing_panics_doc
)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params, params_from_iter};
use sha2::{Digest, Sha256};

use super::{AuditError, AuditEvent, AuditEventKind, AuditFilter, AuditLog};
use crate::grant::{GrantId, GrantStatus};

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Genesis hash: 32 zero bytes.
const GENESIS_HASH: [u8; 32] = [0u8; 32];

const EVENT_COLUMNS: &str = "seq_id, contract_id, patient_id, kind, actor, timestamp_ns, \
     reason, previous_status, new_status, prev_hash, event_hash";

/// The append-only audit ledger backed by `SQLite`.
pub struct SqliteAuditLog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAuditLog {
    /// Opens or creates a ledger at the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
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

    /// Creates an in-memory ledger for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self, AuditError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn last_event_hash(conn: &Connection) -> Result<Vec<u8>, AuditError> {
        let hash: Option<Vec<u8>> = conn
            .query_row(
                "SELECT event_hash FROM audit_events ORDER BY seq_id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash.unwrap_or_else(|| GENESIS_HASH.to_vec()))
    }

    fn chain_hash(prev_hash: &[u8], canonical: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(prev_hash);
        hasher.update(canonical);
        hasher.finalize().to_vec()
    }

    fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRow> {
        Ok(EventRow {
            seq_id: row.get(0)?,
            contract_id: row.get(1)?,
            patient_id: row.get(2)?,
            kind: row.get(3)?,
            actor: row.get(4)?,
            timestamp_ns: row.get(5)?,
            reason: row.get(6)?,
            previous_status: row.get(7)?,
            new_status: row.get(8)?,
            prev_hash: row.get(9)?,
            event_hash: row.get(10)?,
        })
    }
}

impl AuditLog for SqliteAuditLog {
    fn append(&self, mut event: AuditEvent) -> Result<u64, AuditError> {
        let conn = self.conn.lock().unwrap();

        let prev_hash = Self::last_event_hash(&conn)?;
        let event_hash = Self::chain_hash(&prev_hash, &event.canonical_bytes());
        event.prev_hash = Some(prev_hash.clone());
        event.event_hash = Some(event_hash.clone());

        conn.execute(
            "INSERT INTO audit_events (contract_id, patient_id, kind, actor, \
             timestamp_ns, reason, previous_status, new_status, prev_hash, event_hash) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                event.contract_id.as_ref().map(GrantId::as_str),
                event.patient_id,
                event.kind.as_str(),
                event.actor,
                event.timestamp_ns as i64,
                event.reason,
                event.previous_status.map(|s| s.as_str()),
                event.new_status.map(|s| s.as_str()),
                prev_hash,
                event_hash,
            ],
        )?;

        Ok(conn.last_insert_rowid() as u64)
    }

    fn read_from(&self, cursor: u64, limit: u64) -> Result<Vec<AuditEvent>, AuditError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM audit_events \
             WHERE seq_id >= ?1 ORDER BY seq_id ASC LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![cursor as i64, limit as i64], Self::row_to_event)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(EventRow::into_event).collect()
    }

    fn export(
        &self,
        filter: &AuditFilter,
        cursor: u64,
        limit: u64,
    ) -> Result<Vec<AuditEvent>, AuditError> {
        let conn = self.conn.lock().unwrap();

        let mut sql = format!("SELECT {EVENT_COLUMNS} FROM audit_events WHERE seq_id >= ?");
        let mut args: Vec<Value> = vec![Value::Integer(cursor as i64)];
        if let Some(contract_id) = &filter.contract_id {
            sql.push_str(" AND contract_id = ?");
            args.push(Value::Text(contract_id.as_str().to_string()));
        }
        if let Some(patient_id) = &filter.patient_id {
            sql.push_str(" AND patient_id = ?");
            args.push(Value::Text(patient_id.clone()));
        }
        if let Some(kind) = &filter.kind {
            sql.push_str(" AND kind = ?");
            args.push(Value::Text(kind.as_str().to_string()));
        }
        sql.push_str(" ORDER BY seq_id ASC LIMIT ?");
        args.push(Value::Integer(limit as i64));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args), Self::row_to_event)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(EventRow::into_event).collect()
    }

    fn verify_chain(&self) -> Result<(), AuditError> {
        let mut expected_prev: Vec<u8> = GENESIS_HASH.to_vec();
        let mut cursor = 0u64;
        let batch = 1_000u64;

        loop {
            let events = self.read_from(cursor, batch)?;
            if events.is_empty() {
                return Ok(());
            }
            for event in &events {
                let seq_id = event.seq_id.unwrap_or(0);
                let prev = event.prev_hash.as_deref().unwrap_or(&[]);
                if prev != expected_prev.as_slice() {
                    return Err(AuditError::ChainBroken {
                        seq_id,
                        details: "prev_hash mismatch".to_string(),
                    });
                }
                let computed = Self::chain_hash(prev, &event.canonical_bytes());
                if event.event_hash.as_deref() != Some(computed.as_slice()) {
                    return Err(AuditError::ChainBroken {
                        seq_id,
                        details: "event_hash mismatch".to_string(),
                    });
                }
                expected_prev = computed;
            }
            cursor = events.last().and_then(|e| e.seq_id).unwrap_or(0) + 1;
        }
    }
}

/// Raw column values read back from an audit row.
struct EventRow {
    seq_id: i64,
    contract_id: Option<String>,
    patient_id: Option<String>,
    kind: String,
    actor: String,
    timestamp_ns: i64,
    reason: Option<String>,
    previous_status: Option<String>,
    new_status: Option<String>,
    prev_hash: Vec<u8>,
    event_hash: Vec<u8>,
}

impl EventRow {
    fn into_event(self) -> Result<AuditEvent, AuditError> {
        Ok(AuditEvent {
            seq_id: Some(self.seq_id as u64),
            contract_id: self.contract_id.map(GrantId::from),
            patient_id: self.patient_id,
            kind: AuditEventKind::parse(&self.kind)?,
            actor: self.actor,
            timestamp_ns: self.timestamp_ns as u64,
            reason: self.reason,
            previous_status: self
                .previous_status
                .as_deref()
                .map(GrantStatus::parse)
                .transpose()?,
            new_status: self
                .new_status
                .as_deref()
                .map(GrantStatus::parse)
                .transpose()?,
            prev_hash: Some(self.prev_hash),
            event_hash: Some(self.event_hash),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
