//! Grant record and lifecycle state machine.
//!
//! The lifecycle is strictly forward:
//!
//! ```text
//! pending --> approved --> (expired | revoked)
//! pending --> rejected
//! ```
//!
//! `approved` is the only state from which data access is permitted.
//! `rejected`, `expired`, and `revoked` are terminal: once reached, no
//! further transition changes the record. Transition attempts on a terminal
//! grant are the caller's signal to no-op idempotently (see
//! [`crate::sweep`] and [`crate::revocation`]).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::GrantError;
use crate::time::{MINUTES_PER_DAY, minute_of_day};

// =============================================================================
// Identifiers
// =============================================================================

/// Opaque unique identifier for an access grant ("contract id").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantId(String);

impl GrantId {
    /// Mints a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GrantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for GrantId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for GrantId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// =============================================================================
// Status
// =============================================================================

/// The lifecycle state of an access grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum GrantStatus {
    /// Awaiting a policy decision or manual approval.
    Pending,
    /// Access is permitted until expiry or revocation.
    Approved,
    /// Rejected by policy or a manual reviewer. Terminal.
    Rejected,
    /// The grant's time window elapsed. Terminal.
    Expired,
    /// Force-terminated by a revocation signal. Terminal.
    Revoked,
}

impl std::fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl GrantStatus {
    /// Parses a status from its wire string.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::InvalidStatus`] if the string is not recognized.
    pub fn parse(s: &str) -> Result<Self, GrantError> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            "revoked" => Ok(Self::Revoked),
            _ => Err(GrantError::InvalidStatus {
                value: s.to_string(),
            }),
        }
    }

    /// Returns the wire string for this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }

    /// Returns true if this is a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Expired | Self::Revoked)
    }

    /// Returns true if `to` is a legal successor of this status.
    #[must_use]
    pub const fn permits_transition_to(&self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Approved, Self::Expired)
                | (Self::Approved, Self::Revoked)
        )
    }
}

// =============================================================================
// Access level
// =============================================================================

/// How much of the patient record a grant exposes.
///
/// Ordered: `ReadSummary < ReadFull`. Policy comparison relies on this
/// ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum AccessLevel {
    /// Summary-level record access.
    #[default]
    ReadSummary,
    /// Full record access.
    ReadFull,
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AccessLevel {
    /// Parses an access level from its wire string.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::InvalidAccessLevel`] if the string is not
    /// recognized.
    pub fn parse(s: &str) -> Result<Self, GrantError> {
        match s {
            "read-summary" => Ok(Self::ReadSummary),
            "read-full" => Ok(Self::ReadFull),
            _ => Err(GrantError::InvalidAccessLevel {
                value: s.to_string(),
            }),
        }
    }

    /// Returns the wire string for this level.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ReadSummary => "read-summary",
            Self::ReadFull => "read-full",
        }
    }
}

// =============================================================================
// Revocation reason
// =============================================================================

/// Why a grant was revoked. The reason is the kind of signal that forced
/// the termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RevocationReason {
    /// A targeted suspicious-activity flag.
    SuspiciousActivity,
    /// An organization-wide breach report.
    BreachReport,
    /// A policy-violation report.
    PolicyViolation,
    /// The patient withdrew consent.
    PatientWithdrawal,
}

impl std::fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RevocationReason {
    /// Parses a revocation reason from its wire string.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::InvalidRevocationReason`] if the string is not
    /// recognized.
    pub fn parse(s: &str) -> Result<Self, GrantError> {
        match s {
            "SuspiciousActivity" => Ok(Self::SuspiciousActivity),
            "BreachReport" => Ok(Self::BreachReport),
            "PolicyViolation" => Ok(Self::PolicyViolation),
            "PatientWithdrawal" => Ok(Self::PatientWithdrawal),
            _ => Err(GrantError::InvalidRevocationReason {
                value: s.to_string(),
            }),
        }
    }

    /// Returns the wire string for this reason.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SuspiciousActivity => "SuspiciousActivity",
            Self::BreachReport => "BreachReport",
            Self::PolicyViolation => "PolicyViolation",
            Self::PatientWithdrawal => "PatientWithdrawal",
        }
    }
}

// =============================================================================
// Time window
// =============================================================================

/// An allowed-hours window, expressed as UTC minutes-of-day.
///
/// The window is half-open: `[start_minute, end_minute)`. A window whose
/// start lies after its end wraps across midnight, e.g. `22:00-06:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeWindow {
    /// Inclusive start, minutes after UTC midnight.
    pub start_minute: u32,
    /// Exclusive end, minutes after UTC midnight.
    pub end_minute: u32,
}

impl TimeWindow {
    /// Creates a window, validating both bounds.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::MalformedTimeWindow`] if either bound is out of
    /// range or the window is empty.
    pub fn new(start_minute: u32, end_minute: u32) -> Result<Self, GrantError> {
        if start_minute >= MINUTES_PER_DAY
            || end_minute >= MINUTES_PER_DAY
            || start_minute == end_minute
        {
            return Err(GrantError::MalformedTimeWindow {
                value: format!("{start_minute}-{end_minute}"),
            });
        }
        Ok(Self {
            start_minute,
            end_minute,
        })
    }

    /// Parses a window from its `HH:MM-HH:MM` wire form.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::MalformedTimeWindow`] on any parse failure.
    pub fn parse(s: &str) -> Result<Self, GrantError> {
        let malformed = || GrantError::MalformedTimeWindow {
            value: s.to_string(),
        };
        let (start, end) = s.split_once('-').ok_or_else(malformed)?;
        let start = Self::parse_minutes(start).ok_or_else(malformed)?;
        let end = Self::parse_minutes(end).ok_or_else(malformed)?;
        Self::new(start, end).map_err(|_| malformed())
    }

    fn parse_minutes(s: &str) -> Option<u32> {
        let (hh, mm) = s.trim().split_once(':')?;
        let hours: u32 = hh.parse().ok()?;
        let minutes: u32 = mm.parse().ok()?;
        if hours >= 24 || minutes >= 60 {
            return None;
        }
        Some(hours * 60 + minutes)
    }

    /// Returns true if the instant's UTC time-of-day falls inside the window.
    #[must_use]
    pub const fn admits(&self, instant_ns: u64) -> bool {
        let minute = minute_of_day(instant_ns);
        if self.start_minute < self.end_minute {
            minute >= self.start_minute && minute < self.end_minute
        } else {
            // Wraps across midnight.
            minute >= self.start_minute || minute < self.end_minute
        }
    }
}

// =============================================================================
// Access grant
// =============================================================================

/// A time-bound permission for one requester to read specified data types
/// for one patient.
///
/// The record is exclusively owned by the contract store; all mutation goes
/// through [`crate::store::ContractStore::compare_and_swap`], which bumps
/// `version` on every committed change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessGrant {
    /// Unique contract identifier.
    pub id: GrantId,
    /// The patient whose data is covered.
    pub patient_id: String,
    /// The external organization reading the data.
    pub requester_id: String,
    /// Data-type tags covered by the grant. Never empty.
    pub scopes: BTreeSet<String>,
    /// Free-text purpose statement.
    pub purpose: String,
    /// Controlled-vocabulary purpose code.
    pub purpose_code: String,
    /// How much of the record the grant exposes.
    pub access_level: AccessLevel,
    /// Optional allowed-hours window.
    pub time_restrictions: Option<TimeWindow>,
    /// Lifecycle state.
    pub status: GrantStatus,
    /// Creation instant (Unix nanos, UTC).
    pub created_at: u64,
    /// Expiry instant (Unix nanos, UTC). Always after `created_at`.
    pub expires_at: u64,
    /// Approval instant, set on the pending -> approved transition.
    pub approved_at: Option<u64>,
    /// Revocation instant, set on the approved -> revoked transition.
    pub revoked_at: Option<u64>,
    /// Why the grant was revoked, if it was.
    pub revocation_reason: Option<RevocationReason>,
    /// Monotonic version for optimistic concurrency.
    pub version: u64,
}

impl AccessGrant {
    /// Checks the record's structural invariants.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::EmptyScopes`] or
    /// [`GrantError::ExpiryNotAfterCreation`] on violation.
    pub fn validate(&self) -> Result<(), GrantError> {
        if self.scopes.is_empty() {
            return Err(GrantError::EmptyScopes);
        }
        if self.expires_at <= self.created_at {
            return Err(GrantError::ExpiryNotAfterCreation {
                created_at: self.created_at,
                expires_at: self.expires_at,
            });
        }
        Ok(())
    }

    /// Returns true if the grant is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns true if the grant's expiry has passed at `instant_ns`.
    #[must_use]
    pub const fn is_expired_at(&self, instant_ns: u64) -> bool {
        instant_ns >= self.expires_at
    }

    /// Returns true if the grant permits access at `instant_ns`, before
    /// scope and time-of-day filtering.
    ///
    /// Activity is re-derived from `expires_at` on every call; a grant the
    /// sweep has not yet marked expired is never active past its expiry.
    #[must_use]
    pub const fn is_active_at(&self, instant_ns: u64) -> bool {
        matches!(self.status, GrantStatus::Approved)
            && instant_ns >= self.created_at
            && instant_ns < self.expires_at
    }

    /// Returns true if the grant covers the given data type.
    #[must_use]
    pub fn covers_scope(&self, data_type: &str) -> bool {
        self.scopes.contains(data_type)
    }

    /// Returns true if the optional allowed-hours window admits the instant.
    #[must_use]
    pub fn window_admits(&self, instant_ns: u64) -> bool {
        self.time_restrictions
            .as_ref()
            .map_or(true, |w| w.admits(instant_ns))
    }

    /// Produces the approved successor of a pending grant.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::InvalidTransition`] unless the grant is pending.
    pub fn approved_at_instant(&self, at_ns: u64) -> Result<Self, GrantError> {
        self.require_transition(GrantStatus::Approved)?;
        let mut next = self.clone();
        next.status = GrantStatus::Approved;
        next.approved_at = Some(at_ns);
        Ok(next)
    }

    /// Produces the rejected successor of a pending grant. The rejection
    /// reason travels on the audit event, not the record.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::InvalidTransition`] unless the grant is pending.
    pub fn rejected(&self) -> Result<Self, GrantError> {
        self.require_transition(GrantStatus::Rejected)?;
        let mut next = self.clone();
        next.status = GrantStatus::Rejected;
        Ok(next)
    }

    /// Produces the expired successor of an approved grant.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::InvalidTransition`] unless the grant is
    /// approved.
    pub fn expired(&self) -> Result<Self, GrantError> {
        self.require_transition(GrantStatus::Expired)?;
        let mut next = self.clone();
        next.status = GrantStatus::Expired;
        Ok(next)
    }

    /// Produces the revoked successor of an approved grant.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::InvalidTransition`] unless the grant is
    /// approved.
    pub fn revoked(&self, reason: RevocationReason, at_ns: u64) -> Result<Self, GrantError> {
        self.require_transition(GrantStatus::Revoked)?;
        let mut next = self.clone();
        next.status = GrantStatus::Revoked;
        next.revoked_at = Some(at_ns);
        next.revocation_reason = Some(reason);
        Ok(next)
    }

    fn require_transition(&self, to: GrantStatus) -> Result<(), GrantError> {
        if self.status.permits_transition_to(to) {
            Ok(())
        } else {
            Err(GrantError::InvalidTransition {
                from: self.status,
                to,
            })
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::time::NANOS_PER_SEC;

    fn sample_grant(status: GrantStatus) -> AccessGrant {
        AccessGrant {
            id: GrantId::from("grant-001"),
            patient_id: "patient-1".to_string(),
            requester_id: "clinic-9".to_string(),
            scopes: BTreeSet::from(["lab_results".to_string()]),
            purpose: "continuity of care".to_string(),
            purpose_code: "treatment".to_string(),
            access_level: AccessLevel::ReadSummary,
            time_restrictions: None,
            status,
            created_at: 1_000 * NANOS_PER_SEC,
            expires_at: 4_600 * NANOS_PER_SEC,
            approved_at: None,
            revoked_at: None,
            revocation_reason: None,
            version: 1,
        }
    }

    // =========================================================================
    // Status tests
    // =========================================================================

    #[test]
    fn test_status_round_trip() {
        for status in [
            GrantStatus::Pending,
            GrantStatus::Approved,
            GrantStatus::Rejected,
            GrantStatus::Expired,
            GrantStatus::Revoked,
        ] {
            assert_eq!(GrantStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_status_parse_rejects_unknown() {
        assert!(matches!(
            GrantStatus::parse("cancelled"),
            Err(GrantError::InvalidStatus { .. })
        ));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!GrantStatus::Pending.is_terminal());
        assert!(!GrantStatus::Approved.is_terminal());
        assert!(GrantStatus::Rejected.is_terminal());
        assert!(GrantStatus::Expired.is_terminal());
        assert!(GrantStatus::Revoked.is_terminal());
    }

    #[test]
    fn test_legal_transitions() {
        assert!(GrantStatus::Pending.permits_transition_to(GrantStatus::Approved));
        assert!(GrantStatus::Pending.permits_transition_to(GrantStatus::Rejected));
        assert!(GrantStatus::Approved.permits_transition_to(GrantStatus::Expired));
        assert!(GrantStatus::Approved.permits_transition_to(GrantStatus::Revoked));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!GrantStatus::Pending.permits_transition_to(GrantStatus::Expired));
        assert!(!GrantStatus::Approved.permits_transition_to(GrantStatus::Pending));
        assert!(!GrantStatus::Rejected.permits_transition_to(GrantStatus::Approved));
        assert!(!GrantStatus::Expired.permits_transition_to(GrantStatus::Revoked));
        assert!(!GrantStatus::Revoked.permits_transition_to(GrantStatus::Expired));
    }

    // =========================================================================
    // Access level tests
    // =========================================================================

    #[test]
    fn test_access_level_ordering() {
        assert!(AccessLevel::ReadSummary < AccessLevel::ReadFull);
    }

    #[test]
    fn test_access_level_round_trip() {
        assert_eq!(
            AccessLevel::parse("read-summary").unwrap(),
            AccessLevel::ReadSummary
        );
        assert_eq!(
            AccessLevel::parse("read-full").unwrap(),
            AccessLevel::ReadFull
        );
        assert!(matches!(
            AccessLevel::parse("write"),
            Err(GrantError::InvalidAccessLevel { .. })
        ));
    }

    // =========================================================================
    // Revocation reason tests
    // =========================================================================

    #[test]
    fn test_revocation_reason_round_trip() {
        for reason in [
            RevocationReason::SuspiciousActivity,
            RevocationReason::BreachReport,
            RevocationReason::PolicyViolation,
            RevocationReason::PatientWithdrawal,
        ] {
            assert_eq!(RevocationReason::parse(reason.as_str()).unwrap(), reason);
        }
    }

    // =========================================================================
    // Time window tests
    // =========================================================================

    #[test]
    fn test_window_parse() {
        let window = TimeWindow::parse("09:00-17:30").unwrap();
        assert_eq!(window.start_minute, 9 * 60);
        assert_eq!(window.end_minute, 17 * 60 + 30);
    }

    #[test]
    fn test_window_parse_rejects_garbage() {
        for bad in ["", "9-17", "09:00", "25:00-26:00", "09:99-10:00", "10:00-10:00"] {
            assert!(
                matches!(
                    TimeWindow::parse(bad),
                    Err(GrantError::MalformedTimeWindow { .. })
                ),
                "expected parse failure for {bad:?}"
            );
        }
    }

    #[test]
    fn test_window_admits_plain() {
        let window = TimeWindow::new(9 * 60, 17 * 60).unwrap();
        let nine_am = 9 * 3600 * NANOS_PER_SEC;
        let noon = 12 * 3600 * NANOS_PER_SEC;
        let five_pm = 17 * 3600 * NANOS_PER_SEC;
        assert!(window.admits(nine_am));
        assert!(window.admits(noon));
        assert!(!window.admits(five_pm));
    }

    #[test]
    fn test_window_admits_wraps_midnight() {
        let window = TimeWindow::new(22 * 60, 6 * 60).unwrap();
        let eleven_pm = 23 * 3600 * NANOS_PER_SEC;
        let two_am = 2 * 3600 * NANOS_PER_SEC;
        let noon = 12 * 3600 * NANOS_PER_SEC;
        assert!(window.admits(eleven_pm));
        assert!(window.admits(two_am));
        assert!(!window.admits(noon));
    }

    // =========================================================================
    // Grant tests
    // =========================================================================

    #[test]
    fn test_validate_rejects_empty_scopes() {
        let mut grant = sample_grant(GrantStatus::Pending);
        grant.scopes.clear();
        assert!(matches!(grant.validate(), Err(GrantError::EmptyScopes)));
    }

    #[test]
    fn test_validate_rejects_inverted_expiry() {
        let mut grant = sample_grant(GrantStatus::Pending);
        grant.expires_at = grant.created_at;
        assert!(matches!(
            grant.validate(),
            Err(GrantError::ExpiryNotAfterCreation { .. })
        ));
    }

    #[test]
    fn test_activity_is_derived_from_expiry() {
        let grant = sample_grant(GrantStatus::Approved);
        assert!(grant.is_active_at(grant.created_at));
        assert!(grant.is_active_at(grant.expires_at - 1));
        // Still marked approved, but past expiry: never active.
        assert!(!grant.is_active_at(grant.expires_at));
        assert!(!grant.is_active_at(grant.expires_at + NANOS_PER_SEC));
    }

    #[test]
    fn test_pending_grant_is_never_active() {
        let grant = sample_grant(GrantStatus::Pending);
        assert!(!grant.is_active_at(grant.created_at + 1));
    }

    #[test]
    fn test_approve_sets_timestamp() {
        let grant = sample_grant(GrantStatus::Pending);
        let at = grant.created_at + NANOS_PER_SEC;
        let approved = grant.approved_at_instant(at).unwrap();
        assert_eq!(approved.status, GrantStatus::Approved);
        assert_eq!(approved.approved_at, Some(at));
    }

    #[test]
    fn test_revoke_records_reason() {
        let grant = sample_grant(GrantStatus::Approved);
        let at = grant.created_at + NANOS_PER_SEC;
        let revoked = grant.revoked(RevocationReason::BreachReport, at).unwrap();
        assert_eq!(revoked.status, GrantStatus::Revoked);
        assert_eq!(revoked.revoked_at, Some(at));
        assert_eq!(
            revoked.revocation_reason,
            Some(RevocationReason::BreachReport)
        );
    }

    #[test]
    fn test_terminal_grant_refuses_transition() {
        let grant = sample_grant(GrantStatus::Revoked);
        assert!(matches!(
            grant.expired(),
            Err(GrantError::InvalidTransition { .. })
        ));
        assert!(matches!(
            grant.revoked(RevocationReason::BreachReport, 0),
            Err(GrantError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_pending_cannot_expire() {
        let grant = sample_grant(GrantStatus::Pending);
        assert!(matches!(
            grant.expired(),
            Err(GrantError::InvalidTransition {
                from: GrantStatus::Pending,
                to: GrantStatus::Expired,
            })
        ));
    }

    // =========================================================================
    // Property tests
    // =========================================================================

    fn arb_status() -> impl Strategy<Value = GrantStatus> {
        prop_oneof![
            Just(GrantStatus::Pending),
            Just(GrantStatus::Approved),
            Just(GrantStatus::Rejected),
            Just(GrantStatus::Expired),
            Just(GrantStatus::Revoked),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Property: no legal transition ever leaves a terminal state.
        #[test]
        fn prop_terminal_states_are_absorbing(from in arb_status(), to in arb_status()) {
            if from.is_terminal() {
                prop_assert!(!from.permits_transition_to(to));
            }
        }

        /// Property: every legal transition moves strictly forward (never
        /// back to pending, and only out of a non-terminal state).
        #[test]
        fn prop_transitions_move_forward(from in arb_status(), to in arb_status()) {
            if from.permits_transition_to(to) {
                prop_assert!(!from.is_terminal());
                prop_assert!(!matches!(to, GrantStatus::Pending));
            }
        }

        /// Property: a window admits an instant iff it admits the same
        /// time-of-day on any later day.
        #[test]
        fn prop_window_is_daily_periodic(
            start in 0u32..1440,
            end in 0u32..1440,
            second_of_day in 0u64..86_400,
            day in 0u64..10_000,
        ) {
            prop_assume!(start != end);
            let window = TimeWindow::new(start, end).unwrap();
            let base = second_of_day * NANOS_PER_SEC;
            let later = base + day * 86_400 * NANOS_PER_SEC;
            prop_assert_eq!(window.admits(base), window.admits(later));
        }
    }
}
