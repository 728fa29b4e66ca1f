//! Policy evaluation for incoming grant requests.
//!
//! [`evaluate`] is a pure function: given the same terms and the same rule
//! set it always produces the same [`Decision`]. Manual approval is not a
//! special path through the evaluator. A `Hold` decision parks the grant
//! in `pending`, and the eventual human verdict arrives as a deferred call
//! to the same approve/reject transition API.
//!
//! Rule matching is by purpose code. Duration is advisory: a request asking
//! for longer than the matched rule allows is clamped, not rejected. Access
//! level is a hard bound: exceeding it rejects.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::grant::AccessLevel;
use crate::time::NANOS_PER_SEC;

/// An administrator-defined constraint on what terms a grant request may be
/// approved with. Read-only to this engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyRule {
    /// Rule identifier.
    pub id: String,
    /// Purpose codes this rule covers.
    pub allowed_purpose_codes: BTreeSet<String>,
    /// Longest grant duration the rule permits, in seconds.
    pub max_duration_secs: u64,
    /// Highest access level the rule permits.
    pub max_access_level: AccessLevel,
    /// Whether approval requires a human decision.
    pub requires_manual_approval: bool,
}

impl PolicyRule {
    /// Returns true if this rule covers the purpose code.
    #[must_use]
    pub fn covers(&self, purpose_code: &str) -> bool {
        self.allowed_purpose_codes.contains(purpose_code)
    }
}

/// Why a request was rejected by policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RejectReason {
    /// No rule covers the request's purpose code.
    NoMatchingPolicy,
    /// The requested access level exceeds the matched rule's bound.
    AccessLevelExceeded,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RejectReason {
    /// Returns the wire string for this reason.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoMatchingPolicy => "NO_MATCHING_POLICY",
            Self::AccessLevelExceeded => "ACCESS_LEVEL_EXCEEDED",
        }
    }
}

/// The evaluator's verdict on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Decision {
    /// Approve immediately with the (possibly clamped) expiry.
    Approve {
        /// Expiry instant (Unix nanos).
        expires_at: u64,
    },
    /// Hold in pending for manual approval, expiry already fixed.
    Hold {
        /// Expiry instant (Unix nanos).
        expires_at: u64,
    },
    /// Reject terminally.
    Reject {
        /// Why the request was rejected.
        reason: RejectReason,
    },
}

/// The request terms the evaluator decides on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantTerms {
    /// Controlled-vocabulary purpose code.
    pub purpose_code: String,
    /// Requested duration in seconds.
    pub requested_duration_secs: u64,
    /// Requested access level.
    pub access_level: AccessLevel,
    /// Creation instant the expiry is anchored to (Unix nanos).
    pub created_at: u64,
}

/// Decides whether the proposed terms are permissible under the active
/// rules.
///
/// The first rule covering the purpose code wins. No covering rule rejects
/// with [`RejectReason::NoMatchingPolicy`].
#[must_use]
pub fn evaluate(terms: &GrantTerms, rules: &[PolicyRule]) -> Decision {
    let Some(rule) = rules.iter().find(|r| r.covers(&terms.purpose_code)) else {
        return Decision::Reject {
            reason: RejectReason::NoMatchingPolicy,
        };
    };

    if terms.access_level > rule.max_access_level {
        return Decision::Reject {
            reason: RejectReason::AccessLevelExceeded,
        };
    }

    let effective_secs = terms.requested_duration_secs.min(rule.max_duration_secs);
    let expires_at = terms
        .created_at
        .saturating_add(effective_secs.saturating_mul(NANOS_PER_SEC));

    if rule.requires_manual_approval {
        Decision::Hold { expires_at }
    } else {
        Decision::Approve { expires_at }
    }
}
