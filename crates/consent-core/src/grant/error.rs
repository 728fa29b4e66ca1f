//! Grant-specific error types.

use thiserror::Error;

use super::state::GrantStatus;

/// Errors that can occur while validating or transitioning a grant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GrantError {
    /// The grant request carried no data-type scopes.
    #[error("grant must name at least one data-type scope")]
    EmptyScopes,

    /// The expiry does not lie strictly after the creation instant.
    #[error("expiry must lie after creation: created_at={created_at}, expires_at={expires_at}")]
    ExpiryNotAfterCreation {
        /// Creation timestamp (Unix nanos).
        created_at: u64,
        /// Proposed expiry timestamp (Unix nanos).
        expires_at: u64,
    },

    /// The requested state change is not a legal transition.
    #[error("illegal grant transition: {from} -> {to}")]
    InvalidTransition {
        /// The grant's current status.
        from: GrantStatus,
        /// The attempted target status.
        to: GrantStatus,
    },

    /// A status string could not be parsed.
    #[error("invalid grant status: {value}")]
    InvalidStatus {
        /// The unrecognized value.
        value: String,
    },

    /// An access-level string could not be parsed.
    #[error("invalid access level: {value}")]
    InvalidAccessLevel {
        /// The unrecognized value.
        value: String,
    },

    /// A revocation-reason string could not be parsed.
    #[error("invalid revocation reason: {value}")]
    InvalidRevocationReason {
        /// The unrecognized value.
        value: String,
    },

    /// A duration string could not be parsed or is non-positive.
    #[error("malformed duration: {value}")]
    MalformedDuration {
        /// The offending value.
        value: String,
    },

    /// A time-restriction window string could not be parsed.
    #[error("malformed time window: {value} (expected HH:MM-HH:MM)")]
    MalformedTimeWindow {
        /// The offending value.
        value: String,
    },

    /// A required field was empty.
    #[error("field {field} must not be empty")]
    EmptyField {
        /// The field name.
        field: &'static str,
    },
}
