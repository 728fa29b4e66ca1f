//! Wire types exchanged with collaborating layers.
//!
//! The requester-facing UI submits a [`GrantRequest`]; status queries get a
//! [`GrantResource`] back. Both are camelCase JSON with unknown fields
//! rejected. Timestamps cross the boundary as RFC 3339 UTC strings; the
//! core model keeps u64 Unix nanos.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::error::GrantError;
use super::state::{AccessGrant, AccessLevel, GrantStatus};

/// A grant request as submitted by the requester-facing portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GrantRequest {
    /// The patient whose data is requested.
    pub patient_id: String,
    /// The requesting organization.
    pub requester_id: String,
    /// Requested data-type tags, e.g. `"lab_results"`.
    pub data_types: Vec<String>,
    /// Free-text purpose statement.
    pub purpose: String,
    /// Controlled-vocabulary purpose code.
    pub purpose_code: String,
    /// Requested duration, e.g. `"3600s"`, `"45m"`, `"24h"`, `"7d"`, or a
    /// bare second count. Falls back to the configured default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Requested access level; defaults to read-summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_level: Option<AccessLevel>,
    /// Optional allowed-hours window, `"HH:MM-HH:MM"` UTC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_restrictions: Option<String>,
    /// Optional purpose-code narrowing supplied by some portals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose_restrictions: Option<Vec<String>>,
}

impl GrantRequest {
    /// Checks the request's required fields.
    ///
    /// # Errors
    ///
    /// Returns a [`GrantError`] naming the first violated constraint.
    pub fn validate(&self) -> Result<(), GrantError> {
        if self.patient_id.is_empty() {
            return Err(GrantError::EmptyField {
                field: "patient_id",
            });
        }
        if self.requester_id.is_empty() {
            return Err(GrantError::EmptyField {
                field: "requester_id",
            });
        }
        if self.purpose_code.is_empty() {
            return Err(GrantError::EmptyField {
                field: "purpose_code",
            });
        }
        if self.data_types.is_empty() || self.data_types.iter().any(String::is_empty) {
            return Err(GrantError::EmptyScopes);
        }
        Ok(())
    }
}

/// Parses a duration string into whole seconds.
///
/// Accepts a bare second count or a count with an `s`/`m`/`h`/`d` suffix.
/// Zero and malformed values are rejected.
///
/// # Errors
///
/// Returns [`GrantError::MalformedDuration`] on any parse failure.
pub fn parse_duration_secs(s: &str) -> Result<u64, GrantError> {
    let malformed = || GrantError::MalformedDuration {
        value: s.to_string(),
    };
    let trimmed = s.trim();
    let (digits, multiplier) = match trimmed.as_bytes().last().copied() {
        Some(b's') => (&trimmed[..trimmed.len() - 1], 1),
        Some(b'm') => (&trimmed[..trimmed.len() - 1], 60),
        Some(b'h') => (&trimmed[..trimmed.len() - 1], 3_600),
        Some(b'd') => (&trimmed[..trimmed.len() - 1], 86_400),
        Some(_) => (trimmed, 1),
        None => return Err(malformed()),
    };
    let count: u64 = digits.parse().map_err(|_| malformed())?;
    let secs = count.checked_mul(multiplier).ok_or_else(malformed)?;
    if secs == 0 {
        return Err(malformed());
    }
    Ok(secs)
}

/// The grant resource returned to collaborators querying status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GrantResource {
    /// Contract identifier.
    pub contract_id: String,
    /// The patient whose data is covered.
    pub patient_id: String,
    /// The requesting organization.
    pub requester_id: String,
    /// Covered data-type tags.
    pub data_types: Vec<String>,
    /// Free-text purpose statement.
    pub purpose: String,
    /// Lifecycle status.
    pub status: GrantStatus,
    /// Creation instant, RFC 3339 UTC.
    pub created_at: String,
    /// Expiry instant, RFC 3339 UTC.
    pub expires_at: String,
    /// Approval instant, if approved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<String>,
    /// Revocation instant, if revoked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<String>,
    /// Revocation reason, if revoked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<String>,
}

impl From<&AccessGrant> for GrantResource {
    fn from(grant: &AccessGrant) -> Self {
        Self {
            contract_id: grant.id.to_string(),
            patient_id: grant.patient_id.clone(),
            requester_id: grant.requester_id.clone(),
            data_types: grant.scopes.iter().cloned().collect(),
            purpose: grant.purpose.clone(),
            status: grant.status,
            created_at: format_rfc3339(grant.created_at),
            expires_at: format_rfc3339(grant.expires_at),
            approved_at: grant.approved_at.map(format_rfc3339),
            revoked_at: grant.revoked_at.map(format_rfc3339),
            revocation_reason: grant.revocation_reason.map(|r| r.as_str().to_string()),
        }
    }
}

/// The access-check result consumed by the data-serving layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AccessCheckResult {
    /// Whether access is permitted.
    pub allowed: bool,
    /// Denial reason, absent on allow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The grant that authorized the access, on allow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_id: Option<String>,
}

/// Renders a Unix-nano instant as RFC 3339 UTC with second precision.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn format_rfc3339(instant_ns: u64) -> String {
    DateTime::<Utc>::from_timestamp_nanos(instant_ns as i64)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::NANOS_PER_SEC;

    fn sample_request() -> GrantRequest {
        GrantRequest {
            patient_id: "patient-1".to_string(),
            requester_id: "clinic-9".to_string(),
            data_types: vec!["lab_results".to_string()],
            purpose: "continuity of care".to_string(),
            purpose_code: "treatment".to_string(),
            duration: Some("1h".to_string()),
            access_level: Some(AccessLevel::ReadFull),
            time_restrictions: None,
            purpose_restrictions: None,
        }
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let json = r#"{
            "patientId": "patient-1",
            "requesterId": "clinic-9",
            "dataTypes": ["lab_results", "diagnoses"],
            "purpose": "referral",
            "purposeCode": "treatment",
            "duration": "24h",
            "accessLevel": "read-full"
        }"#;
        let request: GrantRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.patient_id, "patient-1");
        assert_eq!(request.data_types.len(), 2);
        assert_eq!(request.access_level, Some(AccessLevel::ReadFull));
    }

    #[test]
    fn test_request_rejects_unknown_fields() {
        let json = r#"{
            "patientId": "p",
            "requesterId": "r",
            "dataTypes": ["lab_results"],
            "purpose": "x",
            "purposeCode": "treatment",
            "smartContractRules": {}
        }"#;
        assert!(serde_json::from_str::<GrantRequest>(json).is_err());
    }

    #[test]
    fn test_request_validation() {
        assert!(sample_request().validate().is_ok());

        let mut request = sample_request();
        request.data_types.clear();
        assert!(matches!(request.validate(), Err(GrantError::EmptyScopes)));

        let mut request = sample_request();
        request.patient_id.clear();
        assert!(matches!(
            request.validate(),
            Err(GrantError::EmptyField {
                field: "patient_id"
            })
        ));
    }

    #[test]
    fn test_parse_duration_forms() {
        assert_eq!(parse_duration_secs("3600").unwrap(), 3_600);
        assert_eq!(parse_duration_secs("3600s").unwrap(), 3_600);
        assert_eq!(parse_duration_secs("45m").unwrap(), 2_700);
        assert_eq!(parse_duration_secs("24h").unwrap(), 86_400);
        assert_eq!(parse_duration_secs("7d").unwrap(), 604_800);
    }

    #[test]
    fn test_parse_duration_rejects_bad_input() {
        for bad in ["", "0", "0s", "-5s", "1.5h", "soon", "10w"] {
            assert!(
                matches!(
                    parse_duration_secs(bad),
                    Err(GrantError::MalformedDuration { .. })
                ),
                "expected failure for {bad:?}"
            );
        }
    }

    #[test]
    fn test_rfc3339_rendering() {
        // 2026-01-01T00:00:00Z
        let ns = 1_767_225_600u64 * NANOS_PER_SEC;
        assert_eq!(format_rfc3339(ns), "2026-01-01T00:00:00Z");
    }

    #[test]
    fn test_resource_from_grant() {
        use std::collections::BTreeSet;

        use super::super::state::{GrantId, RevocationReason};

        let grant = AccessGrant {
            id: GrantId::from("grant-7"),
            patient_id: "patient-1".to_string(),
            requester_id: "clinic-9".to_string(),
            scopes: BTreeSet::from(["lab_results".to_string()]),
            purpose: "referral".to_string(),
            purpose_code: "treatment".to_string(),
            access_level: AccessLevel::ReadSummary,
            time_restrictions: None,
            status: GrantStatus::Revoked,
            created_at: 1_767_225_600 * NANOS_PER_SEC,
            expires_at: 1_767_229_200 * NANOS_PER_SEC,
            approved_at: Some(1_767_225_660 * NANOS_PER_SEC),
            revoked_at: Some(1_767_226_000 * NANOS_PER_SEC),
            revocation_reason: Some(RevocationReason::BreachReport),
            version: 4,
        };

        let resource = GrantResource::from(&grant);
        assert_eq!(resource.contract_id, "grant-7");
        assert_eq!(resource.status, GrantStatus::Revoked);
        assert_eq!(resource.revocation_reason.as_deref(), Some("BreachReport"));
        assert_eq!(resource.created_at, "2026-01-01T00:00:00Z");

        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["contractId"], "grant-7");
        assert_eq!(json["status"], "revoked");
    }
}
