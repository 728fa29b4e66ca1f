//! End-to-end lifecycle tests: submit, gate checks, expiry sweep, and
//! revocation, driven over real `SQLite` stores.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use consent_core::audit::{AuditEventKind, AuditFilter, AuditLog, SqliteAuditLog};
use consent_core::engine::{ConsentEngine, InMemoryPolicyProvider};
use consent_core::gate::{AccessDecision, AccessGate, DenialReason};
use consent_core::grant::{AccessLevel, GrantId, GrantRequest, GrantStatus};
use consent_core::policy::PolicyRule;
use consent_core::revocation::{RevocationSignal, RevocationTrigger};
use consent_core::store::{ContractStore, SqliteContractStore};
use consent_core::sweep::ExpirySweeper;
use consent_core::time::{NANOS_PER_SEC, current_timestamp_ns};
use consent_daemon::intake::RevocationIntake;
use consent_daemon::worker::{SweepWorker, SweepWorkerConfig};

const NOW: u64 = 1_700_000_000 * NANOS_PER_SEC;

struct Harness {
    engine: ConsentEngine,
    gate: AccessGate,
    sweeper: ExpirySweeper,
    trigger: RevocationTrigger,
    store: Arc<SqliteContractStore>,
    audit: Arc<SqliteAuditLog>,
}

fn harness() -> Harness {
    let store = Arc::new(SqliteContractStore::in_memory().unwrap());
    let audit = Arc::new(SqliteAuditLog::in_memory().unwrap());
    let policies = Arc::new(InMemoryPolicyProvider::new(vec![PolicyRule {
        id: "rule-treatment".to_string(),
        allowed_purpose_codes: BTreeSet::from(["treatment".to_string()]),
        max_duration_secs: 7 * 86_400,
        max_access_level: AccessLevel::ReadFull,
        requires_manual_approval: false,
    }]));

    Harness {
        engine: ConsentEngine::new(
            Arc::clone(&store) as _,
            Arc::clone(&audit) as _,
            policies,
        ),
        gate: AccessGate::new(Arc::clone(&store) as _, Arc::clone(&audit) as _),
        sweeper: ExpirySweeper::new(Arc::clone(&store) as _, Arc::clone(&audit) as _),
        trigger: RevocationTrigger::new(Arc::clone(&store) as _, Arc::clone(&audit) as _),
        store,
        audit,
    }
}

fn lab_request() -> GrantRequest {
    GrantRequest {
        patient_id: "patient-1".to_string(),
        requester_id: "clinic-9".to_string(),
        data_types: vec!["lab_results".to_string()],
        purpose: "continuity of care".to_string(),
        purpose_code: "treatment".to_string(),
        duration: Some("3600s".to_string()),
        access_level: None,
        time_restrictions: None,
        purpose_restrictions: None,
    }
}

#[test]
fn grant_scopes_bound_what_the_gate_allows() {
    // An approved one-hour grant on lab results admits lab reads within the
    // hour and refuses other data types.
    let h = harness();
    let grant = h.engine.submit(&lab_request(), NOW).unwrap();
    assert_eq!(grant.status, GrantStatus::Approved);

    let in_window = NOW + 10 * NANOS_PER_SEC;
    let decision = h
        .gate
        .check_access("clinic-9", "patient-1", "lab_results", in_window);
    assert_eq!(
        decision,
        AccessDecision::Allowed {
            grant_id: grant.id.clone()
        }
    );

    let decision = h
        .gate
        .check_access("clinic-9", "patient-1", "diagnoses", in_window);
    assert_eq!(
        decision,
        AccessDecision::Denied {
            reason: DenialReason::ScopeMismatch
        }
    );
}

#[test]
fn lapsed_grant_denies_before_sweep_and_expires_exactly_once() {
    // Past expiry the gate denies immediately, however late the sweep is;
    // the sweep then transitions the grant exactly once.
    let h = harness();
    let grant = h.engine.submit(&lab_request(), NOW).unwrap();

    let late = NOW + 3_601 * NANOS_PER_SEC;
    let decision = h
        .gate
        .check_access("clinic-9", "patient-1", "lab_results", late);
    assert_eq!(
        decision,
        AccessDecision::Denied {
            reason: DenialReason::NoGrant
        }
    );

    let first = h.sweeper.sweep_at(late).unwrap();
    let second = h.sweeper.sweep_at(late + NANOS_PER_SEC).unwrap();
    assert_eq!(first.expired, 1);
    assert_eq!(second.expired + second.skipped, 0);

    assert_eq!(h.store.get(&grant.id).unwrap().status, GrantStatus::Expired);
    let expiries = h
        .audit
        .export(
            &AuditFilter {
                kind: Some(AuditEventKind::Expired),
                ..AuditFilter::default()
            },
            0,
            100,
        )
        .unwrap();
    assert_eq!(expiries.len(), 1);
}

#[test]
fn breach_report_revokes_and_gate_never_allows_after_commit() {
    let h = harness();
    let grant = h.engine.submit(&lab_request(), NOW).unwrap();

    let revoked = h
        .trigger
        .handle_signal(
            &RevocationSignal::BreachReport {
                requester_id: "clinic-9".to_string(),
            },
            NOW + 60 * NANOS_PER_SEC,
        )
        .unwrap();
    assert_eq!(revoked, 1);

    let record = h.store.get(&grant.id).unwrap();
    assert_eq!(record.status, GrantStatus::Revoked);
    assert_eq!(
        record.revocation_reason.map(|r| r.as_str()),
        Some("BreachReport")
    );

    // Every check after the commit reads the terminal state.
    let decision = h.gate.check_access(
        "clinic-9",
        "patient-1",
        "lab_results",
        NOW + 61 * NANOS_PER_SEC,
    );
    assert_eq!(
        decision,
        AccessDecision::Denied {
            reason: DenialReason::NoGrant
        }
    );

    // A duplicate report is an idempotent no-op with no second event.
    let again = h
        .trigger
        .handle_signal(
            &RevocationSignal::BreachReport {
                requester_id: "clinic-9".to_string(),
            },
            NOW + 120 * NANOS_PER_SEC,
        )
        .unwrap();
    assert_eq!(again, 0);
    let revocations = h
        .audit
        .export(
            &AuditFilter {
                kind: Some(AuditEventKind::Revoked),
                ..AuditFilter::default()
            },
            0,
            100,
        )
        .unwrap();
    assert_eq!(revocations.len(), 1);
}

#[test]
fn unmatched_purpose_is_rejected_and_stays_rejected() {
    let h = harness();
    let mut request = lab_request();
    request.purpose_code = "marketing".to_string();

    let grant = h.engine.submit(&request, NOW).unwrap();
    assert_eq!(grant.status, GrantStatus::Rejected);

    // No expiry-based transition ever fires for it.
    let outcome = h.sweeper.sweep_at(NOW + 30 * 86_400 * NANOS_PER_SEC).unwrap();
    assert_eq!(outcome.expired + outcome.skipped, 0);
    assert_eq!(h.store.get(&grant.id).unwrap().status, GrantStatus::Rejected);
}

#[test]
fn every_transition_and_decision_is_audited_and_chain_verifies() {
    let h = harness();
    let grant = h.engine.submit(&lab_request(), NOW).unwrap();
    h.gate
        .check_access("clinic-9", "patient-1", "lab_results", NOW + NANOS_PER_SEC);
    h.gate
        .check_access("clinic-9", "patient-1", "diagnoses", NOW + NANOS_PER_SEC);
    h.trigger
        .handle_signal(
            &RevocationSignal::PatientWithdrawal {
                contract_id: grant.id.clone(),
            },
            NOW + 2 * NANOS_PER_SEC,
        )
        .unwrap();

    let events = h.audit.read_from(0, 100).unwrap();
    let kinds: Vec<AuditEventKind> = events.iter().map(|e| e.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![
            AuditEventKind::Created,
            AuditEventKind::Approved,
            AuditEventKind::Accessed,
            AuditEventKind::AccessDenied,
            AuditEventKind::Revoked,
        ]
    );

    // Transition events carry matching previous/new status pairs.
    for event in &events {
        match event.kind {
            AuditEventKind::Approved => {
                assert_eq!(event.previous_status, Some(GrantStatus::Pending));
                assert_eq!(event.new_status, Some(GrantStatus::Approved));
            }
            AuditEventKind::Revoked => {
                assert_eq!(event.previous_status, Some(GrantStatus::Approved));
                assert_eq!(event.new_status, Some(GrantStatus::Revoked));
            }
            _ => {}
        }
    }

    h.audit.verify_chain().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn sweep_worker_expires_lapsed_grants() {
    let h = harness();

    // A grant whose window lapsed before the worker starts.
    let now = current_timestamp_ns();
    let mut request = lab_request();
    request.duration = Some("60s".to_string());
    let grant = h
        .engine
        .submit(&request, now - 120 * NANOS_PER_SEC)
        .unwrap();

    let sweeper = Arc::new(ExpirySweeper::new(
        Arc::clone(&h.store) as _,
        Arc::clone(&h.audit) as _,
    ));
    let worker = SweepWorker::new(
        sweeper,
        SweepWorkerConfig::default().with_interval(Duration::from_millis(20)),
    );
    let shutdown = worker.shutdown_handle();
    let task = tokio::spawn(worker.run());

    // Wait for a tick to land.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if h.store.get(&grant.id).unwrap().status == GrantStatus::Expired {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "sweep worker never expired the grant"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    shutdown.store(true, std::sync::atomic::Ordering::Relaxed);
    task.await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn revocation_intake_drains_queued_signals() {
    let h = harness();
    let now = current_timestamp_ns();
    let grant = h.engine.submit(&lab_request(), now).unwrap();

    let trigger = Arc::new(RevocationTrigger::new(
        Arc::clone(&h.store) as _,
        Arc::clone(&h.audit) as _,
    ));
    let (tx, intake) = RevocationIntake::channel(trigger, 8);
    let task = tokio::spawn(intake.run());

    tx.send(RevocationSignal::SuspiciousActivity {
        patient_id: "patient-1".to_string(),
        requester_id: "clinic-9".to_string(),
    })
    .await
    .unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if h.store.get(&grant.id).unwrap().status == GrantStatus::Revoked {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "intake never processed the signal"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Dropping the sender stops the intake.
    drop(tx);
    task.await.unwrap();

    let record = h.store.get(&grant.id).unwrap();
    assert_eq!(
        record.revocation_reason.map(|r| r.as_str()),
        Some("SuspiciousActivity")
    );
}
