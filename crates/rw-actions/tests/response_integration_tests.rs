//! Full-pipeline tests: registry, executor, and store wired together.
//!
//! These tests verify that a detected incident flows through playbook
//! selection into concrete side effects in the shared store, that the
//! whole response is idempotent, and that the incident lands in the
//! expected lifecycle state.

use rw_core::analytics::ResponseAnalytics;
use rw_core::executor::ResponseExecutor;
use rw_core::incident::{Incident, IncidentSeverity, IncidentStatus, IncidentType};
use rw_core::notify::testing::CapturingNotifier;
use rw_core::notify::AlertPriority;
use rw_core::store::{IncidentStore, KvStore, MemoryIncidentStore, MemoryStore};
use rw_actions::ActionRegistry;
use std::sync::Arc;

struct Harness {
    store: Arc<dyn KvStore>,
    incidents: Arc<MemoryIncidentStore>,
    notifier: Arc<CapturingNotifier>,
    analytics: Arc<ResponseAnalytics>,
    executor: ResponseExecutor,
}

fn harness() -> Harness {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let incidents = Arc::new(MemoryIncidentStore::new());
    let notifier = Arc::new(CapturingNotifier::new());
    let analytics = Arc::new(ResponseAnalytics::new());
    let registry = ActionRegistry::builtin(store.clone(), notifier.clone());
    let executor = ResponseExecutor::new(
        Arc::new(registry),
        incidents.clone(),
        analytics.clone(),
    );
    Harness {
        store,
        incidents,
        notifier,
        analytics,
        executor,
    }
}

fn fraud_incident() -> Incident {
    let mut incident = Incident::new(
        IncidentType::PaymentFraud,
        IncidentSeverity::High,
        "Elevated fraud risk for subject acct-42",
        "burst of scripted card attempts",
        "risk_scorer",
    );
    incident.add_asset("subject:acct-42");
    incident.add_asset("origin:203.0.113.9");
    incident
}

#[tokio::test]
async fn test_fraud_playbook_applies_controls() {
    let h = harness();
    let report = h.executor.respond(fraud_incident()).await.unwrap();

    assert_eq!(report.playbook_id, "fraud_response");
    assert_eq!(report.applied.len(), 4);
    assert!(report.failed.is_empty());
    assert!(report.abandoned.is_empty());
    assert_eq!(report.final_status, IncidentStatus::Mitigating);

    // Side effects in the shared store.
    assert!(h.store.get("hold:subject:acct-42").await.unwrap().is_some());
    assert!(h
        .store
        .get("stepup:subject:acct-42")
        .await
        .unwrap()
        .is_some());

    // Operators paged at the incident's severity, subject told twice
    // (hold notice plus the general security notice).
    let alerts = h.notifier.alerts.lock().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].priority, AlertPriority::High);
    let notices = h.notifier.notices.lock().await;
    assert_eq!(notices.len(), 2);
    assert!(notices.iter().all(|n| n.subject_id == "acct-42"));
}

#[tokio::test]
async fn test_critical_playbook_blocks_origin() {
    let h = harness();
    let incident = Incident::new(
        IncidentType::AccountTakeover,
        IncidentSeverity::Critical,
        "credential stuffing",
        "d",
        "detector",
    );
    let mut incident = incident;
    incident.add_asset("subject:acct-7");
    incident.add_asset("origin:198.51.100.3");

    let report = h.executor.respond(incident.clone()).await.unwrap();

    assert_eq!(report.playbook_id, "critical_threat");
    assert_eq!(report.applied.len(), 5);
    assert!(h
        .store
        .get("deny:origin:198.51.100.3")
        .await
        .unwrap()
        .is_some());
    let snapshot_key = format!("snapshot:{}", incident.id);
    assert!(h.store.get(&snapshot_key).await.unwrap().is_some());
    let escalation_key = format!("escalation:{}", incident.id);
    assert!(h.store.get(&escalation_key).await.unwrap().is_some());
}

#[tokio::test]
async fn test_replayed_response_leaves_state_unchanged() {
    let h = harness();
    let first = fraud_incident();
    h.executor.respond(first.clone()).await.unwrap();
    let hold_before = h.store.get("hold:subject:acct-42").await.unwrap();

    // A second incident for the same subject replays the same playbook.
    let report = h.executor.respond(fraud_incident()).await.unwrap();

    assert_eq!(report.applied.len(), 4);
    assert_eq!(h.store.get("hold:subject:acct-42").await.unwrap(), hold_before);
    // The hold notice is not resent; only the general notice goes out again.
    let notices = h.notifier.notices.lock().await;
    assert_eq!(notices.len(), 3);
}

#[tokio::test]
async fn test_incident_persisted_through_lifecycle() {
    let h = harness();
    let incident = fraud_incident();
    let id = incident.id.clone();
    h.executor.respond(incident).await.unwrap();

    let stored = h.incidents.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, IncidentStatus::Mitigating);
    assert!(stored.response_time.is_some());
    assert_eq!(stored.automated_actions.len(), 4);
    assert!(!stored.manual_actions.is_empty());

    let active = h.incidents.list_active().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, id);
}

#[tokio::test]
async fn test_api_abuse_playbook_on_low_severity() {
    let h = harness();
    let mut incident = Incident::new(
        IncidentType::ApiAbuse,
        IncidentSeverity::Low,
        "scrape burst",
        "d",
        "edge",
    );
    incident.add_asset("origin:203.0.113.200");

    let report = h.executor.respond(incident).await.unwrap();

    assert_eq!(report.playbook_id, "api_abuse");
    assert!(h
        .store
        .get("quota:origin:203.0.113.200")
        .await
        .unwrap()
        .is_some());
    assert!(h
        .store
        .get("deny:origin:203.0.113.200")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_analytics_reflect_full_run() {
    let h = harness();
    h.executor.respond(fraud_incident()).await.unwrap();

    let stats = h.analytics.stats().await;
    assert_eq!(stats.incidents_created, 1);
    assert!((stats.automation_success_rate - 1.0).abs() < 1e-9);
    assert!((stats.sla_compliance_rate - 1.0).abs() < 1e-9);
    assert!(stats.avg_response_time >= 0.0);
}
