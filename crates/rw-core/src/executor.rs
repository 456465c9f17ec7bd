//! Response executor.
//!
//! Selects a playbook for an incident, fans out its automated actions as
//! concurrent tasks, joins them under a single aggregate deadline tuned to
//! the incident's severity SLA, and advances the incident's status state
//! machine. The aggregate timeout is the only cancellation trigger; tasks
//! still pending at the deadline are aborted and not counted as applied.

use crate::analytics::ResponseAnalytics;
use crate::incident::{Incident, IncidentError, IncidentSeverity, IncidentStatus};
use crate::playbook::{ActionKind, PlaybookRegistry};
use crate::store::IncidentStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

/// Fraction of the severity SLA granted to the automated phase.
///
/// The orchestrator keeps headroom below the SLA: 25s of a 30s critical
/// budget, 100s of 120s, and so on.
const BUDGET_NUMERATOR: u64 = 5;
const BUDGET_DENOMINATOR: u64 = 6;

/// Errors from response orchestration.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("incident lifecycle error: {0}")]
    Lifecycle(#[from] IncidentError),
}

/// Seam between the executor and the action handlers.
///
/// The handler registry implements this; the executor only sees a kind
/// and an incident snapshot, and a boolean applied/not-applied outcome.
/// Dispatch implementations must not panic and must bound their own
/// external calls; the aggregate deadline is the backstop.
#[async_trait]
pub trait ActionDispatcher: Send + Sync + 'static {
    async fn dispatch(&self, kind: ActionKind, incident: Incident) -> bool;
}

/// Summary of one response execution.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub incident_id: String,
    pub playbook_id: String,
    /// Actions that completed and reported success.
    pub applied: Vec<ActionKind>,
    /// Actions that completed and reported failure.
    pub failed: Vec<ActionKind>,
    /// Actions still pending at the deadline (or lost to a panic).
    pub abandoned: Vec<ActionKind>,
    /// Wall-clock seconds for the automated phase.
    pub elapsed_secs: f64,
    /// The severity SLA the response was measured against.
    pub sla_target_secs: u64,
    pub sla_met: bool,
    pub final_status: IncidentStatus,
}

/// Orchestrates automated responses. Constructed once at process start
/// with its collaborators injected, then shared by reference.
pub struct ResponseExecutor {
    registry: PlaybookRegistry,
    dispatcher: Arc<dyn ActionDispatcher>,
    incidents: Arc<dyn IncidentStore>,
    analytics: Arc<ResponseAnalytics>,
    budget_override: Option<Duration>,
}

impl ResponseExecutor {
    pub fn new(
        dispatcher: Arc<dyn ActionDispatcher>,
        incidents: Arc<dyn IncidentStore>,
        analytics: Arc<ResponseAnalytics>,
    ) -> Self {
        Self {
            registry: PlaybookRegistry::builtin(),
            dispatcher,
            incidents,
            analytics,
            budget_override: None,
        }
    }

    /// Replaces the built-in playbook registry.
    pub fn with_registry(mut self, registry: PlaybookRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Forces a fixed aggregate budget regardless of severity.
    pub fn with_budget_override(mut self, budget: Duration) -> Self {
        self.budget_override = Some(budget);
        self
    }

    /// Aggregate deadline for a severity, with headroom under its SLA.
    pub fn budget_for(&self, severity: IncidentSeverity) -> Duration {
        self.budget_override.unwrap_or_else(|| {
            Duration::from_secs(severity.sla_seconds() * BUDGET_NUMERATOR / BUDGET_DENOMINATOR)
        })
    }

    /// Runs the automated response for a newly detected incident.
    ///
    /// Stores the incident, executes the selected playbook under the
    /// aggregate deadline, records the response time exactly once, and
    /// persists the final state. Store failures degrade to an in-memory
    /// incident and are logged, never returned.
    #[instrument(skip(self, incident), fields(incident_id = %incident.id, severity = %incident.severity))]
    pub async fn respond(&self, mut incident: Incident) -> Result<ExecutionReport, ExecutorError> {
        self.analytics
            .record_incident(&incident.id, incident.detected_at)
            .await;
        rw_observability::record_incident_created(incident.severity.as_str());
        self.persist(&incident).await;
        if let Err(e) = self
            .incidents
            .index_by_time(&incident.id, incident.detected_at)
            .await
        {
            warn!(error = %e, "incident time index update failed");
        }

        let playbook = self.registry.select(&incident);
        let playbook_id = playbook.id.clone();
        let actions = playbook.automated_actions.clone();
        incident.manual_actions = playbook.manual_steps.clone();
        info!(playbook = %playbook_id, action_count = actions.len(), "executing response playbook");

        incident.transition(IncidentStatus::Containing)?;
        self.persist(&incident).await;

        let budget = self.budget_for(incident.severity);
        let started = tokio::time::Instant::now();
        let deadline = started + budget;

        let mut join_set = JoinSet::new();
        for kind in &actions {
            let dispatcher = Arc::clone(&self.dispatcher);
            let snapshot = incident.clone();
            let kind = *kind;
            join_set.spawn(async move { (kind, dispatcher.dispatch(kind, snapshot).await) });
        }

        let mut applied = Vec::new();
        let mut failed = Vec::new();
        let mut panicked = false;
        loop {
            match tokio::time::timeout_at(deadline, join_set.join_next()).await {
                Ok(Some(Ok((kind, true)))) => applied.push(kind),
                Ok(Some(Ok((kind, false)))) => failed.push(kind),
                Ok(Some(Err(join_err))) => {
                    error!(error = %join_err, "action task failed to join");
                    panicked = true;
                }
                Ok(None) => break,
                Err(_) => {
                    // Aggregate deadline reached; abandon whatever is left.
                    join_set.abort_all();
                    break;
                }
            }
        }

        let abandoned: Vec<ActionKind> = actions
            .iter()
            .filter(|k| !applied.contains(*k) && !failed.contains(*k))
            .copied()
            .collect();
        for kind in &abandoned {
            warn!(action = kind.as_str(), "action abandoned at deadline");
            rw_observability::record_action_abandoned(kind.as_str());
        }

        let elapsed_secs = started.elapsed().as_secs_f64();
        incident.record_response_time(elapsed_secs)?;
        incident.automated_actions = applied.iter().map(|k| k.as_str().to_string()).collect();

        let next = if panicked {
            IncidentStatus::Investigating
        } else {
            IncidentStatus::Mitigating
        };
        incident.transition(next)?;
        self.persist(&incident).await;

        let sla_target_secs = incident.severity.sla_seconds();
        let sla_met = elapsed_secs <= sla_target_secs as f64;
        if sla_met {
            info!(elapsed_secs, sla_target_secs, "response completed within SLA");
        } else {
            warn!(elapsed_secs, sla_target_secs, "response missed SLA");
        }

        self.analytics
            .record_response(elapsed_secs, actions.len(), applied.len(), sla_met)
            .await;
        rw_observability::record_response(elapsed_secs, sla_met);

        Ok(ExecutionReport {
            incident_id: incident.id.clone(),
            playbook_id,
            applied,
            failed,
            abandoned,
            elapsed_secs,
            sla_target_secs,
            sla_met,
            final_status: incident.status,
        })
    }

    async fn persist(&self, incident: &Incident) {
        if let Err(e) = self.incidents.put(incident).await {
            warn!(incident_id = %incident.id, error = %e, "incident store unavailable, keeping in-memory state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::IncidentType;
    use crate::store::MemoryIncidentStore;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    /// Dispatcher with scripted per-kind behavior.
    #[derive(Default)]
    struct ScriptedDispatcher {
        outcomes: HashMap<ActionKind, Outcome>,
        calls: Mutex<Vec<ActionKind>>,
    }

    #[derive(Clone, Copy)]
    enum Outcome {
        Succeed,
        Fail,
        Hang,
    }

    impl ScriptedDispatcher {
        fn with(mut self, kind: ActionKind, outcome: Outcome) -> Self {
            self.outcomes.insert(kind, outcome);
            self
        }
    }

    #[async_trait]
    impl ActionDispatcher for ScriptedDispatcher {
        async fn dispatch(&self, kind: ActionKind, _incident: Incident) -> bool {
            self.calls.lock().await.push(kind);
            match self.outcomes.get(&kind).copied().unwrap_or(Outcome::Succeed) {
                Outcome::Succeed => true,
                Outcome::Fail => false,
                Outcome::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    true
                }
            }
        }
    }

    fn executor(dispatcher: ScriptedDispatcher) -> ResponseExecutor {
        ResponseExecutor::new(
            Arc::new(dispatcher),
            Arc::new(MemoryIncidentStore::new()),
            Arc::new(ResponseAnalytics::new()),
        )
    }

    fn critical_incident() -> Incident {
        Incident::new(
            IncidentType::BruteForce,
            IncidentSeverity::Critical,
            "brute force",
            "d",
            "test",
        )
    }

    #[test]
    fn test_budget_headroom_under_sla() {
        let executor = executor(ScriptedDispatcher::default());
        assert_eq!(
            executor.budget_for(IncidentSeverity::Critical),
            Duration::from_secs(25)
        );
        assert_eq!(
            executor.budget_for(IncidentSeverity::High),
            Duration::from_secs(100)
        );
        assert_eq!(
            executor.budget_for(IncidentSeverity::Medium),
            Duration::from_secs(500)
        );
        assert_eq!(
            executor.budget_for(IncidentSeverity::Low),
            Duration::from_secs(3000)
        );
    }

    #[tokio::test]
    async fn test_all_actions_applied() {
        let executor = executor(ScriptedDispatcher::default());
        let report = executor.respond(critical_incident()).await.unwrap();

        assert_eq!(report.playbook_id, "critical_threat");
        assert_eq!(report.applied.len(), 5);
        assert!(report.failed.is_empty());
        assert!(report.abandoned.is_empty());
        assert_eq!(report.final_status, IncidentStatus::Mitigating);
        assert!(report.sla_met);
    }

    #[tokio::test]
    async fn test_failed_action_does_not_abort_siblings() {
        let dispatcher = ScriptedDispatcher::default()
            .with(ActionKind::SuspendAccount, Outcome::Fail);
        let executor = executor(dispatcher);
        let report = executor.respond(critical_incident()).await.unwrap();

        assert_eq!(report.applied.len(), 4);
        assert_eq!(report.failed, vec![ActionKind::SuspendAccount]);
        assert_eq!(report.final_status, IncidentStatus::Mitigating);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_law() {
        // One of five actions hangs for an hour; the executor must return
        // at the aggregate deadline with the rest applied and the incident
        // in mitigating.
        let dispatcher =
            ScriptedDispatcher::default().with(ActionKind::SnapshotData, Outcome::Hang);
        let executor = executor(dispatcher);

        let started = tokio::time::Instant::now();
        let report = executor.respond(critical_incident()).await.unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(25));
        assert!(elapsed < Duration::from_secs(30));
        assert_eq!(report.applied.len(), 4);
        assert_eq!(report.abandoned, vec![ActionKind::SnapshotData]);
        assert_eq!(report.final_status, IncidentStatus::Mitigating);
        assert!((report.elapsed_secs - 25.0).abs() < 1.0);
    }

    #[tokio::test]
    async fn test_applied_actions_recorded_on_incident() {
        let store = Arc::new(MemoryIncidentStore::new());
        let executor = ResponseExecutor::new(
            Arc::new(ScriptedDispatcher::default()),
            store.clone(),
            Arc::new(ResponseAnalytics::new()),
        );
        let incident = critical_incident();
        let id = incident.id.clone();
        executor.respond(incident).await.unwrap();

        let stored = store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, IncidentStatus::Mitigating);
        assert_eq!(stored.automated_actions.len(), 5);
        assert!(stored.response_time.is_some());
        assert!(!stored.manual_actions.is_empty());
    }

    #[tokio::test]
    async fn test_response_time_set_once_per_incident() {
        let executor = executor(ScriptedDispatcher::default());
        let incident = critical_incident();
        let report = executor.respond(incident.clone()).await.unwrap();
        assert!(report.elapsed_secs >= 0.0);

        // Responding again to the same in-flight incident object is a
        // lifecycle error, not a silent recompute.
        let mut replay = incident;
        replay.record_response_time(1.0).unwrap();
        assert!(replay.record_response_time(2.0).is_err());
    }

    #[tokio::test]
    async fn test_actions_run_concurrently() {
        // Five handlers each sleeping 50ms complete well inside 250ms
        // when fanned out.
        struct SleepyDispatcher(AtomicUsize);

        #[async_trait]
        impl ActionDispatcher for SleepyDispatcher {
            async fn dispatch(&self, _kind: ActionKind, _incident: Incident) -> bool {
                self.0.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                true
            }
        }

        let executor = ResponseExecutor::new(
            Arc::new(SleepyDispatcher(AtomicUsize::new(0))),
            Arc::new(MemoryIncidentStore::new()),
            Arc::new(ResponseAnalytics::new()),
        );
        let started = std::time::Instant::now();
        let report = executor.respond(critical_incident()).await.unwrap();
        assert_eq!(report.applied.len(), 5);
        assert!(started.elapsed() < Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_default_playbook_for_unmatched_incident() {
        let executor = executor(ScriptedDispatcher::default());
        let incident = Incident::new(
            IncidentType::SuspiciousActivity,
            IncidentSeverity::Low,
            "odd",
            "d",
            "test",
        );
        let report = executor.respond(incident).await.unwrap();
        assert_eq!(report.playbook_id, "default_response");
        assert_eq!(report.applied, vec![ActionKind::AlertOperators]);
    }

    #[tokio::test]
    async fn test_analytics_fed_by_execution() {
        let analytics = Arc::new(ResponseAnalytics::new());
        let executor = ResponseExecutor::new(
            Arc::new(ScriptedDispatcher::default().with(ActionKind::Escalate, Outcome::Fail)),
            Arc::new(MemoryIncidentStore::new()),
            analytics.clone(),
        );
        executor.respond(critical_incident()).await.unwrap();

        let stats = analytics.stats().await;
        assert_eq!(stats.incidents_created, 1);
        assert!((stats.automation_success_rate - 0.8).abs() < 1e-9);
        assert!((stats.sla_compliance_rate - 1.0).abs() < 1e-9);
    }
}
