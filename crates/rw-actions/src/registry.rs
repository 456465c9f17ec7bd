//! Action registry for Risk Warden.
//!
//! This module provides the response action trait and the registry that
//! maps playbook action kinds to handler implementations. The registry
//! also implements the executor's dispatch seam, so wiring the system
//! together is a single constructor call.

use async_trait::async_trait;
use rw_core::executor::ActionDispatcher;
use rw_core::incident::Incident;
use rw_core::notify::{NotificationChannel, NotifyError};
use rw_core::playbook::ActionKind;
use rw_core::store::{KvStore, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Per-call timeout. Individual handlers are quick key writes and
/// notifications; anything slower than this is treated as stuck.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur during action execution.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Action not registered: {0}")]
    NotRegistered(String),

    #[error("Incident has no {0} asset to act on")]
    MissingTarget(&'static str),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Action did not complete within {0:?}")]
    Timeout(Duration),
}

/// Result of a successful action execution.
///
/// `AlreadyInEffect` means a previous response already applied the same
/// control; replaying the action is a success, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    AlreadyInEffect,
}

impl ActionOutcome {
    pub fn applied_now(&self) -> bool {
        matches!(self, ActionOutcome::Applied)
    }
}

/// A single automated response action.
///
/// Implementations must be idempotent: executing twice against the same
/// incident leaves the same state as executing once.
#[async_trait]
pub trait ResponseAction: Send + Sync {
    /// The playbook action kind this handler serves.
    fn kind(&self) -> ActionKind;

    /// Human-readable description of what the action does.
    fn description(&self) -> &'static str;

    /// Executes the action against an incident.
    async fn execute(&self, incident: &Incident) -> Result<ActionOutcome, ActionError>;
}

/// Registry mapping action kinds to handlers.
pub struct ActionRegistry {
    actions: HashMap<ActionKind, Arc<dyn ResponseAction>>,
    call_timeout: Duration,
}

impl ActionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Creates a registry with all ten built-in handlers wired to the
    /// given store and notification channel.
    pub fn builtin(store: Arc<dyn KvStore>, notifier: Arc<dyn NotificationChannel>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::BlockActorAction::new(store.clone())));
        registry.register(Arc::new(crate::SuspendAccountAction::new(
            store.clone(),
            notifier.clone(),
        )));
        registry.register(Arc::new(crate::RequireStrongAuthAction::new(store.clone())));
        registry.register(Arc::new(crate::RateLimitAction::new(store.clone())));
        registry.register(Arc::new(crate::AlertOperatorsAction::new(notifier.clone())));
        registry.register(Arc::new(crate::EscalateAction::new(
            store.clone(),
            notifier.clone(),
        )));
        registry.register(Arc::new(crate::IsolateSystemAction::new(store.clone())));
        registry.register(Arc::new(crate::SnapshotDataAction::new(store.clone())));
        registry.register(Arc::new(crate::NotifySubjectsAction::new(notifier)));
        registry.register(Arc::new(crate::UpdateRulesAction::new(store)));
        registry
    }

    /// Registers a handler, replacing any existing one for the same kind.
    pub fn register(&mut self, action: Arc<dyn ResponseAction>) {
        self.actions.insert(action.kind(), action);
    }

    /// Overrides the per-call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn get(&self, kind: ActionKind) -> Option<&Arc<dyn ResponseAction>> {
        self.actions.get(&kind)
    }

    /// Runs one action under the per-call timeout and records its metrics.
    pub async fn run(
        &self,
        kind: ActionKind,
        incident: &Incident,
    ) -> Result<ActionOutcome, ActionError> {
        let action = self
            .actions
            .get(&kind)
            .ok_or_else(|| ActionError::NotRegistered(kind.as_str().to_string()))?;

        let started = std::time::Instant::now();
        let result = match tokio::time::timeout(self.call_timeout, action.execute(incident)).await
        {
            Ok(result) => result,
            Err(_) => Err(ActionError::Timeout(self.call_timeout)),
        };
        let elapsed = started.elapsed().as_secs_f64();
        rw_observability::record_action_execution(kind.as_str(), result.is_ok(), elapsed);

        match &result {
            Ok(outcome) => info!(
                action = kind.as_str(),
                incident_id = %incident.id,
                applied_now = outcome.applied_now(),
                "action completed"
            ),
            Err(e) => warn!(
                action = kind.as_str(),
                incident_id = %incident.id,
                error = %e,
                "action failed"
            ),
        }
        result
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionDispatcher for ActionRegistry {
    async fn dispatch(&self, kind: ActionKind, incident: Incident) -> bool {
        self.run(kind, &incident).await.is_ok()
    }
}

/// First affected asset carrying the given prefix, with the prefix
/// stripped. Incident assets are tagged `subject:<id>` or `origin:<id>`.
pub(crate) fn asset_with_prefix<'a>(incident: &'a Incident, prefix: &str) -> Option<&'a str> {
    incident
        .affected_assets
        .iter()
        .find_map(|asset| asset.strip_prefix(prefix))
}

pub(crate) fn subject_target(incident: &Incident) -> Option<&str> {
    asset_with_prefix(incident, "subject:")
}

pub(crate) fn origin_target(incident: &Incident) -> Option<&str> {
    asset_with_prefix(incident, "origin:")
}

/// All subject assets on the incident, prefix stripped.
pub(crate) fn subject_targets(incident: &Incident) -> Vec<&str> {
    incident
        .affected_assets
        .iter()
        .filter_map(|asset| asset.strip_prefix("subject:"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rw_core::incident::{IncidentSeverity, IncidentType};

    struct StubAction {
        kind: ActionKind,
        outcome: Result<ActionOutcome, &'static str>,
    }

    #[async_trait]
    impl ResponseAction for StubAction {
        fn kind(&self) -> ActionKind {
            self.kind
        }

        fn description(&self) -> &'static str {
            "stub"
        }

        async fn execute(&self, _incident: &Incident) -> Result<ActionOutcome, ActionError> {
            self.outcome
                .map_err(|e| ActionError::NotRegistered(e.to_string()))
        }
    }

    fn incident() -> Incident {
        let mut incident = Incident::new(
            IncidentType::PaymentFraud,
            IncidentSeverity::High,
            "t",
            "d",
            "test",
        );
        incident.add_asset("subject:acct-1");
        incident.add_asset("origin:198.51.100.7");
        incident
    }

    #[tokio::test]
    async fn test_unregistered_kind_errors() {
        let registry = ActionRegistry::new();
        let err = registry
            .run(ActionKind::BlockActor, &incident())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::NotRegistered(_)));
    }

    #[tokio::test]
    async fn test_dispatch_maps_outcome_to_bool() {
        let mut registry = ActionRegistry::new();
        registry.register(Arc::new(StubAction {
            kind: ActionKind::AlertOperators,
            outcome: Ok(ActionOutcome::AlreadyInEffect),
        }));
        assert!(
            registry
                .dispatch(ActionKind::AlertOperators, incident())
                .await
        );
        assert!(!registry.dispatch(ActionKind::BlockActor, incident()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_handler_times_out() {
        struct SlowAction;

        #[async_trait]
        impl ResponseAction for SlowAction {
            fn kind(&self) -> ActionKind {
                ActionKind::SnapshotData
            }

            fn description(&self) -> &'static str {
                "slow"
            }

            async fn execute(&self, _incident: &Incident) -> Result<ActionOutcome, ActionError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(ActionOutcome::Applied)
            }
        }

        let mut registry = ActionRegistry::new();
        registry.register(Arc::new(SlowAction));
        let err = registry
            .run(ActionKind::SnapshotData, &incident())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Timeout(_)));
    }

    #[test]
    fn test_asset_helpers() {
        let incident = incident();
        assert_eq!(subject_target(&incident), Some("acct-1"));
        assert_eq!(origin_target(&incident), Some("198.51.100.7"));
        assert_eq!(subject_targets(&incident), vec!["acct-1"]);
    }
}
