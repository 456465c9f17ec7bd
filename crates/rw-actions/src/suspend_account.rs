//! Account suspension action.
//!
//! Places a temporary hold on the incident's subject account and tells
//! the account holder why.

use crate::registry::{subject_target, ActionError, ActionOutcome, ResponseAction};
use async_trait::async_trait;
use rw_core::incident::Incident;
use rw_core::notify::NotificationChannel;
use rw_core::playbook::ActionKind;
use rw_core::store::{encode, KvStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

const HOLD_TTL: Duration = Duration::from_secs(2 * 3600);

/// Action to place a 2h hold on the subject account.
pub struct SuspendAccountAction {
    store: Arc<dyn KvStore>,
    notifier: Arc<dyn NotificationChannel>,
}

impl SuspendAccountAction {
    pub fn new(store: Arc<dyn KvStore>, notifier: Arc<dyn NotificationChannel>) -> Self {
        Self { store, notifier }
    }
}

#[async_trait]
impl ResponseAction for SuspendAccountAction {
    fn kind(&self) -> ActionKind {
        ActionKind::SuspendAccount
    }

    fn description(&self) -> &'static str {
        "Places a temporary hold on the subject account and notifies the holder"
    }

    #[instrument(skip(self, incident), fields(incident_id = %incident.id))]
    async fn execute(&self, incident: &Incident) -> Result<ActionOutcome, ActionError> {
        let subject = subject_target(incident).ok_or(ActionError::MissingTarget("subject"))?;

        let record = encode(&serde_json::json!({
            "incident_id": incident.id,
            "reason": incident.incident_type.as_str(),
        }))?;
        let key = format!("hold:subject:{}", subject);
        let applied = self.store.set_nx(&key, &record, HOLD_TTL).await?;
        if !applied {
            info!(subject, "account already on hold");
            return Ok(ActionOutcome::AlreadyInEffect);
        }
        info!(subject, "account placed on hold");

        // The hold is the control; a lost notice must not undo it.
        if let Err(e) = self
            .notifier
            .send_security_notification(
                subject,
                "account_hold",
                "Your account has been temporarily held while we review recent activity.",
            )
            .await
        {
            warn!(subject, error = %e, "hold notice could not be delivered");
        }
        Ok(ActionOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rw_core::incident::{IncidentSeverity, IncidentType};
    use rw_core::notify::testing::CapturingNotifier;
    use rw_core::store::MemoryStore;

    fn incident() -> Incident {
        let mut incident = Incident::new(
            IncidentType::PaymentFraud,
            IncidentSeverity::High,
            "t",
            "d",
            "test",
        );
        incident.add_asset("subject:acct-9");
        incident
    }

    #[tokio::test]
    async fn test_hold_set_and_holder_notified() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let notifier = Arc::new(CapturingNotifier::new());
        let action = SuspendAccountAction::new(store.clone(), notifier.clone());

        assert_eq!(
            action.execute(&incident()).await.unwrap(),
            ActionOutcome::Applied
        );
        assert!(store.get("hold:subject:acct-9").await.unwrap().is_some());
        assert_eq!(notifier.notices.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_replay_does_not_renotify() {
        let notifier = Arc::new(CapturingNotifier::new());
        let action = SuspendAccountAction::new(Arc::new(MemoryStore::new()), notifier.clone());

        action.execute(&incident()).await.unwrap();
        assert_eq!(
            action.execute(&incident()).await.unwrap(),
            ActionOutcome::AlreadyInEffect
        );
        assert_eq!(notifier.notices.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_hold_survives_failed_notice() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let action =
            SuspendAccountAction::new(store.clone(), Arc::new(CapturingNotifier::failing()));

        assert_eq!(
            action.execute(&incident()).await.unwrap(),
            ActionOutcome::Applied
        );
        assert!(store.get("hold:subject:acct-9").await.unwrap().is_some());
    }
}
