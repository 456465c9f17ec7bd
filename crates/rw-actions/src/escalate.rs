//! Human escalation action.
//!
//! Hands the incident to the on-call queue with a durable record and a
//! critical-priority page.

use crate::registry::{ActionError, ActionOutcome, ResponseAction};
use async_trait::async_trait;
use rw_core::incident::Incident;
use rw_core::notify::{AlertPriority, NotificationChannel};
use rw_core::playbook::ActionKind;
use rw_core::store::{encode, KvStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, instrument};

const ESCALATION_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Action to escalate the incident to on-call humans.
pub struct EscalateAction {
    store: Arc<dyn KvStore>,
    notifier: Arc<dyn NotificationChannel>,
}

impl EscalateAction {
    pub fn new(store: Arc<dyn KvStore>, notifier: Arc<dyn NotificationChannel>) -> Self {
        Self { store, notifier }
    }
}

#[async_trait]
impl ResponseAction for EscalateAction {
    fn kind(&self) -> ActionKind {
        ActionKind::Escalate
    }

    fn description(&self) -> &'static str {
        "Queues the incident for the on-call team and pages at critical priority"
    }

    #[instrument(skip(self, incident), fields(incident_id = %incident.id))]
    async fn execute(&self, incident: &Incident) -> Result<ActionOutcome, ActionError> {
        let record = encode(&serde_json::json!({
            "incident_id": incident.id,
            "incident_type": incident.incident_type.as_str(),
            "severity": incident.severity.as_str(),
            "indicators": incident.indicators,
            "escalated_at": chrono::Utc::now(),
        }))?;
        let key = format!("escalation:{}", incident.id);
        let queued = self.store.set_nx(&key, &record, ESCALATION_TTL).await?;

        // Audit trail for the handoff lives in the error stream so the
        // on-call page and the log line cannot drift apart.
        error!(
            incident_type = incident.incident_type.as_str(),
            severity = incident.severity.as_str(),
            "incident escalated to on-call"
        );
        self.notifier
            .send_admin_alert(
                "incident_escalation",
                serde_json::json!({
                    "incident_id": incident.id,
                    "severity": incident.severity.as_str(),
                }),
                AlertPriority::Critical,
            )
            .await?;

        Ok(if queued {
            ActionOutcome::Applied
        } else {
            ActionOutcome::AlreadyInEffect
        })
    }
}
