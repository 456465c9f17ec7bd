//! Operator alerting action.
//!
//! Pushes a structured alert to the operator channel with priority
//! derived from the incident severity.

use crate::registry::{ActionError, ActionOutcome, ResponseAction};
use async_trait::async_trait;
use rw_core::incident::{Incident, IncidentSeverity};
use rw_core::notify::{AlertPriority, NotificationChannel};
use rw_core::playbook::ActionKind;
use std::sync::Arc;
use tracing::{info, instrument};

/// Action to alert the operator channel.
pub struct AlertOperatorsAction {
    notifier: Arc<dyn NotificationChannel>,
}

impl AlertOperatorsAction {
    pub fn new(notifier: Arc<dyn NotificationChannel>) -> Self {
        Self { notifier }
    }

    fn priority_for(severity: IncidentSeverity) -> AlertPriority {
        match severity {
            IncidentSeverity::Low => AlertPriority::Low,
            IncidentSeverity::Medium => AlertPriority::Medium,
            IncidentSeverity::High => AlertPriority::High,
            IncidentSeverity::Critical => AlertPriority::Critical,
        }
    }
}

#[async_trait]
impl ResponseAction for AlertOperatorsAction {
    fn kind(&self) -> ActionKind {
        ActionKind::AlertOperators
    }

    fn description(&self) -> &'static str {
        "Sends a structured incident alert to the operator channel"
    }

    #[instrument(skip(self, incident), fields(incident_id = %incident.id))]
    async fn execute(&self, incident: &Incident) -> Result<ActionOutcome, ActionError> {
        let data = serde_json::json!({
            "incident_id": incident.id,
            "incident_type": incident.incident_type.as_str(),
            "severity": incident.severity.as_str(),
            "title": incident.title,
            "affected_assets": incident.affected_assets,
            "detected_at": incident.detected_at,
        });
        self.notifier
            .send_admin_alert(
                "incident_response",
                data,
                Self::priority_for(incident.severity),
            )
            .await?;
        info!(severity = incident.severity.as_str(), "operators alerted");
        Ok(ActionOutcome::Applied)
    }
}
