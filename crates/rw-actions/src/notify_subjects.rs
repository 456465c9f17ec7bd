//! Subject notification action.
//!
//! Tells every affected account holder that suspicious activity was
//! detected on their account.

use crate::registry::{subject_targets, ActionError, ActionOutcome, ResponseAction};
use async_trait::async_trait;
use rw_core::incident::Incident;
use rw_core::notify::NotificationChannel;
use rw_core::playbook::ActionKind;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Action to notify affected account holders.
pub struct NotifySubjectsAction {
    notifier: Arc<dyn NotificationChannel>,
}

impl NotifySubjectsAction {
    pub fn new(notifier: Arc<dyn NotificationChannel>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl ResponseAction for NotifySubjectsAction {
    fn kind(&self) -> ActionKind {
        ActionKind::NotifySubjects
    }

    fn description(&self) -> &'static str {
        "Sends a security notice to every affected account holder"
    }

    #[instrument(skip(self, incident), fields(incident_id = %incident.id))]
    async fn execute(&self, incident: &Incident) -> Result<ActionOutcome, ActionError> {
        let subjects = subject_targets(incident);
        if subjects.is_empty() {
            return Err(ActionError::MissingTarget("subject"));
        }

        let mut delivered = 0usize;
        let mut last_err = None;
        for subject in &subjects {
            match self
                .notifier
                .send_security_notification(
                    subject,
                    "suspicious_activity",
                    "We detected unusual activity on your account and are reviewing it.",
                )
                .await
            {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(subject, error = %e, "subject notice not delivered");
                    last_err = Some(e);
                }
            }
        }
        info!(delivered, total = subjects.len(), "subject notices sent");

        // Partial delivery still counts; only a total failure does not.
        match (delivered, last_err) {
            (0, Some(e)) => Err(e.into()),
            _ => Ok(ActionOutcome::Applied),
        }
    }
}
