//! Step-up authentication action.
//!
//! Flags the subject account so its next sessions require strong
//! authentication before sensitive operations.

use crate::registry::{subject_target, ActionError, ActionOutcome, ResponseAction};
use async_trait::async_trait;
use rw_core::incident::Incident;
use rw_core::playbook::ActionKind;
use rw_core::store::{encode, KvStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

const STEP_UP_TTL: Duration = Duration::from_secs(24 * 3600);

/// Action to require strong authentication for 24h.
pub struct RequireStrongAuthAction {
    store: Arc<dyn KvStore>,
}

impl RequireStrongAuthAction {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResponseAction for RequireStrongAuthAction {
    fn kind(&self) -> ActionKind {
        ActionKind::RequireStrongAuth
    }

    fn description(&self) -> &'static str {
        "Requires strong authentication on the subject account for 24h"
    }

    #[instrument(skip(self, incident), fields(incident_id = %incident.id))]
    async fn execute(&self, incident: &Incident) -> Result<ActionOutcome, ActionError> {
        let subject = subject_target(incident).ok_or(ActionError::MissingTarget("subject"))?;

        let record = encode(&serde_json::json!({ "incident_id": incident.id }))?;
        let key = format!("stepup:subject:{}", subject);
        if self.store.set_nx(&key, &record, STEP_UP_TTL).await? {
            info!(subject, "step-up authentication required");
            Ok(ActionOutcome::Applied)
        } else {
            Ok(ActionOutcome::AlreadyInEffect)
        }
    }
}
