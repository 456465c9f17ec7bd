//! System isolation action.
//!
//! Fences off the platform segment named by the incident so traffic is
//! drained away from it while the response runs.

use crate::registry::{subject_target, ActionError, ActionOutcome, ResponseAction};
use async_trait::async_trait;
use rw_core::incident::Incident;
use rw_core::playbook::ActionKind;
use rw_core::store::{encode, KvStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

const ISOLATION_TTL: Duration = Duration::from_secs(24 * 3600);

/// Action to isolate the affected platform segment.
pub struct IsolateSystemAction {
    store: Arc<dyn KvStore>,
}

impl IsolateSystemAction {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResponseAction for IsolateSystemAction {
    fn kind(&self) -> ActionKind {
        ActionKind::IsolateSystem
    }

    fn description(&self) -> &'static str {
        "Fences off the affected platform segment until an operator releases it"
    }

    #[instrument(skip(self, incident), fields(incident_id = %incident.id))]
    async fn execute(&self, incident: &Incident) -> Result<ActionOutcome, ActionError> {
        // Subject-scoped incidents isolate that subject's segment;
        // otherwise the source system itself is fenced.
        let segment = subject_target(incident).unwrap_or(incident.source.as_str());

        let record = encode(&serde_json::json!({
            "incident_id": incident.id,
            "reason": incident.incident_type.as_str(),
        }))?;
        let key = format!("isolated:segment:{}", segment);
        if self.store.set_nx(&key, &record, ISOLATION_TTL).await? {
            info!(segment, "segment isolated");
            Ok(ActionOutcome::Applied)
        } else {
            Ok(ActionOutcome::AlreadyInEffect)
        }
    }
}
