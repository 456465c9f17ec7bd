//! Evidence snapshot action.
//!
//! Freezes the incident's state as an immutable record for later
//! investigation. The first snapshot wins; replays never overwrite it.

use crate::registry::{ActionError, ActionOutcome, ResponseAction};
use async_trait::async_trait;
use rw_core::incident::Incident;
use rw_core::playbook::ActionKind;
use rw_core::store::{encode, KvStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

const SNAPSHOT_TTL: Duration = Duration::from_secs(30 * 24 * 3600);

/// Action to capture a forensic snapshot of the incident.
pub struct SnapshotDataAction {
    store: Arc<dyn KvStore>,
}

impl SnapshotDataAction {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResponseAction for SnapshotDataAction {
    fn kind(&self) -> ActionKind {
        ActionKind::SnapshotData
    }

    fn description(&self) -> &'static str {
        "Captures an immutable snapshot of the incident for investigation"
    }

    #[instrument(skip(self, incident), fields(incident_id = %incident.id))]
    async fn execute(&self, incident: &Incident) -> Result<ActionOutcome, ActionError> {
        let snapshot = encode(&serde_json::json!({
            "captured_at": chrono::Utc::now(),
            "incident": incident,
        }))?;
        let key = format!("snapshot:{}", incident.id);
        if self.store.set_nx(&key, &snapshot, SNAPSHOT_TTL).await? {
            info!("incident snapshot captured");
            Ok(ActionOutcome::Applied)
        } else {
            Ok(ActionOutcome::AlreadyInEffect)
        }
    }
}
