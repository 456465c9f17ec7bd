//! Network origin blocking action.
//!
//! Places the incident's origin on the deny list enforced at the edge.

use crate::registry::{origin_target, ActionError, ActionOutcome, ResponseAction};
use async_trait::async_trait;
use rw_core::incident::Incident;
use rw_core::playbook::ActionKind;
use rw_core::store::{encode, KvStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

const BLOCK_TTL: Duration = Duration::from_secs(24 * 3600);

/// Action to block the offending network origin.
pub struct BlockActorAction {
    store: Arc<dyn KvStore>,
}

impl BlockActorAction {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResponseAction for BlockActorAction {
    fn kind(&self) -> ActionKind {
        ActionKind::BlockActor
    }

    fn description(&self) -> &'static str {
        "Places the incident's network origin on the 24h deny list"
    }

    #[instrument(skip(self, incident), fields(incident_id = %incident.id))]
    async fn execute(&self, incident: &Incident) -> Result<ActionOutcome, ActionError> {
        let origin = origin_target(incident).ok_or(ActionError::MissingTarget("origin"))?;

        let record = encode(&serde_json::json!({
            "incident_id": incident.id,
            "reason": incident.incident_type.as_str(),
        }))?;
        let key = format!("deny:origin:{}", origin);
        if self.store.set_nx(&key, &record, BLOCK_TTL).await? {
            info!(origin, "origin added to deny list");
            Ok(ActionOutcome::Applied)
        } else {
            info!(origin, "origin already on deny list");
            Ok(ActionOutcome::AlreadyInEffect)
        }
    }
}
