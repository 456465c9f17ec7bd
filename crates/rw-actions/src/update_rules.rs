//! Detection rule refresh action.
//!
//! Publishes the incident's indicators for the detection layer to fold
//! into its rule set on the next refresh cycle.

use crate::registry::{ActionError, ActionOutcome, ResponseAction};
use async_trait::async_trait;
use rw_core::incident::Incident;
use rw_core::playbook::ActionKind;
use rw_core::store::{encode, KvStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

const PENDING_RULES_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Action to stage rule updates from incident indicators.
pub struct UpdateRulesAction {
    store: Arc<dyn KvStore>,
}

impl UpdateRulesAction {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResponseAction for UpdateRulesAction {
    fn kind(&self) -> ActionKind {
        ActionKind::UpdateRules
    }

    fn description(&self) -> &'static str {
        "Stages the incident's indicators for the next detection rule refresh"
    }

    #[instrument(skip(self, incident), fields(incident_id = %incident.id))]
    async fn execute(&self, incident: &Incident) -> Result<ActionOutcome, ActionError> {
        let staged = encode(&serde_json::json!({
            "incident_id": incident.id,
            "incident_type": incident.incident_type.as_str(),
            "indicators": incident.indicators,
            "affected_assets": incident.affected_assets,
        }))?;
        let key = format!("rules:pending:{}", incident.id);
        if self.store.set_nx(&key, &staged, PENDING_RULES_TTL).await? {
            info!(
                indicator_count = incident.indicators.len(),
                "rule update staged"
            );
            Ok(ActionOutcome::Applied)
        } else {
            Ok(ActionOutcome::AlreadyInEffect)
        }
    }
}
