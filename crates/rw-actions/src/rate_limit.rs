//! Origin throttling action.
//!
//! Installs a tightened request quota for the incident's origin.

use crate::registry::{origin_target, ActionError, ActionOutcome, ResponseAction};
use async_trait::async_trait;
use rw_core::incident::Incident;
use rw_core::playbook::ActionKind;
use rw_core::store::{encode, KvStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

const QUOTA_TTL: Duration = Duration::from_secs(3600);
/// Requests per minute while the throttle is active.
const THROTTLED_RPM: u32 = 10;

/// Action to throttle the offending origin for an hour.
pub struct RateLimitAction {
    store: Arc<dyn KvStore>,
}

impl RateLimitAction {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResponseAction for RateLimitAction {
    fn kind(&self) -> ActionKind {
        ActionKind::RateLimit
    }

    fn description(&self) -> &'static str {
        "Installs a tightened 1h request quota for the incident's origin"
    }

    #[instrument(skip(self, incident), fields(incident_id = %incident.id))]
    async fn execute(&self, incident: &Incident) -> Result<ActionOutcome, ActionError> {
        let origin = origin_target(incident).ok_or(ActionError::MissingTarget("origin"))?;

        let record = encode(&serde_json::json!({
            "incident_id": incident.id,
            "requests_per_minute": THROTTLED_RPM,
        }))?;
        let key = format!("quota:origin:{}", origin);
        if self.store.set_nx(&key, &record, QUOTA_TTL).await? {
            info!(origin, rpm = THROTTLED_RPM, "origin throttled");
            Ok(ActionOutcome::Applied)
        } else {
            Ok(ActionOutcome::AlreadyInEffect)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rw_core::incident::{IncidentSeverity, IncidentType};
    use rw_core::store::MemoryStore;

    #[tokio::test]
    async fn test_quota_installed_once() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let action = RateLimitAction::new(store.clone());
        let mut incident = Incident::new(
            IncidentType::ApiAbuse,
            IncidentSeverity::Medium,
            "t",
            "d",
            "test",
        );
        incident.add_asset("origin:192.0.2.4");

        assert_eq!(
            action.execute(&incident).await.unwrap(),
            ActionOutcome::Applied
        );
        assert_eq!(
            action.execute(&incident).await.unwrap(),
            ActionOutcome::AlreadyInEffect
        );
        assert!(store.get("quota:origin:192.0.2.4").await.unwrap().is_some());
    }
}
