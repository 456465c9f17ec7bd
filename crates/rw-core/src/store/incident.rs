//! Incident store collaborator.
//!
//! Narrow contract over incident persistence: keyed puts with TTL-based
//! retention, an active-incident listing, and a detection-time index for
//! range queries. The in-memory implementation is the default backing
//! store; a durable backend can implement the same trait.

use super::{decode, encode, StoreResult};
use crate::incident::{Incident, IncidentStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::RwLock;

/// Default retention for stored incidents (30 days).
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Persistence contract for incidents.
#[async_trait]
pub trait IncidentStore: Send + Sync + 'static {
    /// Stores or replaces an incident.
    async fn put(&self, incident: &Incident) -> StoreResult<()>;

    /// Fetches an incident by id.
    async fn get(&self, incident_id: &str) -> StoreResult<Option<Incident>>;

    /// Lists incidents not yet in a terminal state.
    async fn list_active(&self) -> StoreResult<Vec<Incident>>;

    /// Adds an incident to the detection-time index.
    async fn index_by_time(&self, incident_id: &str, detected_at: DateTime<Utc>)
        -> StoreResult<()>;

    /// Returns ids of incidents detected in `[start, end]`, time-ordered.
    async fn range_query(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<String>>;
}

struct StoredIncident {
    bytes: Vec<u8>,
    status: IncidentStatus,
    expires_at: DateTime<Utc>,
}

/// In-memory incident store with a BTreeMap detection-time index.
pub struct MemoryIncidentStore {
    incidents: RwLock<HashMap<String, StoredIncident>>,
    time_index: RwLock<BTreeMap<(DateTime<Utc>, String), ()>>,
    retention: chrono::Duration,
}

impl MemoryIncidentStore {
    /// Creates a store with the default 30-day retention.
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    /// Creates a store with a custom retention period.
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            incidents: RwLock::new(HashMap::new()),
            time_index: RwLock::new(BTreeMap::new()),
            retention: chrono::Duration::from_std(retention)
                .unwrap_or_else(|_| chrono::Duration::days(30)),
        }
    }

    /// Number of retained incidents, expired entries excluded.
    pub async fn len(&self) -> usize {
        let now = Utc::now();
        let incidents = self.incidents.read().await;
        incidents.values().filter(|s| s.expires_at > now).count()
    }

    /// Whether the store has no retained incidents.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryIncidentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IncidentStore for MemoryIncidentStore {
    async fn put(&self, incident: &Incident) -> StoreResult<()> {
        let stored = StoredIncident {
            bytes: encode(incident)?,
            status: incident.status,
            expires_at: Utc::now() + self.retention,
        };
        let mut incidents = self.incidents.write().await;
        incidents.insert(incident.id.clone(), stored);
        Ok(())
    }

    async fn get(&self, incident_id: &str) -> StoreResult<Option<Incident>> {
        let incidents = self.incidents.read().await;
        match incidents.get(incident_id) {
            Some(stored) if stored.expires_at > Utc::now() => Ok(Some(decode(&stored.bytes)?)),
            _ => Ok(None),
        }
    }

    async fn list_active(&self) -> StoreResult<Vec<Incident>> {
        let now = Utc::now();
        let incidents = self.incidents.read().await;
        let mut active = Vec::new();
        for stored in incidents.values() {
            if stored.expires_at > now && !stored.status.is_terminal() {
                active.push(decode(&stored.bytes)?);
            }
        }
        active.sort_by(|a: &Incident, b: &Incident| a.detected_at.cmp(&b.detected_at));
        Ok(active)
    }

    async fn index_by_time(
        &self,
        incident_id: &str,
        detected_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut index = self.time_index.write().await;
        index.insert((detected_at, incident_id.to_string()), ());
        // Prune index entries past retention while the lock is held.
        let cutoff = Utc::now() - self.retention;
        index.retain(|(detected, _), _| *detected >= cutoff);
        Ok(())
    }

    async fn range_query(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<String>> {
        let index = self.time_index.read().await;
        Ok(index
            .keys()
            .filter(|(detected, _)| *detected >= start && *detected <= end)
            .map(|(_, id)| id.clone())
            .collect())
    }
}
