//! Response analytics and SLA tracking.
//!
//! Rolling aggregates over the incident history: counts, incremental
//! means, and SLA compliance. Means update incrementally
//! (`new_avg = (old_avg*(n-1)+x)/n`) so no full history is held in
//! memory; a bounded detection-time index supports windowed reporting.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// How long detection-time index entries are retained.
const INDEX_RETENTION_DAYS: i64 = 30;

/// Snapshot of the rolling aggregates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseStats {
    /// Incidents ever created.
    pub incidents_created: u64,
    /// Incidents that reached a terminal state.
    pub incidents_resolved: u64,
    /// Mean seconds from execution start to end of the automated phase.
    pub avg_response_time: f64,
    /// Fraction of launched automated actions that were applied.
    pub automation_success_rate: f64,
    /// Fraction of responses that met their severity SLA.
    pub sla_compliance_rate: f64,
}

#[derive(Debug, Default)]
struct Aggregates {
    incidents_created: u64,
    incidents_resolved: u64,
    responses: u64,
    avg_response_time: f64,
    actions_launched: u64,
    actions_applied: u64,
    sla_met: u64,
}

/// Rolling incident metrics, constructed once and shared by reference.
#[derive(Debug, Default)]
pub struct ResponseAnalytics {
    aggregates: RwLock<Aggregates>,
    time_index: RwLock<BTreeMap<(DateTime<Utc>, String), ()>>,
}

impl ResponseAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly created incident into the counts and the
    /// detection-time index.
    pub async fn record_incident(&self, incident_id: &str, detected_at: DateTime<Utc>) {
        {
            let mut agg = self.aggregates.write().await;
            agg.incidents_created += 1;
        }
        let mut index = self.time_index.write().await;
        index.insert((detected_at, incident_id.to_string()), ());
        let cutoff = Utc::now() - ChronoDuration::days(INDEX_RETENTION_DAYS);
        index.retain(|(at, _), _| *at >= cutoff);
    }

    /// Records an incident reaching a terminal state.
    pub async fn record_resolution(&self) {
        let mut agg = self.aggregates.write().await;
        agg.incidents_resolved += 1;
    }

    /// Records one completed response execution.
    pub async fn record_response(
        &self,
        response_time_secs: f64,
        actions_launched: usize,
        actions_applied: usize,
        sla_met: bool,
    ) {
        let mut agg = self.aggregates.write().await;
        agg.responses += 1;
        let n = agg.responses as f64;
        agg.avg_response_time =
            (agg.avg_response_time * (n - 1.0) + response_time_secs) / n;
        agg.actions_launched += actions_launched as u64;
        agg.actions_applied += actions_applied as u64;
        if sla_met {
            agg.sla_met += 1;
        }
    }

    /// Current aggregate snapshot.
    pub async fn stats(&self) -> ResponseStats {
        let agg = self.aggregates.read().await;
        ResponseStats {
            incidents_created: agg.incidents_created,
            incidents_resolved: agg.incidents_resolved,
            avg_response_time: agg.avg_response_time,
            automation_success_rate: if agg.actions_launched > 0 {
                agg.actions_applied as f64 / agg.actions_launched as f64
            } else {
                0.0
            },
            sla_compliance_rate: if agg.responses > 0 {
                agg.sla_met as f64 / agg.responses as f64
            } else {
                0.0
            },
        }
    }

    /// Number of incidents detected within the trailing window.
    pub async fn window_count(&self, window: ChronoDuration) -> usize {
        let cutoff = Utc::now() - window;
        let index = self.time_index.read().await;
        index.keys().filter(|(at, _)| *at >= cutoff).count()
    }

    /// Incident counts for the standard reporting windows (1h, 24h, 7d).
    pub async fn window_counts(&self) -> (usize, usize, usize) {
        (
            self.window_count(ChronoDuration::hours(1)).await,
            self.window_count(ChronoDuration::hours(24)).await,
            self.window_count(ChronoDuration::days(7)).await,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_incremental_mean() {
        let analytics = ResponseAnalytics::new();
        analytics.record_response(10.0, 2, 2, true).await;
        analytics.record_response(20.0, 2, 2, true).await;
        analytics.record_response(30.0, 2, 2, false).await;

        let stats = analytics.stats().await;
        assert!((stats.avg_response_time - 20.0).abs() < 1e-9);
        assert!((stats.sla_compliance_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_automation_success_rate() {
        let analytics = ResponseAnalytics::new();
        analytics.record_response(5.0, 4, 3, true).await;
        analytics.record_response(5.0, 4, 1, true).await;

        let stats = analytics.stats().await;
        assert!((stats.automation_success_rate - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_stats_are_zero() {
        let analytics = ResponseAnalytics::new();
        let stats = analytics.stats().await;
        assert_eq!(stats.incidents_created, 0);
        assert_eq!(stats.automation_success_rate, 0.0);
        assert_eq!(stats.sla_compliance_rate, 0.0);
    }

    #[tokio::test]
    async fn test_window_counts() {
        let analytics = ResponseAnalytics::new();
        let now = Utc::now();
        analytics.record_incident("recent", now).await;
        analytics
            .record_incident("yesterday", now - ChronoDuration::hours(20))
            .await;
        analytics
            .record_incident("last_week", now - ChronoDuration::days(6))
            .await;

        let (h1, h24, d7) = analytics.window_counts().await;
        assert_eq!(h1, 1);
        assert_eq!(h24, 2);
        assert_eq!(d7, 3);
    }

    #[tokio::test]
    async fn test_index_bounded_by_retention() {
        let analytics = ResponseAnalytics::new();
        analytics
            .record_incident("ancient", Utc::now() - ChronoDuration::days(45))
            .await;
        analytics.record_incident("fresh", Utc::now()).await;

        // The ancient entry is pruned on the next insert.
        let index = analytics.time_index.read().await;
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn test_resolution_count() {
        let analytics = ResponseAnalytics::new();
        analytics.record_incident("a", Utc::now()).await;
        analytics.record_resolution().await;
        let stats = analytics.stats().await;
        assert_eq!(stats.incidents_created, 1);
        assert_eq!(stats.incidents_resolved, 1);
    }
}
