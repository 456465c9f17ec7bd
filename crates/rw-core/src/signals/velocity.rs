//! Velocity signal: transaction rate over a sliding one-hour window.
//!
//! Window entries live in the KV store's sorted time index, one member per
//! event, scored by unix timestamp. Entries older than the horizon are
//! pruned lazily on each access, so the window never grows unbounded.

use super::{EventContext, SignalError};
use crate::risk::{FactorKind, RiskFactor};
use crate::store::KvStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Window horizon in seconds (one hour).
const WINDOW_SECS: i64 = 3600;

/// Fraction past a threshold at which an axis saturates.
const SATURATION_HEADROOM: f64 = 0.2;

/// Zero at or below the threshold, 1.0 once the observation exceeds it by
/// the headroom fraction.
fn overage_pressure(observed: f64, threshold: f64) -> f64 {
    ((observed - threshold) / (threshold * SATURATION_HEADROOM)).clamp(0.0, 1.0)
}

/// Thresholds past which the velocity score starts rising.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VelocityThresholds {
    /// Transactions per hour considered normal.
    pub max_txn_per_hour: u64,
    /// Summed amount per hour considered normal.
    pub max_amount_per_hour: f64,
}

impl Default for VelocityThresholds {
    fn default() -> Self {
        Self {
            max_txn_per_hour: 10,
            max_amount_per_hour: 5000.0,
        }
    }
}

/// Sliding-window velocity tracker backed by the KV store.
pub struct VelocityTracker {
    store: Arc<dyn KvStore>,
    thresholds: VelocityThresholds,
}

impl VelocityTracker {
    pub fn new(store: Arc<dyn KvStore>, thresholds: VelocityThresholds) -> Self {
        Self { store, thresholds }
    }

    /// The store backing this tracker's windows.
    pub(crate) fn store(&self) -> Arc<dyn KvStore> {
        Arc::clone(&self.store)
    }

    fn window_key(subject_id: &str) -> String {
        format!("velocity:{}", subject_id)
    }

    /// Records the event into the window and scores the resulting rate.
    ///
    /// Each axis is zero at its threshold and saturates once the window
    /// exceeds it by the headroom fraction; the factor is the steeper of
    /// the two. Appends before reading so the current event counts toward
    /// its own window.
    pub async fn collect(
        &self,
        subject_id: &str,
        ctx: &EventContext,
    ) -> Result<RiskFactor, SignalError> {
        let key = Self::window_key(subject_id);
        let now = ctx.timestamp.timestamp() as f64;
        let horizon = now - WINDOW_SECS as f64;

        // Member encodes the amount so the summed window needs no second read.
        let member = format!("{}:{}", Uuid::new_v4(), ctx.amount.unwrap_or(0.0));
        self.store.index_add(&key, &member, now).await?;
        self.store.index_prune(&key, horizon).await?;

        let members = self.store.index_range(&key, horizon, now).await?;
        let count = members.len() as u64;
        let total: f64 = members
            .iter()
            .filter_map(|m| m.rsplit(':').next())
            .filter_map(|amount| amount.parse::<f64>().ok())
            .sum();

        let count_pressure = overage_pressure(
            count as f64,
            self.thresholds.max_txn_per_hour.max(1) as f64,
        );
        let amount_pressure =
            overage_pressure(total, self.thresholds.max_amount_per_hour.max(1.0));
        let score = count_pressure.max(amount_pressure);

        Ok(RiskFactor::new(FactorKind::Velocity, score)
            .with_evidence("window_count", serde_json::json!(count))
            .with_evidence("window_amount", serde_json::json!(total))
            .with_evidence(
                "max_txn_per_hour",
                serde_json::json!(self.thresholds.max_txn_per_hour),
            ))
    }
}
