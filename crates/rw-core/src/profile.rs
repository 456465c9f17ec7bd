//! Per-subject behavioral baselines.
//!
//! The profile store keeps rolling statistics per subject: average
//! transaction amount, typical hours, common methods and origins. Profiles
//! are cached with a TTL and rebuilt from recorded transaction history on a
//! miss. A missing profile is a valid state ("no baseline"); store
//! unavailability degrades to the same state and never fails scoring.

use crate::signals::EventContext;
use crate::store::{decode, encode, KvStore, StoreResult};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default learning window for rebuilding profiles (30 days).
pub const DEFAULT_LEARNING_WINDOW_DAYS: i64 = 30;
/// TTL for cached profiles (24 hours).
pub const PROFILE_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Maximum typical-hour observations kept per profile.
pub const MAX_TYPICAL_HOURS: usize = 12;
/// Maximum transaction records retained per subject history.
const MAX_HISTORY_RECORDS: usize = 200;

/// Rolling behavioral baseline for one subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorProfile {
    pub subject_id: String,
    /// Exponential moving average of transaction amounts.
    pub avg_amount: f64,
    /// Recently observed local hours, oldest evicted past the cap.
    pub typical_hours: Vec<u32>,
    /// Payment methods seen for this subject.
    pub common_methods: HashSet<String>,
    /// Network origins seen for this subject.
    pub known_locations: HashSet<String>,
    /// Number of observations folded into this profile.
    pub observation_count: u64,
    pub last_updated: DateTime<Utc>,
}

impl BehaviorProfile {
    /// Creates an empty profile for a subject.
    pub fn new(subject_id: &str) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            avg_amount: 0.0,
            typical_hours: Vec::new(),
            common_methods: HashSet::new(),
            known_locations: HashSet::new(),
            observation_count: 0,
            last_updated: Utc::now(),
        }
    }

    /// Folds one observed event into the profile.
    ///
    /// Amounts update via EMA (`avg' = avg*0.9 + amount*0.1`); hours are
    /// appended with the oldest evicted past the cap.
    pub fn observe(&mut self, ctx: &EventContext) {
        if let Some(amount) = ctx.amount {
            if self.observation_count == 0 {
                self.avg_amount = amount;
            } else {
                self.avg_amount = self.avg_amount * 0.9 + amount * 0.1;
            }
        }
        if !self.typical_hours.contains(&ctx.local_hour) {
            self.typical_hours.push(ctx.local_hour);
            if self.typical_hours.len() > MAX_TYPICAL_HOURS {
                self.typical_hours.remove(0);
            }
        }
        if let Some(method) = &ctx.method {
            self.common_methods.insert(method.clone());
        }
        if let Some(origin) = &ctx.origin_id {
            self.known_locations.insert(origin.clone());
        }
        self.observation_count += 1;
        self.last_updated = Utc::now();
    }
}

/// Outcome of a recorded transaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TxnOutcome {
    Completed,
    Failed,
    Refunded,
}

/// One recorded transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxnRecord {
    pub amount: f64,
    pub local_hour: u32,
    pub method: Option<String>,
    pub origin_id: Option<String>,
    pub outcome: TxnOutcome,
    pub at: DateTime<Utc>,
}

/// Raw per-subject observation history backing profile rebuilds and the
/// historical/geographic/device collectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectHistory {
    pub subject_id: String,
    pub account_created_at: DateTime<Utc>,
    /// Recent transactions, oldest evicted past the cap.
    pub transactions: Vec<TxnRecord>,
    /// Most recently observed network origin and when it was seen.
    pub last_origin: Option<String>,
    pub last_origin_at: Option<DateTime<Utc>>,
    /// Most recently observed client agent string.
    pub last_agent: Option<String>,
    /// Most recently observed device fingerprint.
    pub last_fingerprint: Option<String>,
}

impl SubjectHistory {
    pub fn new(subject_id: &str) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            account_created_at: Utc::now(),
            transactions: Vec::new(),
            last_origin: None,
            last_origin_at: None,
            last_agent: None,
            last_fingerprint: None,
        }
    }

    /// Amounts of the most recent `n` transactions, newest last.
    pub fn recent_amounts(&self, n: usize) -> Vec<f64> {
        let start = self.transactions.len().saturating_sub(n);
        self.transactions[start..].iter().map(|t| t.amount).collect()
    }

    /// Failure rate over transactions within the last `days` days.
    pub fn failure_rate(&self, days: i64) -> Option<f64> {
        let cutoff = Utc::now() - ChronoDuration::days(days);
        let recent: Vec<_> = self
            .transactions
            .iter()
            .filter(|t| t.at >= cutoff)
            .collect();
        if recent.is_empty() {
            return None;
        }
        let failed = recent
            .iter()
            .filter(|t| t.outcome == TxnOutcome::Failed)
            .count();
        Some(failed as f64 / recent.len() as f64)
    }

    /// Count of refunded transactions on record.
    pub fn refund_count(&self) -> usize {
        self.transactions
            .iter()
            .filter(|t| t.outcome == TxnOutcome::Refunded)
            .count()
    }

    /// Account age in whole days.
    pub fn account_age_days(&self) -> i64 {
        (Utc::now() - self.account_created_at).num_days()
    }
}

/// Cache-backed store for profiles and subject histories.
pub struct ProfileStore {
    store: Arc<dyn KvStore>,
    learning_window_days: i64,
    profile_ttl: Duration,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            learning_window_days: DEFAULT_LEARNING_WINDOW_DAYS,
            profile_ttl: PROFILE_CACHE_TTL,
        }
    }

    /// Overrides the learning window used for rebuilds.
    pub fn with_learning_window_days(mut self, days: i64) -> Self {
        self.learning_window_days = days;
        self
    }

    fn profile_key(subject_id: &str) -> String {
        format!("profile:{}", subject_id)
    }

    fn history_key(subject_id: &str) -> String {
        format!("history:{}", subject_id)
    }

    /// Fetches the profile, rebuilding from history on a cache miss.
    ///
    /// Returns `Ok(None)` when there is no baseline for the subject, which
    /// is also what any store failure degrades to.
    pub async fn get_profile(&self, subject_id: &str) -> Option<BehaviorProfile> {
        let key = Self::profile_key(subject_id);
        match self.store.get(&key).await {
            Ok(Some(bytes)) => match decode(&bytes) {
                Ok(profile) => return Some(profile),
                Err(e) => warn!(subject_id, error = %e, "discarding undecodable cached profile"),
            },
            Ok(None) => {}
            Err(e) => {
                warn!(subject_id, error = %e, "profile store unavailable, scoring without baseline");
                return None;
            }
        }

        let rebuilt = self.rebuild_profile(subject_id).await?;
        if let Err(e) = self.persist_profile(&rebuilt).await {
            warn!(subject_id, error = %e, "failed to cache rebuilt profile");
        }
        Some(rebuilt)
    }

    /// Fetches the raw observation history, if any.
    pub async fn get_history(&self, subject_id: &str) -> Option<SubjectHistory> {
        let key = Self::history_key(subject_id);
        match self.store.get(&key).await {
            Ok(Some(bytes)) => decode(&bytes).ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(subject_id, error = %e, "history unavailable");
                None
            }
        }
    }

    /// Recomputes a profile from transactions inside the learning window.
    async fn rebuild_profile(&self, subject_id: &str) -> Option<BehaviorProfile> {
        let history = self.get_history(subject_id).await?;
        let cutoff = Utc::now() - ChronoDuration::days(self.learning_window_days);
        let completed: Vec<&TxnRecord> = history
            .transactions
            .iter()
            .filter(|t| t.at >= cutoff && t.outcome == TxnOutcome::Completed)
            .collect();
        if completed.is_empty() {
            return None;
        }

        let mut profile = BehaviorProfile::new(subject_id);
        profile.avg_amount =
            completed.iter().map(|t| t.amount).sum::<f64>() / completed.len() as f64;
        for txn in &completed {
            if !profile.typical_hours.contains(&txn.local_hour) {
                profile.typical_hours.push(txn.local_hour);
                if profile.typical_hours.len() > MAX_TYPICAL_HOURS {
                    profile.typical_hours.remove(0);
                }
            }
            if let Some(method) = &txn.method {
                profile.common_methods.insert(method.clone());
            }
            if let Some(origin) = &txn.origin_id {
                profile.known_locations.insert(origin.clone());
            }
        }
        profile.observation_count = completed.len() as u64;
        debug!(subject_id, observations = profile.observation_count, "rebuilt profile from history");
        Some(profile)
    }

    async fn persist_profile(&self, profile: &BehaviorProfile) -> StoreResult<()> {
        let bytes = encode(profile)?;
        self.store
            .set(&Self::profile_key(&profile.subject_id), &bytes, self.profile_ttl)
            .await
    }

    async fn persist_history(&self, history: &SubjectHistory) -> StoreResult<()> {
        let bytes = encode(history)?;
        self.store
            .set(&Self::history_key(&history.subject_id), &bytes, Duration::ZERO)
            .await
    }

    /// Folds an assessed event into the profile and the history's
    /// last-seen fields. Called by the scorer after each assessment.
    ///
    /// Concurrent assessments for one subject may race on the moving
    /// average; the EMA converges either way, so no lock is taken.
    pub async fn update(&self, subject_id: &str, ctx: &EventContext) {
        let mut profile = self
            .get_profile(subject_id)
            .await
            .unwrap_or_else(|| BehaviorProfile::new(subject_id));
        profile.observe(ctx);
        if let Err(e) = self.persist_profile(&profile).await {
            warn!(subject_id, error = %e, "profile update dropped");
        }

        let mut history = self
            .get_history(subject_id)
            .await
            .unwrap_or_else(|| SubjectHistory::new(subject_id));
        if let Some(origin) = &ctx.origin_id {
            history.last_origin = Some(origin.clone());
            history.last_origin_at = Some(ctx.timestamp);
        }
        if let Some(agent) = &ctx.agent_string {
            history.last_agent = Some(agent.clone());
        }
        if let Some(fp) = &ctx.fingerprint {
            history.last_fingerprint = Some(fp.clone());
        }
        if let Err(e) = self.persist_history(&history).await {
            warn!(subject_id, error = %e, "history update dropped");
        }
    }

    /// Records a settled transaction into the subject history.
    ///
    /// This is the feed for the historical and amount-pattern collectors;
    /// the payment pipeline calls it when transactions settle.
    pub async fn record_transaction(
        &self,
        subject_id: &str,
        ctx: &EventContext,
        outcome: TxnOutcome,
    ) {
        let mut history = self
            .get_history(subject_id)
            .await
            .unwrap_or_else(|| SubjectHistory::new(subject_id));
        history.transactions.push(TxnRecord {
            amount: ctx.amount.unwrap_or(0.0),
            local_hour: ctx.local_hour,
            method: ctx.method.clone(),
            origin_id: ctx.origin_id.clone(),
            outcome,
            at: ctx.timestamp,
        });
        if history.transactions.len() > MAX_HISTORY_RECORDS {
            let excess = history.transactions.len() - MAX_HISTORY_RECORDS;
            history.transactions.drain(..excess);
        }
        if let Err(e) = self.persist_history(&history).await {
            warn!(subject_id, error = %e, "transaction record dropped");
        }
    }

    /// Seeds a history record with an explicit account creation time.
    /// Used by onboarding flows and tests.
    pub async fn seed_account(&self, subject_id: &str, created_at: DateTime<Utc>) {
        let mut history = self
            .get_history(subject_id)
            .await
            .unwrap_or_else(|| SubjectHistory::new(subject_id));
        history.account_created_at = created_at;
        if let Err(e) = self.persist_history(&history).await {
            warn!(subject_id, error = %e, "account seed dropped");
        }
    }
}
