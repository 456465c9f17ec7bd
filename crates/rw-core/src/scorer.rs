//! Composite risk scorer.
//!
//! Runs the six signal collectors over one event, combines their
//! sub-scores with the configured weight table, applies the bounded ML
//! adjustment hook, classifies the result, and updates the subject's
//! behavior profile as a side effect.
//!
//! The scorer never fails the caller: collector faults degrade to neutral
//! factors, and a systemic fault yields the safe default assessment so
//! upstream payment and authentication flows are never blocked by this
//! subsystem.

use crate::profile::{BehaviorProfile, ProfileStore, SubjectHistory};
use crate::risk::{FactorKind, RiskAssessment, RiskWeights, WeightError};
use crate::signals::{
    collect_amount_pattern, collect_behavioral, collect_device, collect_geographic,
    collect_historical, neutral_fallback, EventContext, SignalError, VelocityThresholds,
    VelocityTracker,
};
use crate::store::KvStore;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Upper bound on the ML adjustment's contribution to the composite score.
///
/// The heuristic score stays the dominant, auditable signal; whatever an
/// adjustment implementation returns is clamped into `[0, ML_ADJUSTMENT_CAP]`.
pub const ML_ADJUSTMENT_CAP: f64 = 0.30;

/// Pluggable score adjustment hook.
///
/// A replaceable extension point for a learned model. Implementations see
/// the event, the profile (if any), and the heuristic composite, and
/// return an additive adjustment. The scorer enforces the cap, not the
/// implementation.
pub trait MlAdjustment: Send + Sync {
    fn adjust(
        &self,
        ctx: &EventContext,
        profile: Option<&BehaviorProfile>,
        heuristic_score: f64,
    ) -> f64;
}

/// Default stub adjustment over hour, amount magnitude, and profile presence.
#[derive(Debug, Clone, Default)]
pub struct HeuristicAdjustment;

impl MlAdjustment for HeuristicAdjustment {
    fn adjust(
        &self,
        ctx: &EventContext,
        profile: Option<&BehaviorProfile>,
        _heuristic_score: f64,
    ) -> f64 {
        let mut adjustment = 0.0;
        if (1..=5).contains(&ctx.local_hour) {
            adjustment += 0.05;
        }
        match ctx.amount {
            Some(amount) if amount >= 10_000.0 => adjustment += 0.10,
            Some(amount) if amount >= 1_000.0 => adjustment += 0.05,
            _ => {}
        }
        if profile.is_none() {
            adjustment += 0.05;
        }
        adjustment
    }
}

/// The composite risk scorer.
///
/// Constructed once with its collaborators injected; shared by reference
/// across request handlers.
pub struct RiskScorer {
    profiles: Arc<ProfileStore>,
    velocity: VelocityTracker,
    weights: RiskWeights,
    adjustment: Box<dyn MlAdjustment>,
}

impl RiskScorer {
    /// Creates a scorer over the given store with fraud-context weights.
    pub fn new(store: Arc<dyn KvStore>) -> Result<Self, WeightError> {
        Self::with_weights(store, RiskWeights::fraud())
    }

    /// Creates a scorer with an explicit weight table.
    ///
    /// The table is validated here, at startup, not per assessment.
    pub fn with_weights(store: Arc<dyn KvStore>, weights: RiskWeights) -> Result<Self, WeightError> {
        weights.validate()?;
        Ok(Self {
            profiles: Arc::new(ProfileStore::new(store.clone())),
            velocity: VelocityTracker::new(store, VelocityThresholds::default()),
            weights,
            adjustment: Box::new(HeuristicAdjustment),
        })
    }

    /// Creates a scorer from a loaded configuration.
    pub fn from_config(
        store: Arc<dyn KvStore>,
        config: &crate::config::RiskConfig,
    ) -> Result<Self, WeightError> {
        let mut scorer = Self::with_weights(store.clone(), config.fraud_weights())?;
        scorer.profiles = Arc::new(
            ProfileStore::new(store.clone())
                .with_learning_window_days(config.learning_window_days),
        );
        scorer.velocity = VelocityTracker::new(store, config.velocity.clone().into());
        Ok(scorer)
    }

    /// Replaces the default adjustment hook.
    pub fn with_adjustment(mut self, adjustment: Box<dyn MlAdjustment>) -> Self {
        self.adjustment = adjustment;
        self
    }

    /// Replaces the velocity thresholds.
    pub fn with_velocity_thresholds(mut self, thresholds: VelocityThresholds) -> Self {
        let store = self.velocity_store();
        self.velocity = VelocityTracker::new(store, thresholds);
        self
    }

    fn velocity_store(&self) -> Arc<dyn KvStore> {
        self.velocity.store()
    }

    /// The profile store this scorer reads from and updates.
    pub fn profiles(&self) -> Arc<ProfileStore> {
        Arc::clone(&self.profiles)
    }

    /// Assesses one event for one subject.
    ///
    /// Infallible by contract: internal faults produce the safe default
    /// assessment (medium risk, manual review) rather than an error.
    #[instrument(skip(self, ctx), fields(subject_id = %subject_id))]
    pub async fn assess(&self, subject_id: &str, ctx: &EventContext) -> RiskAssessment {
        match self.try_assess(subject_id, ctx).await {
            Ok(assessment) => {
                rw_observability::record_assessment(assessment.risk_level.as_str(), false);
                assessment
            }
            Err(e) => {
                warn!(subject_id, error = %e, "scoring failed, returning safe default");
                let fallback = RiskAssessment::safe_default(subject_id);
                rw_observability::record_assessment(fallback.risk_level.as_str(), true);
                fallback
            }
        }
    }

    async fn try_assess(
        &self,
        subject_id: &str,
        ctx: &EventContext,
    ) -> Result<RiskAssessment, SignalError> {
        if ctx.local_hour > 23 {
            return Err(SignalError::InvalidContext(format!(
                "local_hour {} out of range",
                ctx.local_hour
            )));
        }

        let profile = self.profiles.get_profile(subject_id).await;
        let history = self.profiles.get_history(subject_id).await;

        let factors = self
            .collect_factors(subject_id, ctx, profile.as_ref(), history.as_ref())
            .await;

        let heuristic = self.weights.composite(&factors);
        let raw_adjustment = self.adjustment.adjust(ctx, profile.as_ref(), heuristic);
        let adjustment = raw_adjustment.clamp(0.0, ML_ADJUSTMENT_CAP);
        if raw_adjustment != adjustment {
            debug!(raw_adjustment, adjustment, "ml adjustment clamped");
        }

        let assessment =
            RiskAssessment::from_composite(subject_id, heuristic + adjustment, factors);
        debug!(
            risk_score = assessment.risk_score,
            risk_level = %assessment.risk_level,
            confidence = assessment.confidence,
            "assessment complete"
        );

        // Side effect: fold this observation into the baseline.
        self.profiles.update(subject_id, ctx).await;

        Ok(assessment)
    }

    async fn collect_factors(
        &self,
        subject_id: &str,
        ctx: &EventContext,
        profile: Option<&BehaviorProfile>,
        history: Option<&SubjectHistory>,
    ) -> Vec<crate::risk::RiskFactor> {
        vec![
            neutral_fallback(
                FactorKind::Velocity,
                self.velocity.collect(subject_id, ctx).await,
            ),
            neutral_fallback(
                FactorKind::AmountPattern,
                collect_amount_pattern(ctx, profile, history),
            ),
            neutral_fallback(FactorKind::Geographic, collect_geographic(ctx, history)),
            neutral_fallback(
                FactorKind::Behavioral,
                collect_behavioral(ctx, profile, history),
            ),
            neutral_fallback(FactorKind::Device, collect_device(ctx, history)),
            neutral_fallback(FactorKind::Historical, collect_historical(history)),
        ]
    }
}
