//! Risk data model and classification for Risk Warden.
//!
//! This module defines the factor and assessment types produced by the
//! scoring pipeline, the typed weight tables for each scoring context,
//! and the threshold-based risk level classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The risk dimensions evaluated by the signal collectors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    /// Transaction velocity over the sliding window.
    Velocity,
    /// Suspicious amount patterns (card testing, escalation, repetition).
    AmountPattern,
    /// Network-origin change anomalies.
    Geographic,
    /// Deviation from the subject's behavioral baseline.
    Behavioral,
    /// Device and client-agent anomalies.
    Device,
    /// Historical account risk (failures, refunds, account age).
    Historical,
}

impl FactorKind {
    /// Returns the stable name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            FactorKind::Velocity => "velocity",
            FactorKind::AmountPattern => "amount_pattern",
            FactorKind::Geographic => "geographic",
            FactorKind::Behavioral => "behavioral",
            FactorKind::Device => "device",
            FactorKind::Historical => "historical",
        }
    }

    /// All factor kinds, in scoring order.
    pub fn all() -> [FactorKind; 6] {
        [
            FactorKind::Velocity,
            FactorKind::AmountPattern,
            FactorKind::Geographic,
            FactorKind::Behavioral,
            FactorKind::Device,
            FactorKind::Historical,
        ]
    }
}

impl std::fmt::Display for FactorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single sub-score produced by one signal collector.
///
/// Immutable once created. The evidence map carries the observations that
/// drove the score, for audit and manual review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    /// Which risk dimension this factor covers.
    pub kind: FactorKind,
    /// Sub-score in [0, 1].
    pub score: f64,
    /// Observations supporting the score.
    pub evidence: HashMap<String, serde_json::Value>,
}

impl RiskFactor {
    /// Creates a factor, clamping the score into [0, 1].
    pub fn new(kind: FactorKind, score: f64) -> Self {
        Self {
            kind,
            score: score.clamp(0.0, 1.0),
            evidence: HashMap::new(),
        }
    }

    /// Attaches a piece of evidence.
    pub fn with_evidence(mut self, key: &str, value: serde_json::Value) -> Self {
        self.evidence.insert(key.to_string(), value);
        self
    }

    /// A neutral factor used when a collector fails internally.
    pub fn neutral(kind: FactorKind, reason: &str) -> Self {
        Self::new(kind, 0.5).with_evidence("degraded", serde_json::json!(reason))
    }
}

/// Risk level classification over the composite score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskLevel {
    /// Classifies a composite score against the fixed thresholds.
    pub fn from_score(score: f64) -> Self {
        if score < 0.2 {
            RiskLevel::VeryLow
        } else if score < 0.4 {
            RiskLevel::Low
        } else if score < 0.6 {
            RiskLevel::Medium
        } else if score < 0.8 {
            RiskLevel::High
        } else {
            RiskLevel::VeryHigh
        }
    }

    /// Returns the stable name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::VeryLow => "very_low",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::VeryHigh => "very_high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Policy recommendation derived from the risk level.
///
/// Enforcement (actually blocking a request) is the caller's responsibility.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Allow,
    AllowWithMonitoring,
    RequireAdditionalVerification,
    ManualReviewRequired,
    Block,
}

impl RecommendedAction {
    /// Maps a risk level to its recommendation.
    pub fn for_level(level: RiskLevel) -> Self {
        match level {
            RiskLevel::VeryLow => RecommendedAction::Allow,
            RiskLevel::Low => RecommendedAction::AllowWithMonitoring,
            RiskLevel::Medium => RecommendedAction::RequireAdditionalVerification,
            RiskLevel::High => RecommendedAction::ManualReviewRequired,
            RiskLevel::VeryHigh => RecommendedAction::Block,
        }
    }
}

/// The output of scoring one subject/event.
///
/// Created per scoring call and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// The subject that was scored.
    pub subject_id: String,
    /// Weighted composite score in [0, 1].
    pub risk_score: f64,
    /// Classified risk level.
    pub risk_level: RiskLevel,
    /// The factors that contributed to the score.
    pub factors: Vec<RiskFactor>,
    /// Policy recommendation for the caller.
    pub recommended_action: RecommendedAction,
    /// Confidence in the assessment, in [0, 1].
    pub confidence: f64,
    /// Whether a human should review this subject.
    pub requires_manual_review: bool,
    /// Whether the caller should force additional verification.
    pub additional_verification_required: bool,
    /// When the assessment was produced.
    pub created_at: DateTime<Utc>,
}

impl RiskAssessment {
    /// Builds an assessment from a composite score and its factors.
    pub fn from_composite(subject_id: &str, risk_score: f64, factors: Vec<RiskFactor>) -> Self {
        let risk_score = risk_score.clamp(0.0, 1.0);
        let risk_level = RiskLevel::from_score(risk_score);
        Self {
            subject_id: subject_id.to_string(),
            risk_score,
            risk_level,
            confidence: confidence_from_factors(&factors),
            factors,
            recommended_action: RecommendedAction::for_level(risk_level),
            requires_manual_review: risk_level >= RiskLevel::High,
            additional_verification_required: risk_level >= RiskLevel::Medium,
            created_at: Utc::now(),
        }
    }

    /// The safe default returned when the scorer itself fails.
    ///
    /// Upstream flows must never be blocked by an internal fault of this
    /// subsystem, so the fallback is a reviewable medium-risk assessment.
    pub fn safe_default(subject_id: &str) -> Self {
        let mut assessment = Self::from_composite(subject_id, 0.5, Vec::new());
        assessment.requires_manual_review = true;
        assessment.confidence = 0.3;
        assessment
    }
}

/// Confidence from the number of non-trivial contributing factors.
fn confidence_from_factors(factors: &[RiskFactor]) -> f64 {
    let significant = factors.iter().filter(|f| f.score > 0.1).count();
    match significant {
        0 => 0.3,
        1 => 0.5,
        2 => 0.7,
        _ => 0.9,
    }
}

/// Errors from weight table validation.
#[derive(Error, Debug)]
pub enum WeightError {
    #[error("weight for {0} must be non-negative, got {1}")]
    Negative(FactorKind, f64),

    #[error("weights must sum to approximately 1.0, got {0}")]
    BadSum(f64),
}

/// Typed weight table applied to the six risk dimensions.
///
/// Weights should sum to 1.0 for a normalized composite score; `validate`
/// is called when a scorer is constructed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskWeights {
    pub velocity: f64,
    pub amount_pattern: f64,
    pub geographic: f64,
    pub behavioral: f64,
    pub device: f64,
    pub historical: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self::fraud()
    }
}

impl RiskWeights {
    /// Weight table tuned for the payment-fraud context.
    pub fn fraud() -> Self {
        Self {
            velocity: 0.25,
            amount_pattern: 0.20,
            geographic: 0.15,
            behavioral: 0.20,
            device: 0.10,
            historical: 0.10,
        }
    }

    /// Weight table tuned for the authentication context.
    ///
    /// Device trust and threat intel dominate; velocity matters least.
    /// The six slots map onto the same factor kinds: device carries the
    /// device-trust weight, historical carries the threat-intel weight.
    pub fn authentication() -> Self {
        Self {
            velocity: 0.05,
            amount_pattern: 0.10,
            geographic: 0.20,
            behavioral: 0.15,
            device: 0.25,
            historical: 0.25,
        }
    }

    /// Returns the weight for a factor kind.
    pub fn for_kind(&self, kind: FactorKind) -> f64 {
        match kind {
            FactorKind::Velocity => self.velocity,
            FactorKind::AmountPattern => self.amount_pattern,
            FactorKind::Geographic => self.geographic,
            FactorKind::Behavioral => self.behavioral,
            FactorKind::Device => self.device,
            FactorKind::Historical => self.historical,
        }
    }

    /// Returns the sum of all weights.
    pub fn total(&self) -> f64 {
        FactorKind::all().iter().map(|k| self.for_kind(*k)).sum()
    }

    /// Validates that weights are non-negative and sum to approximately 1.0.
    pub fn validate(&self) -> Result<(), WeightError> {
        for kind in FactorKind::all() {
            let w = self.for_kind(kind);
            if w < 0.0 {
                return Err(WeightError::Negative(kind, w));
            }
        }
        let total = self.total();
        if (total - 1.0).abs() > 0.01 {
            return Err(WeightError::BadSum(total));
        }
        Ok(())
    }

    /// Computes the weighted composite over a set of factors, clamped to [0, 1].
    pub fn composite(&self, factors: &[RiskFactor]) -> f64 {
        factors
            .iter()
            .map(|f| f.score * self.for_kind(f.kind))
            .sum::<f64>()
            .clamp(0.0, 1.0)
    }
}
