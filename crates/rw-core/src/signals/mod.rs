//! Signal collectors.
//!
//! Six independent heuristics, each producing a bounded sub-score plus
//! evidence for one risk dimension. Collectors return
//! `Result<RiskFactor, SignalError>`; the scorer applies `neutral_fallback`
//! uniformly so one faulty signal degrades to a neutral 0.5 score instead
//! of aborting the assessment.

mod amount;
mod behavioral;
mod device;
mod geographic;
mod historical;
mod velocity;

pub use amount::collect_amount_pattern;
pub use behavioral::collect_behavioral;
pub use device::collect_device;
pub use geographic::collect_geographic;
pub use historical::collect_historical;
pub use velocity::{VelocityThresholds, VelocityTracker};

use crate::risk::{FactorKind, RiskFactor};
use crate::store::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// The event being scored, as supplied by the upstream caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventContext {
    /// Transaction amount, if this is a payment event.
    pub amount: Option<f64>,
    /// Payment method identifier.
    pub method: Option<String>,
    /// Network-origin identifier (IP or derived token).
    pub origin_id: Option<String>,
    /// Client's declared agent string.
    pub agent_string: Option<String>,
    /// Device fingerprint, if the client supplied one.
    pub fingerprint: Option<String>,
    /// Subject-local hour of day, 0-23.
    pub local_hour: u32,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
}

impl EventContext {
    /// A minimal context for the given local hour.
    pub fn at_hour(local_hour: u32) -> Self {
        Self {
            amount: None,
            method: None,
            origin_id: None,
            agent_string: None,
            fingerprint: None,
            local_hour: local_hour % 24,
            timestamp: Utc::now(),
        }
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = Some(method.to_string());
        self
    }

    pub fn with_origin(mut self, origin_id: &str) -> Self {
        self.origin_id = Some(origin_id.to_string());
        self
    }

    pub fn with_agent(mut self, agent: &str) -> Self {
        self.agent_string = Some(agent.to_string());
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: &str) -> Self {
        self.fingerprint = Some(fingerprint.to_string());
        self
    }
}

/// Errors internal to a single signal collector.
#[derive(Error, Debug)]
pub enum SignalError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid event context: {0}")]
    InvalidContext(String),

    #[error("internal signal error: {0}")]
    Internal(String),
}

/// Converts a collector failure into a neutral factor.
///
/// Applied uniformly by the scorer: a failed signal contributes 0.5 with
/// the failure recorded as evidence, and a fallback metric is emitted.
pub fn neutral_fallback(kind: FactorKind, result: Result<RiskFactor, SignalError>) -> RiskFactor {
    match result {
        Ok(factor) => factor,
        Err(e) => {
            warn!(signal = kind.as_str(), error = %e, "signal collector degraded to neutral");
            rw_observability::record_signal_fallback(kind.as_str());
            RiskFactor::neutral(kind, &e.to_string())
        }
    }
}

/// Agent substrings that indicate automation rather than a browser.
pub(crate) const AUTOMATION_SIGNATURES: [&str; 6] =
    ["curl", "wget", "python", "bot", "script", "headless"];

/// Returns the first automation signature found in the agent string.
pub(crate) fn automation_signature(agent: &str) -> Option<&'static str> {
    let lowered = agent.to_lowercase();
    AUTOMATION_SIGNATURES
        .iter()
        .find(|sig| lowered.contains(**sig))
        .copied()
}
