//! Incident model, severity mapping, and response lifecycle.
//!
//! Incidents are created once by the factory, from either a high-risk
//! assessment or an external security event, and then advanced through the
//! response state machine by the executor. The status transition table is
//! enforced here; invalid transitions are errors, never silent.

use crate::risk::{RiskAssessment, RiskLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Severity of an incident, ordered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl IncidentSeverity {
    /// Returns the stable name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentSeverity::Low => "low",
            IncidentSeverity::Medium => "medium",
            IncidentSeverity::High => "high",
            IncidentSeverity::Critical => "critical",
        }
    }

    /// Maximum acceptable seconds from detection to first automated
    /// response, tiered by severity.
    pub fn sla_seconds(&self) -> u64 {
        match self {
            IncidentSeverity::Critical => 30,
            IncidentSeverity::High => 120,
            IncidentSeverity::Medium => 600,
            IncidentSeverity::Low => 3600,
        }
    }
}

impl std::fmt::Display for IncidentSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of an incident in the response lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    /// Newly created, response not yet started.
    Detected,
    /// Automated execution faulted; needs human investigation.
    Investigating,
    /// Automated containment actions in flight.
    Containing,
    /// Automated phase finished; monitoring and manual steps remain.
    Mitigating,
    /// Confirmed handled.
    Resolved,
    /// Closed without further action.
    Closed,
}

impl IncidentStatus {
    /// Whether this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, IncidentStatus::Resolved | IncidentStatus::Closed)
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IncidentStatus::Detected => "detected",
            IncidentStatus::Investigating => "investigating",
            IncidentStatus::Containing => "containing",
            IncidentStatus::Mitigating => "mitigating",
            IncidentStatus::Resolved => "resolved",
            IncidentStatus::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

/// Categories of incident the playbook registry matches on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    BruteForce,
    AccountTakeover,
    PaymentFraud,
    IdentityTheft,
    DataExfiltration,
    ApiAbuse,
    InjectionAttempt,
    Ddos,
    SuspiciousActivity,
}

impl IncidentType {
    /// Returns the stable name used in ids, logs, and playbook tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentType::BruteForce => "brute_force",
            IncidentType::AccountTakeover => "account_takeover",
            IncidentType::PaymentFraud => "payment_fraud",
            IncidentType::IdentityTheft => "identity_theft",
            IncidentType::DataExfiltration => "data_exfiltration",
            IncidentType::ApiAbuse => "api_abuse",
            IncidentType::InjectionAttempt => "injection_attempt",
            IncidentType::Ddos => "ddos",
            IncidentType::SuspiciousActivity => "suspicious_activity",
        }
    }
}

impl std::fmt::Display for IncidentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Threat level attached to external security events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    Informational,
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    /// Fixed mapping onto incident severity.
    pub fn to_severity(self) -> IncidentSeverity {
        match self {
            ThreatLevel::Critical => IncidentSeverity::Critical,
            ThreatLevel::High => IncidentSeverity::High,
            ThreatLevel::Medium => IncidentSeverity::Medium,
            ThreatLevel::Low | ThreatLevel::Informational => IncidentSeverity::Low,
        }
    }
}

/// An externally reported security event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    /// Category of the event.
    pub event_type: IncidentType,
    /// Reported threat level.
    pub threat_level: ThreatLevel,
    /// System that reported the event.
    pub source: String,
    /// Affected subject, if known.
    pub subject_id: Option<String>,
    /// Network origin involved, if known.
    pub origin_id: Option<String>,
    /// Free-form event details.
    pub details: HashMap<String, serde_json::Value>,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
}

/// Errors from incident lifecycle operations.
#[derive(Error, Debug)]
pub enum IncidentError {
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: IncidentStatus,
        to: IncidentStatus,
    },

    #[error("response time already recorded for incident {0}")]
    ResponseTimeAlreadySet(String),
}

/// A tracked record of a risk or security event moving through the
/// response lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    /// Deterministic identifier: `INC-{unix_millis}-{type}`.
    pub id: String,
    /// Short human-readable title.
    pub title: String,
    /// What was observed.
    pub description: String,
    /// Normalized severity.
    pub severity: IncidentSeverity,
    /// Current lifecycle status.
    pub status: IncidentStatus,
    /// Category used for playbook matching.
    pub incident_type: IncidentType,
    /// Where the incident came from (scorer, external system).
    pub source: String,
    /// Entities involved: subject ids, network origins.
    pub affected_assets: Vec<String>,
    /// Supporting indicators (factor evidence, event details).
    pub indicators: HashMap<String, serde_json::Value>,
    /// When the incident was detected.
    pub detected_at: DateTime<Utc>,
    /// Seconds from execution start to end of the automated phase.
    /// Set exactly once by the executor.
    pub response_time: Option<f64>,
    /// Seconds from detection to resolution. Set by operator tooling.
    pub resolution_time: Option<f64>,
    /// Names of automated actions that were applied.
    pub automated_actions: Vec<String>,
    /// Manual steps from the selected playbook.
    pub manual_actions: Vec<String>,
}

impl Incident {
    /// Creates a new incident in `Detected` status.
    pub fn new(
        incident_type: IncidentType,
        severity: IncidentSeverity,
        title: &str,
        description: &str,
        source: &str,
    ) -> Self {
        let detected_at = Utc::now();
        Self {
            id: format!(
                "INC-{}-{}",
                detected_at.timestamp_millis(),
                incident_type.as_str()
            ),
            title: title.to_string(),
            description: description.to_string(),
            severity,
            status: IncidentStatus::Detected,
            incident_type,
            source: source.to_string(),
            affected_assets: Vec::new(),
            indicators: HashMap::new(),
            detected_at,
            response_time: None,
            resolution_time: None,
            automated_actions: Vec::new(),
            manual_actions: Vec::new(),
        }
    }

    /// Adds an affected asset, skipping duplicates.
    pub fn add_asset(&mut self, asset: impl Into<String>) {
        let asset = asset.into();
        if !self.affected_assets.contains(&asset) {
            self.affected_assets.push(asset);
        }
    }

    /// Attaches an indicator.
    pub fn add_indicator(&mut self, key: &str, value: serde_json::Value) {
        self.indicators.insert(key.to_string(), value);
    }

    /// Advances the status, enforcing the transition table.
    pub fn transition(&mut self, to: IncidentStatus) -> Result<(), IncidentError> {
        use IncidentStatus::*;
        let allowed = matches!(
            (self.status, to),
            (Detected, Containing)
                | (Detected, Investigating)
                | (Containing, Mitigating)
                | (Containing, Investigating)
                | (Investigating, Containing)
                | (Mitigating, Resolved)
                | (Mitigating, Closed)
                | (Resolved, Closed)
        );
        if !allowed {
            return Err(IncidentError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Records the automated-response wall-clock time.
    ///
    /// Set exactly once at the end of automated-action execution; a second
    /// call is a logic error.
    pub fn record_response_time(&mut self, seconds: f64) -> Result<(), IncidentError> {
        if self.response_time.is_some() {
            return Err(IncidentError::ResponseTimeAlreadySet(self.id.clone()));
        }
        self.response_time = Some(seconds);
        Ok(())
    }
}

/// Builds incidents from risk assessments and external security events.
#[derive(Debug, Clone, Default)]
pub struct IncidentFactory;

impl IncidentFactory {
    pub fn new() -> Self {
        Self
    }

    /// Converts a high-risk assessment into an incident.
    ///
    /// Returns `None` below `High`: low-risk assessments never create
    /// incidents.
    pub fn from_risk_assessment(&self, assessment: &RiskAssessment) -> Option<Incident> {
        if assessment.risk_level < RiskLevel::High {
            return None;
        }
        let severity = if assessment.risk_level == RiskLevel::VeryHigh {
            IncidentSeverity::Critical
        } else {
            IncidentSeverity::High
        };

        let mut incident = Incident::new(
            IncidentType::PaymentFraud,
            severity,
            &format!("Elevated fraud risk for subject {}", assessment.subject_id),
            &format!(
                "Risk assessment scored {:.2} ({}) across {} factors",
                assessment.risk_score,
                assessment.risk_level,
                assessment.factors.len()
            ),
            "risk_scorer",
        );
        incident.add_asset(format!("subject:{}", assessment.subject_id));
        for factor in &assessment.factors {
            incident.add_indicator(
                factor.kind.as_str(),
                serde_json::json!({
                    "score": factor.score,
                    "evidence": factor.evidence,
                }),
            );
            if factor.kind == crate::risk::FactorKind::Geographic {
                if let Some(origin) = factor.evidence.get("current_origin") {
                    if let Some(origin) = origin.as_str() {
                        incident.add_asset(format!("origin:{}", origin));
                    }
                }
            }
        }
        incident.add_indicator("risk_score", serde_json::json!(assessment.risk_score));
        incident.add_indicator("confidence", serde_json::json!(assessment.confidence));
        Some(incident)
    }

    /// Converts an external security event into an incident.
    pub fn from_security_event(&self, event: &SecurityEvent) -> Incident {
        let mut incident = Incident::new(
            event.event_type,
            event.threat_level.to_severity(),
            &format!("{} reported by {}", event.event_type, event.source),
            &format!(
                "Security event {} at threat level {:?}",
                event.event_type, event.threat_level
            ),
            &event.source,
        );
        if let Some(subject) = &event.subject_id {
            incident.add_asset(format!("subject:{}", subject));
        }
        if let Some(origin) = &event.origin_id {
            incident.add_asset(format!("origin:{}", origin));
        }
        for (key, value) in &event.details {
            incident.add_indicator(key, value.clone());
        }
        incident
    }
}
