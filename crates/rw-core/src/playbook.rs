//! Response playbooks.
//!
//! A playbook maps incident type and severity to an ordered set of
//! automated actions, manual steps, and SLA targets. The registry is built
//! once at process start and is immutable at runtime; selection is first
//! match over the registered order, with a low-automation default when
//! nothing matches.

use crate::incident::{Incident, IncidentSeverity, IncidentType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The automated actions a playbook can invoke.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    BlockActor,
    SuspendAccount,
    RequireStrongAuth,
    RateLimit,
    AlertOperators,
    Escalate,
    IsolateSystem,
    SnapshotData,
    NotifySubjects,
    UpdateRules,
}

impl ActionKind {
    /// Returns the stable name used in logs, metrics, and incident records.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::BlockActor => "block_actor",
            ActionKind::SuspendAccount => "suspend_account",
            ActionKind::RequireStrongAuth => "require_strong_auth",
            ActionKind::RateLimit => "rate_limit",
            ActionKind::AlertOperators => "alert_operators",
            ActionKind::Escalate => "escalate",
            ActionKind::IsolateSystem => "isolate_system",
            ActionKind::SnapshotData => "snapshot_data",
            ActionKind::NotifySubjects => "notify_subjects",
            ActionKind::UpdateRules => "update_rules",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Response phases with SLA targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResponsePhase {
    Containment,
    Mitigation,
    Resolution,
}

/// A static rule mapping incident type and severity to a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsePlaybook {
    /// Stable identifier, e.g. `fraud_response`.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Incident types this playbook covers.
    pub incident_types: Vec<IncidentType>,
    /// Severities this playbook covers.
    pub severity_levels: Vec<IncidentSeverity>,
    /// Automated actions, in declaration order (executed concurrently).
    pub automated_actions: Vec<ActionKind>,
    /// Steps for the operator runbook.
    pub manual_steps: Vec<String>,
    /// Who gets pulled in when automation is not enough.
    pub escalation_rules: Vec<String>,
    /// Per-phase SLA targets in seconds.
    pub sla_targets: HashMap<ResponsePhase, u64>,
    /// Conditions that must hold before this playbook applies.
    pub prerequisites: Vec<String>,
    /// What "handled" looks like for this playbook.
    pub success_criteria: Vec<String>,
}

impl ResponsePlaybook {
    /// Whether this playbook covers the given incident.
    pub fn matches(&self, incident: &Incident) -> bool {
        self.incident_types.contains(&incident.incident_type)
            && self.severity_levels.contains(&incident.severity)
    }
}

/// Immutable, ordered playbook table with a built-in default.
pub struct PlaybookRegistry {
    playbooks: Vec<ResponsePlaybook>,
    default: ResponsePlaybook,
}

impl PlaybookRegistry {
    /// Builds the registry with the built-in playbooks.
    ///
    /// Type-specific playbooks are ordered before broader ones, so a
    /// `payment_fraud`/high incident selects `fraud_response` rather than
    /// falling through to anything wider.
    pub fn builtin() -> Self {
        Self {
            playbooks: vec![
                Self::critical_threat(),
                Self::fraud_response(),
                Self::api_abuse(),
            ],
            default: Self::default_response(),
        }
    }

    /// Builds a registry from an explicit ordered list.
    pub fn with_playbooks(playbooks: Vec<ResponsePlaybook>) -> Self {
        Self {
            playbooks,
            default: Self::default_response(),
        }
    }

    /// Builds the registry from configuration.
    ///
    /// A non-empty `playbooks` section replaces the built-ins in
    /// declaration order; the low-automation default still backstops
    /// selection.
    pub fn from_config(config: &crate::config::RiskConfig) -> Self {
        if config.playbooks.is_empty() {
            Self::builtin()
        } else {
            Self::with_playbooks(config.playbooks.clone())
        }
    }

    /// First-match selection; the default applies when nothing matches.
    pub fn select(&self, incident: &Incident) -> &ResponsePlaybook {
        self.playbooks
            .iter()
            .find(|p| p.matches(incident))
            .unwrap_or(&self.default)
    }

    /// All registered playbooks, in selection order.
    pub fn playbooks(&self) -> &[ResponsePlaybook] {
        &self.playbooks
    }

    fn critical_threat() -> ResponsePlaybook {
        ResponsePlaybook {
            id: "critical_threat".to_string(),
            name: "Critical Threat Containment".to_string(),
            incident_types: vec![
                IncidentType::BruteForce,
                IncidentType::AccountTakeover,
                IncidentType::DataExfiltration,
                IncidentType::Ddos,
            ],
            severity_levels: vec![IncidentSeverity::High, IncidentSeverity::Critical],
            automated_actions: vec![
                ActionKind::BlockActor,
                ActionKind::SuspendAccount,
                ActionKind::AlertOperators,
                ActionKind::Escalate,
                ActionKind::SnapshotData,
            ],
            manual_steps: vec![
                "Confirm scope of compromise with the on-call analyst".to_string(),
                "Review snapshot for lateral movement".to_string(),
                "Prepare customer communication if takeover is confirmed".to_string(),
            ],
            escalation_rules: vec!["security_oncall".to_string(), "soc_manager".to_string()],
            sla_targets: HashMap::from([
                (ResponsePhase::Containment, 30),
                (ResponsePhase::Mitigation, 300),
                (ResponsePhase::Resolution, 3600),
            ]),
            prerequisites: vec![],
            success_criteria: vec![
                "Actor origin blocked and account isolated".to_string(),
                "No further events from the actor within 1h".to_string(),
            ],
        }
    }

    fn fraud_response() -> ResponsePlaybook {
        ResponsePlaybook {
            id: "fraud_response".to_string(),
            name: "Payment Fraud Response".to_string(),
            incident_types: vec![IncidentType::PaymentFraud, IncidentType::IdentityTheft],
            severity_levels: vec![
                IncidentSeverity::Medium,
                IncidentSeverity::High,
                IncidentSeverity::Critical,
            ],
            automated_actions: vec![
                ActionKind::SuspendAccount,
                ActionKind::RequireStrongAuth,
                ActionKind::AlertOperators,
                ActionKind::NotifySubjects,
            ],
            manual_steps: vec![
                "Review flagged transactions with the payments team".to_string(),
                "Contact the account holder through a verified channel".to_string(),
            ],
            escalation_rules: vec!["fraud_team".to_string()],
            sla_targets: HashMap::from([
                (ResponsePhase::Containment, 120),
                (ResponsePhase::Mitigation, 900),
                (ResponsePhase::Resolution, 7200),
            ]),
            prerequisites: vec![],
            success_criteria: vec![
                "Account holder verified or account held".to_string(),
                "Disputed transactions flagged for reversal".to_string(),
            ],
        }
    }

    fn api_abuse() -> ResponsePlaybook {
        ResponsePlaybook {
            id: "api_abuse".to_string(),
            name: "API Abuse Mitigation".to_string(),
            incident_types: vec![IncidentType::InjectionAttempt, IncidentType::ApiAbuse],
            severity_levels: vec![
                IncidentSeverity::Low,
                IncidentSeverity::Medium,
                IncidentSeverity::High,
                IncidentSeverity::Critical,
            ],
            automated_actions: vec![
                ActionKind::RateLimit,
                ActionKind::BlockActor,
                ActionKind::UpdateRules,
                ActionKind::AlertOperators,
            ],
            manual_steps: vec![
                "Review gateway logs for the offending patterns".to_string(),
            ],
            escalation_rules: vec!["platform_oncall".to_string()],
            sla_targets: HashMap::from([
                (ResponsePhase::Containment, 600),
                (ResponsePhase::Mitigation, 3600),
                (ResponsePhase::Resolution, 86400),
            ]),
            prerequisites: vec![],
            success_criteria: vec!["Request rate back under quota".to_string()],
        }
    }

    fn default_response() -> ResponsePlaybook {
        ResponsePlaybook {
            id: "default_response".to_string(),
            name: "Default Response".to_string(),
            incident_types: vec![],
            severity_levels: vec![],
            automated_actions: vec![ActionKind::AlertOperators],
            manual_steps: vec!["Triage manually; no matching playbook".to_string()],
            escalation_rules: vec!["security_oncall".to_string()],
            sla_targets: HashMap::from([
                (ResponsePhase::Containment, 3600),
                (ResponsePhase::Mitigation, 86400),
            ]),
            prerequisites: vec![],
            success_criteria: vec![],
        }
    }
}

impl Default for PlaybookRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
