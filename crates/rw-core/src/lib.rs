//! # rw-core
//!
//! Core scoring engine and response orchestrator for Risk Warden.
//!
//! This crate provides the risk signal collectors, composite scorer,
//! behavior profiles, incident data model and state machine, playbook
//! registry, and the concurrent response executor.

pub mod analytics;
pub mod config;
pub mod executor;
pub mod incident;
pub mod notify;
pub mod playbook;
pub mod profile;
pub mod risk;
pub mod scorer;
pub mod signals;
pub mod store;

pub use analytics::{ResponseAnalytics, ResponseStats};
pub use config::{load_risk_config, ConfigError, RiskConfig};
pub use executor::{ActionDispatcher, ExecutionReport, ExecutorError, ResponseExecutor};
pub use incident::{
    Incident, IncidentError, IncidentFactory, IncidentSeverity, IncidentStatus, IncidentType,
    SecurityEvent, ThreatLevel,
};
pub use notify::{AlertPriority, LogNotifier, NotificationChannel, NotifyError};
pub use playbook::{ActionKind, PlaybookRegistry, ResponsePhase, ResponsePlaybook};
pub use profile::{BehaviorProfile, ProfileStore, SubjectHistory, TxnOutcome, TxnRecord};
pub use risk::{
    FactorKind, RecommendedAction, RiskAssessment, RiskFactor, RiskLevel, RiskWeights, WeightError,
};
pub use scorer::{HeuristicAdjustment, MlAdjustment, RiskScorer, ML_ADJUSTMENT_CAP};
pub use signals::EventContext;
pub use store::{IncidentStore, KvStore, MemoryIncidentStore, MemoryStore, StoreError};
