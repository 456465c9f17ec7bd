//! # rw-actions
//!
//! Response action handlers for Risk Warden.
//!
//! This crate provides the action registry and the built-in handlers
//! playbooks dispatch: origin blocking, account holds, step-up auth,
//! throttling, alerting, escalation, isolation, evidence snapshots,
//! subject notices, and detection rule staging.

pub mod alert_operators;
pub mod block_actor;
pub mod escalate;
pub mod isolate_system;
pub mod notify_subjects;
pub mod rate_limit;
pub mod registry;
pub mod require_strong_auth;
pub mod snapshot_data;
pub mod suspend_account;
pub mod update_rules;

pub use alert_operators::AlertOperatorsAction;
pub use block_actor::BlockActorAction;
pub use escalate::EscalateAction;
pub use isolate_system::IsolateSystemAction;
pub use notify_subjects::NotifySubjectsAction;
pub use rate_limit::RateLimitAction;
pub use registry::{ActionError, ActionOutcome, ActionRegistry, ResponseAction};
pub use require_strong_auth::RequireStrongAuthAction;
pub use snapshot_data::SnapshotDataAction;
pub use suspend_account::SuspendAccountAction;
pub use update_rules::UpdateRulesAction;
