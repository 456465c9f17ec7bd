//! # rw-observability
//!
//! Structured logging and metrics for Risk Warden.
//!
//! This crate provides tracing-based logging setup and metric
//! registration/recording helpers shared by the scoring engine and the
//! response orchestrator.

pub mod logging;
pub mod metrics;

pub use crate::logging::{init_logging, init_logging_with_config, LoggingConfig};
pub use crate::metrics::{
    record_action_abandoned, record_action_execution, record_assessment, record_incident_created,
    record_response, record_signal_fallback, register_metrics,
};
