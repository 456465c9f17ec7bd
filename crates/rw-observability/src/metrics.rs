//! Metrics for Risk Warden.
//!
//! This module registers the instruments exposed by the scoring engine and
//! the response orchestrator, using the metrics facade crate with
//! Prometheus export support. Recording helpers keep instrument names in
//! one place instead of scattering string literals across crates.

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Registers descriptions for all Risk Warden instruments.
///
/// Safe to call more than once; later calls overwrite the descriptions.
pub fn register_metrics() {
    describe_counter!(
        "rw_assessments_total",
        "Total number of risk assessments produced, labeled by risk level"
    );
    describe_counter!(
        "rw_assessment_fallbacks_total",
        "Number of assessments that returned the safe default after a systemic fault"
    );
    describe_counter!(
        "rw_signal_fallbacks_total",
        "Number of signal collectors that degraded to a neutral score"
    );
    describe_counter!(
        "rw_incidents_created_total",
        "Total number of incidents created, labeled by severity"
    );
    describe_counter!(
        "rw_actions_executed_total",
        "Total number of automated actions executed, labeled by action and outcome"
    );
    describe_counter!(
        "rw_actions_abandoned_total",
        "Number of automated actions abandoned at the aggregate deadline"
    );
    describe_counter!(
        "rw_sla_missed_total",
        "Number of incident responses that missed their SLA target"
    );
    describe_histogram!(
        "rw_response_duration_seconds",
        "Wall-clock duration of automated response execution"
    );
    describe_histogram!(
        "rw_action_duration_seconds",
        "Duration of individual action handler execution"
    );
}

/// Records a completed risk assessment.
pub fn record_assessment(risk_level: &'static str, fallback: bool) {
    counter!("rw_assessments_total", "level" => risk_level).increment(1);
    if fallback {
        counter!("rw_assessment_fallbacks_total").increment(1);
    }
}

/// Records a signal collector degrading to its neutral score.
pub fn record_signal_fallback(signal: &'static str) {
    counter!("rw_signal_fallbacks_total", "signal" => signal).increment(1);
}

/// Records the creation of an incident.
pub fn record_incident_created(severity: &'static str) {
    counter!("rw_incidents_created_total", "severity" => severity).increment(1);
}

/// Records the execution of a single action handler.
pub fn record_action_execution(action: &'static str, success: bool, duration_secs: f64) {
    let outcome = if success { "success" } else { "failure" };
    counter!("rw_actions_executed_total", "action" => action, "outcome" => outcome).increment(1);
    histogram!("rw_action_duration_seconds", "action" => action).record(duration_secs);
}

/// Records an action abandoned at the executor's aggregate deadline.
pub fn record_action_abandoned(action: &'static str) {
    counter!("rw_actions_abandoned_total", "action" => action).increment(1);
}

/// Records the outcome of a full response execution.
pub fn record_response(duration_secs: f64, sla_met: bool) {
    histogram!("rw_response_duration_seconds").record(duration_secs);
    if !sla_met {
        counter!("rw_sla_missed_total").increment(1);
    }
}
