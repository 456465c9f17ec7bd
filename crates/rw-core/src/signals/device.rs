//! Device signal: client-agent and fingerprint anomalies.

use super::{automation_signature, EventContext, SignalError};
use crate::profile::SubjectHistory;
use crate::risk::{FactorKind, RiskFactor};

/// Agent strings shorter than this are degenerate.
const MIN_AGENT_LEN: usize = 20;

/// Scores suspicious agents, fingerprint mismatches, and missing or
/// degenerate agent strings. Additive, capped at 1.0.
pub fn collect_device(
    ctx: &EventContext,
    history: Option<&SubjectHistory>,
) -> Result<RiskFactor, SignalError> {
    let mut score: f64 = 0.0;
    let mut factor = RiskFactor::new(FactorKind::Device, 0.0);

    match &ctx.agent_string {
        Some(agent) if agent.len() >= MIN_AGENT_LEN => {
            if let Some(signature) = automation_signature(agent) {
                score += 0.5;
                factor =
                    factor.with_evidence("suspicious_agent", serde_json::json!(signature));
            }
        }
        Some(agent) => {
            score += 0.3;
            factor = factor.with_evidence("degenerate_agent", serde_json::json!(agent));
            if let Some(signature) = automation_signature(agent) {
                score += 0.5;
                factor =
                    factor.with_evidence("suspicious_agent", serde_json::json!(signature));
            }
        }
        None => {
            score += 0.3;
            factor = factor.with_evidence("missing_agent", serde_json::json!(true));
        }
    }

    if let (Some(current), Some(stored)) = (
        &ctx.fingerprint,
        history.and_then(|h| h.last_fingerprint.as_ref()),
    ) {
        if current != stored {
            score += 0.4;
            factor = factor.with_evidence("fingerprint_mismatch", serde_json::json!(true));
        }
    }

    factor.score = score.min(1.0);
    Ok(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NORMAL_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/121";

    #[test]
    fn test_normal_agent_scores_zero() {
        let ctx = EventContext::at_hour(12).with_agent(NORMAL_AGENT);
        let factor = collect_device(&ctx, None).unwrap();
        assert_eq!(factor.score, 0.0);
    }

    #[test]
    fn test_missing_agent() {
        let factor = collect_device(&EventContext::at_hour(12), None).unwrap();
        assert!((factor.score - 0.3).abs() < 1e-9);
        assert!(factor.evidence.contains_key("missing_agent"));
    }

    #[test]
    fn test_degenerate_agent() {
        let ctx = EventContext::at_hour(12).with_agent("Mozilla");
        let factor = collect_device(&ctx, None).unwrap();
        assert!((factor.score - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_and_suspicious_agent_stack() {
        let ctx = EventContext::at_hour(12).with_agent("curl/8.0");
        let factor = collect_device(&ctx, None).unwrap();
        assert!((factor.score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_suspicious_long_agent() {
        let ctx =
            EventContext::at_hour(12).with_agent("python-requests/2.31.0 CPython/3.12 Linux");
        let factor = collect_device(&ctx, None).unwrap();
        assert!((factor.score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_fingerprint_mismatch() {
        let mut history = SubjectHistory::new("u");
        history.last_fingerprint = Some("fp-stored".to_string());
        let ctx = EventContext::at_hour(12)
            .with_agent(NORMAL_AGENT)
            .with_fingerprint("fp-new");
        let factor = collect_device(&ctx, Some(&history)).unwrap();
        assert!((factor.score - 0.4).abs() < 1e-9);
        assert!(factor.evidence.contains_key("fingerprint_mismatch"));
    }

    #[test]
    fn test_matching_fingerprint_not_flagged() {
        let mut history = SubjectHistory::new("u");
        history.last_fingerprint = Some("fp-1".to_string());
        let ctx = EventContext::at_hour(12)
            .with_agent(NORMAL_AGENT)
            .with_fingerprint("fp-1");
        let factor = collect_device(&ctx, Some(&history)).unwrap();
        assert_eq!(factor.score, 0.0);
    }
}
