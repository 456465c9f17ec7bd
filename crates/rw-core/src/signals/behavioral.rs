//! Behavioral signal: deviation from the subject's learned habits.

use super::{automation_signature, EventContext, SignalError};
use crate::profile::{BehaviorProfile, SubjectHistory};
use crate::risk::{FactorKind, RiskFactor};

/// Scores unusual hours, automation signatures, agent changes, and
/// unfamiliar payment methods. Additive, capped at 1.0.
pub fn collect_behavioral(
    ctx: &EventContext,
    profile: Option<&BehaviorProfile>,
    history: Option<&SubjectHistory>,
) -> Result<RiskFactor, SignalError> {
    let mut score: f64 = 0.0;
    let mut factor = RiskFactor::new(FactorKind::Behavioral, 0.0);

    if let Some(profile) = profile {
        if !profile.typical_hours.is_empty() && !profile.typical_hours.contains(&ctx.local_hour) {
            // The 1-5 AM band is the least plausible time for a first-seen hour.
            let night = (1..=5).contains(&ctx.local_hour);
            score += if night { 0.4 } else { 0.3 };
            factor = factor
                .with_evidence("unusual_hour", serde_json::json!(ctx.local_hour))
                .with_evidence("night_window", serde_json::json!(night));
        }

        if let Some(method) = &ctx.method {
            if !profile.common_methods.is_empty() && !profile.common_methods.contains(method) {
                score += 0.2;
                factor = factor.with_evidence("unfamiliar_method", serde_json::json!(method));
            }
        }
    }

    if let Some(agent) = &ctx.agent_string {
        if let Some(signature) = automation_signature(agent) {
            score += 0.8;
            factor = factor.with_evidence("automation_signature", serde_json::json!(signature));
        }

        if let Some(last_agent) = history.and_then(|h| h.last_agent.as_ref()) {
            if last_agent != agent {
                score += 0.2;
                factor = factor.with_evidence("agent_changed", serde_json::json!(true));
            }
        }
    }

    factor.score = score.min(1.0);
    Ok(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_with_hours(hours: &[u32]) -> BehaviorProfile {
        let mut profile = BehaviorProfile::new("u");
        profile.typical_hours = hours.to_vec();
        profile.common_methods.insert("card".to_string());
        profile
    }

    #[test]
    fn test_no_baseline_no_agent_scores_zero() {
        let factor = collect_behavioral(&EventContext::at_hour(12), None, None).unwrap();
        assert_eq!(factor.score, 0.0);
    }

    #[test]
    fn test_unusual_hour() {
        let profile = profile_with_hours(&[9, 10, 11]);
        let factor =
            collect_behavioral(&EventContext::at_hour(20), Some(&profile), None).unwrap();
        assert!((factor.score - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_unusual_night_hour_scores_more() {
        let profile = profile_with_hours(&[9, 10, 11]);
        let factor =
            collect_behavioral(&EventContext::at_hour(3), Some(&profile), None).unwrap();
        assert!((factor.score - 0.4).abs() < 1e-9);
        assert_eq!(factor.evidence["night_window"], serde_json::json!(true));
    }

    #[test]
    fn test_typical_hour_not_flagged() {
        let profile = profile_with_hours(&[9, 10, 11]);
        let factor =
            collect_behavioral(&EventContext::at_hour(10), Some(&profile), None).unwrap();
        assert_eq!(factor.score, 0.0);
    }

    #[test]
    fn test_automation_signature_dominates() {
        let ctx = EventContext::at_hour(12).with_agent("python-requests/2.31");
        let factor = collect_behavioral(&ctx, None, None).unwrap();
        assert!((factor.score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_agent_change() {
        let ctx = EventContext::at_hour(12).with_agent("Mozilla/5.0 Firefox/121");
        let mut history = SubjectHistory::new("u");
        history.last_agent = Some("Mozilla/5.0 Chrome/120".to_string());
        let factor = collect_behavioral(&ctx, None, Some(&history)).unwrap();
        assert!((factor.score - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_unfamiliar_method() {
        let profile = profile_with_hours(&[12]);
        let ctx = EventContext::at_hour(12).with_method("crypto");
        let factor = collect_behavioral(&ctx, Some(&profile), None).unwrap();
        assert!((factor.score - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_stacked_anomalies_capped() {
        let profile = profile_with_hours(&[9]);
        let mut history = SubjectHistory::new("u");
        history.last_agent = Some("Mozilla/5.0".to_string());
        let ctx = EventContext::at_hour(3)
            .with_agent("curl/8.0")
            .with_method("crypto");
        let factor = collect_behavioral(&ctx, Some(&profile), Some(&history)).unwrap();
        assert_eq!(factor.score, 1.0);
    }
}
