//! Amount-pattern signal: card-testing amounts, escalation jumps,
//! repetition, and deviation from the subject's baseline.

use super::{EventContext, SignalError};
use crate::profile::{BehaviorProfile, SubjectHistory};
use crate::risk::{FactorKind, RiskFactor};

/// Canonical card-testing amounts.
const TESTING_AMOUNTS: [f64; 7] = [1.0, 5.0, 10.0, 100.0, 101.0, 111.0, 123.0];

/// Amounts at or below this are "small" for escalation detection.
const SMALL_AMOUNT: f64 = 50.0;
/// Jump factor over a recent small amount that flags escalation.
const ESCALATION_FACTOR: f64 = 10.0;
/// Identical-amount repetitions within the last ten that flag repetition.
const REPEAT_THRESHOLD: usize = 3;
/// Multiple of the profile average that flags deviation.
const DEVIATION_FACTOR: f64 = 5.0;
/// Amounts at or above this are large for a subject with no spending baseline.
const LARGE_UNBASELINED: f64 = 1_000.0;
/// Amounts at or above this are very large for a subject with no baseline.
const VERY_LARGE_UNBASELINED: f64 = 5_000.0;

/// Scores the amount against testing, escalation, repetition, and
/// deviation patterns. Contributions are additive, capped at 1.0.
pub fn collect_amount_pattern(
    ctx: &EventContext,
    profile: Option<&BehaviorProfile>,
    history: Option<&SubjectHistory>,
) -> Result<RiskFactor, SignalError> {
    let Some(amount) = ctx.amount else {
        return Ok(RiskFactor::new(FactorKind::AmountPattern, 0.0)
            .with_evidence("no_amount", serde_json::json!(true)));
    };
    if !amount.is_finite() || amount < 0.0 {
        return Err(SignalError::InvalidContext(format!(
            "non-finite or negative amount {}",
            amount
        )));
    }

    let mut score: f64 = 0.0;
    let mut factor = RiskFactor::new(FactorKind::AmountPattern, 0.0)
        .with_evidence("amount", serde_json::json!(amount));

    if TESTING_AMOUNTS.iter().any(|t| (amount - t).abs() < 0.005) {
        score += 0.4;
        factor = factor.with_evidence("testing_amount", serde_json::json!(true));
    }

    let recent = history
        .map(|h| h.recent_amounts(10))
        .unwrap_or_default();

    if let Some(last_small) = recent
        .iter()
        .rev()
        .find(|a| **a > 0.0 && **a <= SMALL_AMOUNT)
    {
        if amount >= last_small * ESCALATION_FACTOR {
            score += 0.4;
            factor = factor.with_evidence(
                "escalation_from",
                serde_json::json!(last_small),
            );
        }
    }

    let repeats = recent.iter().filter(|a| (**a - amount).abs() < 0.005).count();
    if repeats >= REPEAT_THRESHOLD {
        score += 0.3;
        factor = factor.with_evidence("repeated_count", serde_json::json!(repeats));
    }

    if let Some(profile) = profile {
        if profile.avg_amount > 0.0 && amount > profile.avg_amount * DEVIATION_FACTOR {
            score += 0.4;
            factor = factor.with_evidence(
                "baseline_avg",
                serde_json::json!(profile.avg_amount),
            );
        }
    }

    // With no baseline to deviate from, absolute magnitude stands in:
    // a large first-seen amount is suspicious on its own.
    let has_baseline =
        profile.map_or(false, |p| p.avg_amount > 0.0) || !recent.is_empty();
    if !has_baseline && amount >= LARGE_UNBASELINED {
        score += if amount >= VERY_LARGE_UNBASELINED { 0.5 } else { 0.3 };
        factor = factor.with_evidence("large_without_baseline", serde_json::json!(amount));
    }

    factor.score = score.min(1.0);
    Ok(factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{TxnOutcome, TxnRecord};
    use chrono::Utc;

    fn ctx(amount: f64) -> EventContext {
        EventContext::at_hour(12).with_amount(amount)
    }

    fn history_with_amounts(amounts: &[f64]) -> SubjectHistory {
        let mut history = SubjectHistory::new("u");
        for a in amounts {
            history.transactions.push(TxnRecord {
                amount: *a,
                local_hour: 12,
                method: None,
                origin_id: None,
                outcome: TxnOutcome::Completed,
                at: Utc::now(),
            });
        }
        history
    }

    #[test]
    fn test_no_amount_scores_zero() {
        let factor =
            collect_amount_pattern(&EventContext::at_hour(12), None, None).unwrap();
        assert_eq!(factor.score, 0.0);
    }

    #[test]
    fn test_testing_amount_flagged() {
        let factor = collect_amount_pattern(&ctx(1.0), None, None).unwrap();
        assert_eq!(factor.score, 0.4);
        assert!(factor.evidence.contains_key("testing_amount"));
    }

    #[test]
    fn test_escalation_jump_flagged() {
        let history = history_with_amounts(&[5.0]);
        let factor = collect_amount_pattern(&ctx(500.0), None, Some(&history)).unwrap();
        assert!((factor.score - 0.4).abs() < 1e-9);
        assert!(factor.evidence.contains_key("escalation_from"));
    }

    #[test]
    fn test_no_escalation_below_factor() {
        let history = history_with_amounts(&[5.0]);
        let factor = collect_amount_pattern(&ctx(40.0), None, Some(&history)).unwrap();
        assert_eq!(factor.score, 0.0);
    }

    #[test]
    fn test_repetition_flagged() {
        let history = history_with_amounts(&[250.0, 250.0, 250.0]);
        let factor = collect_amount_pattern(&ctx(250.0), None, Some(&history)).unwrap();
        assert!((factor.score - 0.3).abs() < 1e-9);
        assert_eq!(factor.evidence["repeated_count"], serde_json::json!(3));
    }

    #[test]
    fn test_deviation_from_baseline() {
        let mut profile = BehaviorProfile::new("u");
        profile.avg_amount = 100.0;
        let factor = collect_amount_pattern(&ctx(600.0), Some(&profile), None).unwrap();
        assert!((factor.score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_combined_patterns_capped() {
        // Testing amount that also repeats, escalates, and deviates.
        let mut profile = BehaviorProfile::new("u");
        profile.avg_amount = 10.0;
        let history = history_with_amounts(&[5.0, 100.0, 100.0, 100.0]);
        let factor =
            collect_amount_pattern(&ctx(100.0), Some(&profile), Some(&history)).unwrap();
        assert_eq!(factor.score, 1.0);
    }

    #[test]
    fn test_very_large_amount_without_baseline() {
        let factor = collect_amount_pattern(&ctx(10_000.0), None, None).unwrap();
        assert!((factor.score - 0.5).abs() < 1e-9);
        assert!(factor.evidence.contains_key("large_without_baseline"));
    }

    #[test]
    fn test_large_amount_without_baseline() {
        let factor = collect_amount_pattern(&ctx(2_000.0), None, None).unwrap();
        assert!((factor.score - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_baseline_suppresses_magnitude_heuristic() {
        // A profile average exists, so only the deviation heuristic applies;
        // 10000 is within 5x of a 5000 average.
        let mut profile = BehaviorProfile::new("u");
        profile.avg_amount = 5_000.0;
        let factor = collect_amount_pattern(&ctx(10_000.0), Some(&profile), None).unwrap();
        assert_eq!(factor.score, 0.0);
    }

    #[test]
    fn test_negative_amount_is_error() {
        assert!(collect_amount_pattern(&ctx(-5.0), None, None).is_err());
    }
}
