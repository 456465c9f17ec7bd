//! Historical signal: account track record.
//!
//! Failure rate over the last seven days, repeated refunds, and
//! new-account bonus risk. Additive, capped at 1.0.

use super::SignalError;
use crate::profile::SubjectHistory;
use crate::risk::{FactorKind, RiskFactor};

const FAILURE_WINDOW_DAYS: i64 = 7;
const REFUND_THRESHOLD: usize = 2;

/// Scores the subject's transaction history.
pub fn collect_historical(
    history: Option<&SubjectHistory>,
) -> Result<RiskFactor, SignalError> {
    let Some(history) = history else {
        // A subject with no history at all is indistinguishable from a
        // brand-new account.
        return Ok(RiskFactor::new(FactorKind::Historical, 0.5)
            .with_evidence("no_history", serde_json::json!(true)));
    };

    let mut score: f64 = 0.0;
    let mut factor = RiskFactor::new(FactorKind::Historical, 0.0);

    if let Some(rate) = history.failure_rate(FAILURE_WINDOW_DAYS) {
        if rate > 0.5 {
            score += 0.6;
        } else if rate > 0.3 {
            score += 0.3;
        }
        factor = factor.with_evidence("failure_rate_7d", serde_json::json!(rate));
    }

    let refunds = history.refund_count();
    if refunds > REFUND_THRESHOLD {
        score += 0.4;
        factor = factor.with_evidence("refund_count", serde_json::json!(refunds));
    }

    let age_days = history.account_age_days();
    if age_days < 1 {
        score += 0.5;
    } else if age_days < 7 {
        score += 0.3;
    }
    factor = factor.with_evidence("account_age_days", serde_json::json!(age_days));

    factor.score = score.min(1.0);
    Ok(factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{TxnOutcome, TxnRecord};
    use chrono::{Duration as ChronoDuration, Utc};

    fn aged_history(days: i64) -> SubjectHistory {
        let mut history = SubjectHistory::new("u");
        history.account_created_at = Utc::now() - ChronoDuration::days(days);
        history
    }

    fn push_txn(history: &mut SubjectHistory, outcome: TxnOutcome) {
        history.transactions.push(TxnRecord {
            amount: 20.0,
            local_hour: 12,
            method: None,
            origin_id: None,
            outcome,
            at: Utc::now(),
        });
    }

    #[test]
    fn test_no_history_is_neutral() {
        let factor = collect_historical(None).unwrap();
        assert_eq!(factor.score, 0.5);
    }

    #[test]
    fn test_established_clean_account_scores_zero() {
        let mut history = aged_history(90);
        push_txn(&mut history, TxnOutcome::Completed);
        push_txn(&mut history, TxnOutcome::Completed);
        let factor = collect_historical(Some(&history)).unwrap();
        assert_eq!(factor.score, 0.0);
    }

    #[test]
    fn test_brand_new_account() {
        let history = aged_history(0);
        let factor = collect_historical(Some(&history)).unwrap();
        assert!((factor.score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_week_old_account() {
        let history = aged_history(3);
        let factor = collect_historical(Some(&history)).unwrap();
        assert!((factor.score - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_high_failure_rate() {
        let mut history = aged_history(60);
        push_txn(&mut history, TxnOutcome::Failed);
        push_txn(&mut history, TxnOutcome::Failed);
        push_txn(&mut history, TxnOutcome::Completed);
        let factor = collect_historical(Some(&history)).unwrap();
        // 2/3 failure rate > 0.5
        assert!((factor.score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_moderate_failure_rate() {
        let mut history = aged_history(60);
        push_txn(&mut history, TxnOutcome::Failed);
        push_txn(&mut history, TxnOutcome::Completed);
        push_txn(&mut history, TxnOutcome::Completed);
        let factor = collect_historical(Some(&history)).unwrap();
        // 1/3 failure rate: > 0.3, <= 0.5
        assert!((factor.score - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_repeated_refunds() {
        let mut history = aged_history(60);
        push_txn(&mut history, TxnOutcome::Refunded);
        push_txn(&mut history, TxnOutcome::Refunded);
        push_txn(&mut history, TxnOutcome::Refunded);
        // 3 refunds of 3 txns also means 0% failure rate.
        let factor = collect_historical(Some(&history)).unwrap();
        assert!((factor.score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_everything_bad_caps_at_one() {
        let mut history = aged_history(0);
        for _ in 0..4 {
            push_txn(&mut history, TxnOutcome::Failed);
        }
        for _ in 0..3 {
            push_txn(&mut history, TxnOutcome::Refunded);
        }
        let factor = collect_historical(Some(&history)).unwrap();
        assert_eq!(factor.score, 1.0);
    }
}
