//! Geographic signal: network-origin change velocity.
//!
//! Compares the current origin identifier to the most recently observed
//! one. Origin identity is a string comparison, not a geo-distance lookup;
//! the evidence map carries both origins and the observation gap so a
//! distance-banded upgrade has the inputs it needs.

use super::{EventContext, SignalError};
use crate::profile::SubjectHistory;
use crate::risk::{FactorKind, RiskFactor};
use chrono::Duration as ChronoDuration;

/// An origin change inside this window scores high.
const CHANGE_WINDOW_HOURS: i64 = 2;
/// Score for a rapid origin change.
const RAPID_CHANGE_SCORE: f64 = 0.7;
/// Score when there is no origin history to compare against.
const UNKNOWN_ORIGIN_SCORE: f64 = 0.3;

/// Scores the origin against the last stored observation.
pub fn collect_geographic(
    ctx: &EventContext,
    history: Option<&SubjectHistory>,
) -> Result<RiskFactor, SignalError> {
    let Some(current) = &ctx.origin_id else {
        return Ok(RiskFactor::new(FactorKind::Geographic, UNKNOWN_ORIGIN_SCORE)
            .with_evidence("no_origin", serde_json::json!(true)));
    };

    let last = history.and_then(|h| {
        h.last_origin
            .as_ref()
            .map(|origin| (origin.clone(), h.last_origin_at))
    });

    let (last_origin, last_seen_at) = match last {
        Some(pair) => pair,
        None => {
            return Ok(RiskFactor::new(FactorKind::Geographic, UNKNOWN_ORIGIN_SCORE)
                .with_evidence("current_origin", serde_json::json!(current))
                .with_evidence("first_observation", serde_json::json!(true)));
        }
    };

    if last_origin == *current {
        return Ok(RiskFactor::new(FactorKind::Geographic, 0.0)
            .with_evidence("current_origin", serde_json::json!(current)));
    }

    let gap_minutes = last_seen_at
        .map(|seen| (ctx.timestamp - seen).num_minutes())
        .unwrap_or(i64::MAX);
    let rapid = gap_minutes < ChronoDuration::hours(CHANGE_WINDOW_HOURS).num_minutes();
    let score = if rapid { RAPID_CHANGE_SCORE } else { UNKNOWN_ORIGIN_SCORE };

    Ok(RiskFactor::new(FactorKind::Geographic, score)
        .with_evidence("current_origin", serde_json::json!(current))
        .with_evidence("previous_origin", serde_json::json!(last_origin))
        .with_evidence("gap_minutes", serde_json::json!(gap_minutes))
        .with_evidence("rapid_change", serde_json::json!(rapid)))
}
