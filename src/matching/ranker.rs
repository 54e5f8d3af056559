//! Rank acceptance checks and score normalization.
//!
//! Raw scores are sums of earned criterion weights; normalization squares the
//! ratio to the maximum so that the gap between "good" and "barely good"
//! pairings widens before thresholds apply.

use super::classifier::RankResult;

/// Normalize a raw score against the classifier maximum: `(raw / max)²`.
#[must_use]
pub fn normalized_score(raw: f64, max_score: f64) -> f64 {
    if max_score <= 0.0 {
        return 0.0;
    }
    let ratio = (raw / max_score).clamp(0.0, 1.0);
    ratio * ratio
}

/// Inverse of [`normalized_score`]: the raw score that normalizes to `score`.
#[must_use]
pub fn raw_from_score(score: f64, max_score: f64) -> f64 {
    score.max(0.0).sqrt() * max_score
}

/// Mismatch budget for one pass: how much weight a candidate may lose before
/// it can no longer reach the acceptance threshold.
#[must_use]
pub fn mismatch_budget(abs_threshold: f64, rel_threshold: f64, max_score: f64) -> f64 {
    max_score - raw_from_score(abs_threshold * (1.0 - rel_threshold), max_score)
}

/// Decide whether a ranking is confident enough to commit its top result.
///
/// Accepts iff the top normalized score reaches `abs_threshold` and, when a
/// runner-up exists, the runner-up stays below `top · (1 − rel_threshold)`.
#[must_use]
pub fn check_rank<I>(
    ranking: &[RankResult<I>],
    abs_threshold: f64,
    rel_threshold: f64,
    max_score: f64,
) -> bool {
    let Some(top) = ranking.first() else {
        return false;
    };
    let top_score = normalized_score(top.score, max_score);
    if top_score < abs_threshold {
        return false;
    }
    match ranking.get(1) {
        None => true,
        Some(second) => normalized_score(second.score, max_score) < top_score * (1.0 - rel_threshold),
    }
}
