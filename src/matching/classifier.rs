//! Weighted-criterion classifier composition.
//!
//! A classifier scores one subject against many candidates. Scoring walks
//! the enabled criteria, accumulating both the raw score and the running
//! mismatch (lost weight); candidates whose mismatch exceeds the caller's
//! budget are pruned mid-scoring.

use super::level::MatchLevel;
use crate::model::MatchGraph;

/// One scoring criterion: a pure, symmetric function of a subject/candidate
/// pair over the entity graph, returning a value in [0, 1].
pub(crate) struct Criterion<I> {
    pub name: &'static str,
    pub weight: f64,
    pub min_level: MatchLevel,
    pub eval: fn(&MatchGraph, I, I) -> f64,
}

impl<I> Criterion<I> {
    pub(crate) const fn new(
        name: &'static str,
        weight: f64,
        min_level: MatchLevel,
        eval: fn(&MatchGraph, I, I) -> f64,
    ) -> Self {
        Self {
            name,
            weight,
            min_level,
            eval,
        }
    }
}

/// A scored candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankResult<I> {
    pub candidate: I,
    /// Raw (unnormalized) score: the sum of earned criterion weights.
    pub score: f64,
}

/// Per-kind classifier: a gate plus a weighted criterion list.
///
/// The gate is the potential-equality check; candidates failing it are
/// rejected before any criterion runs.
pub struct Classifier<I> {
    kind: &'static str,
    gate: fn(&MatchGraph, I, I) -> bool,
    criteria: Vec<Criterion<I>>,
}

impl<I: Copy> Classifier<I> {
    pub(crate) fn new(
        kind: &'static str,
        gate: fn(&MatchGraph, I, I) -> bool,
        criteria: Vec<Criterion<I>>,
    ) -> Self {
        Self {
            kind,
            gate,
            criteria,
        }
    }

    /// Entity kind this classifier scores, for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    /// Sum of weights of all criteria enabled at `level`.
    #[must_use]
    pub fn max_score(&self, level: MatchLevel) -> f64 {
        self.criteria
            .iter()
            .filter(|c| level >= c.min_level)
            .map(|c| c.weight)
            .sum()
    }

    /// Score `subject` against every candidate, descending by raw score.
    ///
    /// A candidate is dropped as soon as its accumulated mismatch
    /// (`max_score` minus the partial score) exceeds `max_mismatch`.
    #[must_use]
    pub fn rank(
        &self,
        graph: &MatchGraph,
        subject: I,
        candidates: &[I],
        level: MatchLevel,
        max_mismatch: f64,
    ) -> Vec<RankResult<I>> {
        let enabled: Vec<&Criterion<I>> = self
            .criteria
            .iter()
            .filter(|c| level >= c.min_level)
            .collect();

        let mut results = Vec::new();
        'candidates: for &candidate in candidates {
            if !(self.gate)(graph, subject, candidate) {
                continue;
            }
            let mut score = 0.0;
            let mut mismatch = 0.0;
            for criterion in &enabled {
                let value = (criterion.eval)(graph, subject, candidate).clamp(0.0, 1.0);
                score += value * criterion.weight;
                mismatch += (1.0 - value) * criterion.weight;
                if mismatch > max_mismatch {
                    continue 'candidates;
                }
            }
            results.push(RankResult { candidate, score });
        }

        results.sort_by(|x, y| y.score.total_cmp(&x.score));
        results
    }

    /// Human-readable per-criterion breakdown for one pair, for debugging
    /// match decisions.
    #[must_use]
    pub fn explain(&self, graph: &MatchGraph, subject: I, candidate: I, level: MatchLevel) -> String {
        if !(self.gate)(graph, subject, candidate) {
            return format!("{}: rejected by potential-equality gate", self.kind);
        }
        let mut lines = vec![format!("{} (level {level}):", self.kind)];
        let mut total = 0.0;
        for criterion in self.criteria.iter().filter(|c| level >= c.min_level) {
            let value = (criterion.eval)(graph, subject, candidate).clamp(0.0, 1.0);
            total += value * criterion.weight;
            lines.push(format!(
                "  - {}: {:.2} x {:.1} = {:.2}",
                criterion.name,
                value,
                criterion.weight,
                value * criterion.weight
            ));
        }
        lines.push(format!(
            "  total {total:.2} / {:.2}",
            self.max_score(level)
        ));
        lines.join("\n")
    }
}
