//! Property tests for score normalization and similarity metrics.

use classmatch::matching::similarity::{compare_insns, count_similarity, opcode_similarity};
use classmatch::model::Insn;
use classmatch::{check_rank, normalized_score, raw_from_score, RankResult};
use proptest::prelude::*;

proptest! {
    /// getScore(rawFromScore(s, M), M) = s for s, M in [0, 1].
    #[test]
    fn normalization_roundtrip(score in 0.0f64..=1.0, max_score in 0.01f64..=100.0) {
        let raw = raw_from_score(score, max_score);
        let back = normalized_score(raw, max_score);
        prop_assert!((back - score).abs() < 1e-9);
    }

    #[test]
    fn normalized_score_stays_in_unit_range(raw in 0.0f64..=200.0, max_score in 0.01f64..=100.0) {
        let normalized = normalized_score(raw, max_score);
        prop_assert!((0.0..=1.0).contains(&normalized));
    }

    /// Squaring only ever pushes scores down.
    #[test]
    fn normalization_is_contractive(raw in 0.0f64..=100.0, max_score in 0.01f64..=100.0) {
        let ratio = (raw / max_score).clamp(0.0, 1.0);
        prop_assert!(normalized_score(raw, max_score) <= ratio + 1e-12);
    }

    /// Widening the gap to the runner-up never turns acceptance into
    /// rejection.
    #[test]
    fn check_rank_monotonic_in_runner_up(
        top in 0.0f64..=10.0,
        second in 0.0f64..=10.0,
        shrink in 0.0f64..=1.0,
    ) {
        let second = second.min(top);
        let ranking = [
            RankResult { candidate: 0u32, score: top },
            RankResult { candidate: 1u32, score: second },
        ];
        let shrunk = [
            RankResult { candidate: 0u32, score: top },
            RankResult { candidate: 1u32, score: second * shrink },
        ];
        let (abs, rel, max) = (0.85, 0.085, 10.0);
        if check_rank(&ranking, abs, rel, max) {
            prop_assert!(check_rank(&shrunk, abs, rel, max));
        }
    }

    #[test]
    fn opcode_similarity_is_symmetric(a in proptest::collection::vec(any::<u8>(), 0..40),
                                      b in proptest::collection::vec(any::<u8>(), 0..40)) {
        let forward = opcode_similarity(&a, &b);
        let backward = opcode_similarity(&b, &a);
        prop_assert!((forward - backward).abs() < 1e-12);
        prop_assert!((0.0..=1.0).contains(&forward));
    }

    #[test]
    fn identical_streams_score_one(ops in proptest::collection::vec(any::<u8>(), 0..60)) {
        let insns: Vec<Insn> = ops.iter().map(|&op| Insn::simple(op)).collect();
        prop_assert_eq!(compare_insns(&insns, &insns), 1.0);
    }

    #[test]
    fn count_similarity_in_range_and_symmetric(a in 0usize..10_000, b in 0usize..10_000) {
        let s = count_similarity(a, b);
        prop_assert!((0.0..=1.0).contains(&s));
        prop_assert!((s - count_similarity(b, a)).abs() < 1e-12);
        if a == b {
            prop_assert_eq!(s, 1.0);
        }
    }
}
