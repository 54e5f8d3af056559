//! Method-var classifier criteria.

use super::classifier::{Classifier, Criterion};
use super::level::MatchLevel;
use super::similarity::{count_similarity, position_similarity, span_overlap};
use crate::model::{MatchGraph, Side, VarId};

/// Build the var classifier (shared by arg and local passes).
#[must_use]
pub fn classifier() -> Classifier<VarId> {
    Classifier::new(
        "var",
        gate,
        vec![
            Criterion::new("type", 10.0, MatchLevel::Initial, type_check),
            Criterion::new("position", 4.0, MatchLevel::Initial, position),
            Criterion::new("lv slot", 2.0, MatchLevel::Intermediate, lv_slot),
            Criterion::new("stream ordinal", 2.0, MatchLevel::Intermediate, stream_ordinal),
            Criterion::new("live range", 4.0, MatchLevel::Full, live_range),
        ],
    )
}

fn gate(graph: &MatchGraph, a: VarId, b: VarId) -> bool {
    graph.vars_potentially_equal(a, b)
}

fn type_check(graph: &MatchGraph, a: VarId, b: VarId) -> f64 {
    if graph.opt_classes_potentially_equal(
        graph.side(Side::A).var(a).typ(),
        graph.side(Side::B).var(b).typ(),
    ) {
        1.0
    } else {
        0.0
    }
}

fn position(graph: &MatchGraph, a: VarId, b: VarId) -> f64 {
    let va = graph.side(Side::A).var(a);
    let vb = graph.side(Side::B).var(b);
    let count = |side: Side, v: &crate::model::VarEntity| {
        let method = graph.side(side).method(v.method());
        if v.is_arg() {
            method.args().len()
        } else {
            method.locals().len()
        }
    };
    position_similarity(va.index(), count(Side::A, va), vb.index(), count(Side::B, vb))
}

fn lv_slot(graph: &MatchGraph, a: VarId, b: VarId) -> f64 {
    count_similarity(
        graph.side(Side::A).var(a).lv_index() as usize,
        graph.side(Side::B).var(b).lv_index() as usize,
    )
}

fn stream_ordinal(graph: &MatchGraph, a: VarId, b: VarId) -> f64 {
    count_similarity(
        graph.side(Side::A).var(a).asm_index() as usize,
        graph.side(Side::B).var(b).asm_index() as usize,
    )
}

fn live_range(graph: &MatchGraph, a: VarId, b: VarId) -> f64 {
    let va = graph.side(Side::A).var(a);
    let vb = graph.side(Side::B).var(b);
    span_overlap(
        (va.start_insn(), va.end_insn()),
        (vb.start_insn(), vb.end_insn()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassDecl, MethodDecl, MethodId, VarDecl};

    fn method_pair(graph: &mut MatchGraph, args_a: Vec<VarDecl>, args_b: Vec<VarDecl>) -> (MethodId, MethodId) {
        let ca = graph.add_class(Side::A, ClassDecl::input("La;", "a")).unwrap();
        let cb = graph.add_class(Side::B, ClassDecl::input("Lb;", "b")).unwrap();
        graph.set_class_match(Side::A, ca, Some(cb));
        graph.set_class_match(Side::B, cb, Some(ca));
        let ma = graph.add_method(Side::A, ca, MethodDecl::new("m", "(II)V").with_args(args_a)).unwrap();
        let mb = graph.add_method(Side::B, cb, MethodDecl::new("p", "(II)V").with_args(args_b)).unwrap();
        graph.set_method_match(Side::A, ma, Some(mb));
        graph.set_method_match(Side::B, mb, Some(ma));
        (ma, mb)
    }

    #[test]
    fn test_same_slot_and_range_ranks_first() {
        let mut graph = MatchGraph::new();
        let (ma, mb) = method_pair(
            &mut graph,
            vec![VarDecl::new("a0").with_slot(1).with_range(0, 10)],
            vec![
                VarDecl::new("b0").with_slot(1).with_range(0, 10),
                VarDecl::new("b1").with_slot(7).with_range(20, 24),
            ],
        );
        let subject = graph.side(Side::A).method(ma).args()[0];
        let candidates: Vec<VarId> = graph.side(Side::B).method(mb).args().to_vec();

        let classifier = classifier();
        let ranking = classifier.rank(&graph, subject, &candidates, MatchLevel::Full, f64::MAX);
        assert_eq!(ranking[0].candidate, candidates[0]);
        assert!(ranking[0].score > ranking[1].score);
    }

    #[test]
    fn test_gate_rejects_arg_local_mix() {
        let mut graph = MatchGraph::new();
        let ca = graph.add_class(Side::A, ClassDecl::input("La;", "a")).unwrap();
        let cb = graph.add_class(Side::B, ClassDecl::input("Lb;", "b")).unwrap();
        graph.set_class_match(Side::A, ca, Some(cb));
        graph.set_class_match(Side::B, cb, Some(ca));
        let ma = graph.add_method(
            Side::A,
            ca,
            MethodDecl::new("m", "(I)V").with_args(vec![VarDecl::new("a0")]),
        )
        .unwrap();
        let mb = graph.add_method(
            Side::B,
            cb,
            MethodDecl::new("p", "(I)V").with_locals(vec![VarDecl::new("l0")]),
        )
        .unwrap();
        let va = graph.side(Side::A).method(ma).args()[0];
        let vl = graph.side(Side::B).method(mb).locals()[0];
        assert!(!gate(&graph, va, vl));
    }
}
