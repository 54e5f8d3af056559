//! Method classifier criteria.

use super::classifier::{Classifier, Criterion};
use super::level::MatchLevel;
use super::similarity::{
    count_similarity, histogram_overlap, method_opcode_histogram, method_opcodes, method_strings,
    opcode_similarity, position_similarity, set_jaccard,
};
use crate::model::{MatchGraph, MethodId, Side};

/// Build the method classifier.
#[must_use]
pub fn classifier() -> Classifier<MethodId> {
    Classifier::new(
        "method",
        gate,
        vec![
            Criterion::new("signature", 10.0, MatchLevel::Initial, signature_check),
            Criterion::new("arg count", 3.0, MatchLevel::Initial, arg_count),
            Criterion::new("class position", 2.0, MatchLevel::Initial, class_position),
            Criterion::new("instruction count", 3.0, MatchLevel::Intermediate, insn_count),
            Criterion::new("opcode profile", 4.0, MatchLevel::Intermediate, opcode_profile),
            Criterion::new("string constants", 6.0, MatchLevel::Intermediate, string_constants),
            Criterion::new("instruction sequence", 10.0, MatchLevel::Full, insn_sequence),
            Criterion::new("hierarchy agreement", 8.0, MatchLevel::Extra, hierarchy_agreement),
        ],
    )
}

fn gate(graph: &MatchGraph, a: MethodId, b: MethodId) -> bool {
    graph.methods_potentially_equal(a, b)
}

fn signature_check(graph: &MatchGraph, a: MethodId, b: MethodId) -> f64 {
    let ma = graph.side(Side::A).method(a);
    let mb = graph.side(Side::B).method(b);
    let mut score = 0.0;
    let mut parts = 2.0;
    if graph.opt_classes_potentially_equal(ma.ret(), mb.ret()) {
        score += 1.0;
    }
    if ma.args().len() == mb.args().len() {
        score += 1.0;
        if !ma.args().is_empty() {
            parts += 1.0;
            let compatible = ma
                .args()
                .iter()
                .zip(mb.args())
                .filter(|&(&va, &vb)| {
                    graph.opt_classes_potentially_equal(
                        graph.side(Side::A).var(va).typ(),
                        graph.side(Side::B).var(vb).typ(),
                    )
                })
                .count();
            score += compatible as f64 / ma.args().len() as f64;
        }
    }
    score / parts
}

fn arg_count(graph: &MatchGraph, a: MethodId, b: MethodId) -> f64 {
    count_similarity(
        graph.side(Side::A).method(a).args().len(),
        graph.side(Side::B).method(b).args().len(),
    )
}

fn class_position(graph: &MatchGraph, a: MethodId, b: MethodId) -> f64 {
    let ma = graph.side(Side::A).method(a);
    let mb = graph.side(Side::B).method(b);
    position_similarity(
        ma.position(),
        graph.side(Side::A).class(ma.class()).methods().len(),
        mb.position(),
        graph.side(Side::B).class(mb.class()).methods().len(),
    )
}

fn insn_count(graph: &MatchGraph, a: MethodId, b: MethodId) -> f64 {
    count_similarity(
        graph.side(Side::A).method(a).insns().len(),
        graph.side(Side::B).method(b).insns().len(),
    )
}

fn opcode_profile(graph: &MatchGraph, a: MethodId, b: MethodId) -> f64 {
    let hist_a = method_opcode_histogram(graph, Side::A, a);
    let hist_b = method_opcode_histogram(graph, Side::B, b);
    histogram_overlap(&hist_a, &hist_b)
}

fn string_constants(graph: &MatchGraph, a: MethodId, b: MethodId) -> f64 {
    let strings_a = method_strings(graph, Side::A, a);
    let strings_b = method_strings(graph, Side::B, b);
    set_jaccard(&strings_a, &strings_b)
}

fn insn_sequence(graph: &MatchGraph, a: MethodId, b: MethodId) -> f64 {
    let ops_a = method_opcodes(graph, Side::A, a);
    let ops_b = method_opcodes(graph, Side::B, b);
    opcode_similarity(&ops_a, &ops_b)
}

/// Agreement with already-matched hierarchy siblings: their peers must sit in
/// the candidate's hierarchy set. No matched sibling means no evidence.
fn hierarchy_agreement(graph: &MatchGraph, a: MethodId, b: MethodId) -> f64 {
    let ma = graph.side(Side::A).method(a);
    let mb = graph.side(Side::B).method(b);
    let mut considered = 0usize;
    let mut agreeing = 0usize;
    for &sibling in ma.hierarchy() {
        if sibling == a {
            continue;
        }
        if let Some(peer) = graph.side(Side::A).method(sibling).matched() {
            considered += 1;
            if mb.hierarchy().contains(&peer) {
                agreeing += 1;
            }
        }
    }
    if considered == 0 {
        1.0
    } else {
        agreeing as f64 / considered as f64
    }
}
