//! Class classifier criteria.

use super::classifier::{Classifier, Criterion};
use super::level::MatchLevel;
use super::similarity::{
    class_erased_descs, class_insn_total, class_opcode_histogram, class_strings, count_similarity,
    erase_desc, histogram_overlap, multiset_overlap, set_jaccard,
};
use crate::model::{ClassId, MatchGraph, Side};

/// Build the class classifier.
#[must_use]
pub fn classifier() -> Classifier<ClassId> {
    Classifier::new(
        "class",
        gate,
        vec![
            Criterion::new("type shape", 8.0, MatchLevel::Initial, type_shape),
            Criterion::new("superclass", 4.0, MatchLevel::Initial, superclass_check),
            Criterion::new("interfaces", 3.0, MatchLevel::Initial, interface_overlap),
            Criterion::new("hierarchy depth", 1.0, MatchLevel::Initial, hierarchy_depth),
            Criterion::new("method count", 3.0, MatchLevel::Initial, method_count),
            Criterion::new("field count", 3.0, MatchLevel::Initial, field_count),
            Criterion::new("string constants", 8.0, MatchLevel::Intermediate, string_constants),
            Criterion::new("member descriptors", 5.0, MatchLevel::Intermediate, member_descriptors),
            Criterion::new("instruction total", 3.0, MatchLevel::Intermediate, insn_total),
            Criterion::new("opcode profile", 6.0, MatchLevel::Full, opcode_profile),
            Criterion::new("member similarity", 10.0, MatchLevel::Extra, member_similarity),
        ],
    )
}

fn gate(graph: &MatchGraph, a: ClassId, b: ClassId) -> bool {
    graph.classes_potentially_equal(a, b)
}

fn type_shape(graph: &MatchGraph, a: ClassId, b: ClassId) -> f64 {
    let ca = graph.side(Side::A).class(a);
    let cb = graph.side(Side::B).class(b);
    let mut score = 0.0;
    let mut parts = 1.0;
    if ca.is_input() == cb.is_input() {
        score += 1.0;
    }
    if ca.is_array() {
        parts += 1.0;
        if graph.opt_classes_potentially_equal(ca.element(), cb.element()) {
            score += 1.0;
        }
    }
    score / parts
}

fn superclass_check(graph: &MatchGraph, a: ClassId, b: ClassId) -> f64 {
    let sup_a = graph.side(Side::A).class(a).superclass();
    let sup_b = graph.side(Side::B).class(b).superclass();
    if graph.opt_classes_potentially_equal(sup_a, sup_b) {
        1.0
    } else {
        0.0
    }
}

fn interface_overlap(graph: &MatchGraph, a: ClassId, b: ClassId) -> f64 {
    let ifaces_a = graph.side(Side::A).class(a).interfaces();
    let ifaces_b = graph.side(Side::B).class(b).interfaces();
    if ifaces_a.is_empty() && ifaces_b.is_empty() {
        return 1.0;
    }
    // Greedy one-to-one pairing over potential equality; interface lists are
    // short enough that the quadratic sweep does not matter.
    let mut used = vec![false; ifaces_b.len()];
    let mut intersection = 0usize;
    for &ia in ifaces_a {
        for (j, &ib) in ifaces_b.iter().enumerate() {
            if !used[j] && graph.classes_potentially_equal(ia, ib) {
                used[j] = true;
                intersection += 1;
                break;
            }
        }
    }
    let union = ifaces_a.len() + ifaces_b.len() - intersection;
    intersection as f64 / union as f64
}

fn hierarchy_depth(graph: &MatchGraph, a: ClassId, b: ClassId) -> f64 {
    count_similarity(
        graph.side(Side::A).hierarchy_depth(a),
        graph.side(Side::B).hierarchy_depth(b),
    )
}

fn method_count(graph: &MatchGraph, a: ClassId, b: ClassId) -> f64 {
    let real = |side: Side, c: ClassId| {
        let set = graph.side(side);
        set.class(c)
            .methods()
            .iter()
            .filter(|&&m| set.method(m).is_real())
            .count()
    };
    count_similarity(real(Side::A, a), real(Side::B, b))
}

fn field_count(graph: &MatchGraph, a: ClassId, b: ClassId) -> f64 {
    let real = |side: Side, c: ClassId| {
        let set = graph.side(side);
        set.class(c)
            .fields()
            .iter()
            .filter(|&&f| set.field(f).is_real())
            .count()
    };
    count_similarity(real(Side::A, a), real(Side::B, b))
}

fn string_constants(graph: &MatchGraph, a: ClassId, b: ClassId) -> f64 {
    let strings_a = class_strings(graph, Side::A, a);
    let strings_b = class_strings(graph, Side::B, b);
    set_jaccard(&strings_a, &strings_b)
}

fn member_descriptors(graph: &MatchGraph, a: ClassId, b: ClassId) -> f64 {
    let descs_a = class_erased_descs(graph, Side::A, a);
    let descs_b = class_erased_descs(graph, Side::B, b);
    multiset_overlap(&descs_a, &descs_b)
}

fn insn_total(graph: &MatchGraph, a: ClassId, b: ClassId) -> f64 {
    count_similarity(
        class_insn_total(graph, Side::A, a),
        class_insn_total(graph, Side::B, b),
    )
}

fn opcode_profile(graph: &MatchGraph, a: ClassId, b: ClassId) -> f64 {
    let hist_a = class_opcode_histogram(graph, Side::A, a);
    let hist_b = class_opcode_histogram(graph, Side::B, b);
    histogram_overlap(&hist_a, &hist_b)
}

/// Best-pairing average of cheap per-method similarity, the expensive
/// tie-breaker reserved for the Extra level.
fn member_similarity(graph: &MatchGraph, a: ClassId, b: ClassId) -> f64 {
    let set_a = graph.side(Side::A);
    let set_b = graph.side(Side::B);
    let methods_a: Vec<_> = set_a
        .class(a)
        .methods()
        .iter()
        .copied()
        .filter(|&m| set_a.method(m).is_real())
        .collect();
    let methods_b: Vec<_> = set_b
        .class(b)
        .methods()
        .iter()
        .copied()
        .filter(|&m| set_b.method(m).is_real())
        .collect();
    if methods_a.is_empty() && methods_b.is_empty() {
        return 1.0;
    }
    if methods_a.is_empty() || methods_b.is_empty() {
        return 0.0;
    }

    let total: f64 = methods_a
        .iter()
        .map(|&ma| {
            let mea = set_a.method(ma);
            let desc_a = erase_desc(mea.desc());
            methods_b
                .iter()
                .map(|&mb| {
                    let meb = set_b.method(mb);
                    let shape = if desc_a == erase_desc(meb.desc()) { 0.5 } else { 0.0 };
                    shape + 0.5 * count_similarity(mea.insns().len(), meb.insns().len())
                })
                .fold(0.0, f64::max)
        })
        .sum();
    total / methods_a.len() as f64
}
