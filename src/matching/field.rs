//! Field classifier criteria.

use super::classifier::{Classifier, Criterion};
use super::level::MatchLevel;
use super::similarity::{erase_desc, position_similarity};
use crate::model::{FieldId, MatchGraph, Side};

/// Build the field classifier.
#[must_use]
pub fn classifier() -> Classifier<FieldId> {
    Classifier::new(
        "field",
        gate,
        vec![
            Criterion::new("type", 10.0, MatchLevel::Initial, type_check),
            Criterion::new("class position", 3.0, MatchLevel::Initial, class_position),
            Criterion::new("descriptor shape", 4.0, MatchLevel::Intermediate, descriptor_shape),
            Criterion::new("sibling order", 4.0, MatchLevel::Extra, sibling_order),
        ],
    )
}

fn gate(graph: &MatchGraph, a: FieldId, b: FieldId) -> bool {
    graph.fields_potentially_equal(a, b)
}

fn type_check(graph: &MatchGraph, a: FieldId, b: FieldId) -> f64 {
    let typ_a = graph.side(Side::A).field(a).typ();
    let typ_b = graph.side(Side::B).field(b).typ();
    if graph.opt_classes_potentially_equal(typ_a, typ_b) {
        1.0
    } else {
        0.0
    }
}

fn class_position(graph: &MatchGraph, a: FieldId, b: FieldId) -> f64 {
    let fa = graph.side(Side::A).field(a);
    let fb = graph.side(Side::B).field(b);
    position_similarity(
        fa.position(),
        graph.side(Side::A).class(fa.class()).fields().len(),
        fb.position(),
        graph.side(Side::B).class(fb.class()).fields().len(),
    )
}

fn descriptor_shape(graph: &MatchGraph, a: FieldId, b: FieldId) -> f64 {
    let desc_a = erase_desc(graph.side(Side::A).field(a).desc());
    let desc_b = erase_desc(graph.side(Side::B).field(b).desc());
    if desc_a == desc_b { 1.0 } else { 0.0 }
}

/// Relative-order preservation against already-matched sibling fields.
fn sibling_order(graph: &MatchGraph, a: FieldId, b: FieldId) -> f64 {
    let set_a = graph.side(Side::A);
    let set_b = graph.side(Side::B);
    let fa = set_a.field(a);
    let fb = set_b.field(b);
    let mut considered = 0usize;
    let mut preserved = 0usize;
    for &sibling in set_a.class(fa.class()).fields() {
        if sibling == a {
            continue;
        }
        let fs = set_a.field(sibling);
        if let Some(peer) = fs.matched() {
            let fp = set_b.field(peer);
            if fp.class() != fb.class() {
                continue;
            }
            considered += 1;
            if (fs.position() < fa.position()) == (fp.position() < fb.position()) {
                preserved += 1;
            }
        }
    }
    if considered == 0 {
        1.0
    } else {
        preserved as f64 / considered as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassDecl, ClassId, FieldDecl};

    fn class_pair(graph: &mut MatchGraph) -> (ClassId, ClassId) {
        let a = graph.add_class(Side::A, ClassDecl::input("La;", "a")).unwrap();
        let b = graph.add_class(Side::B, ClassDecl::input("Lb;", "b")).unwrap();
        graph.set_class_match(Side::A, a, Some(b));
        graph.set_class_match(Side::B, b, Some(a));
        (a, b)
    }

    #[test]
    fn test_descriptor_shape_discriminates() {
        let mut graph = MatchGraph::new();
        let (ca, cb) = class_pair(&mut graph);
        let subject = graph.add_field(Side::A, ca, FieldDecl::new("f", "La/x;")).unwrap();
        let same_shape = graph.add_field(Side::B, cb, FieldDecl::new("g", "Lb/y;")).unwrap();
        let primitive = graph.add_field(Side::B, cb, FieldDecl::new("h", "I")).unwrap();

        assert_eq!(descriptor_shape(&graph, subject, same_shape), 1.0);
        assert_eq!(descriptor_shape(&graph, subject, primitive), 0.0);
    }

    #[test]
    fn test_rank_prefers_same_position() {
        let mut graph = MatchGraph::new();
        let (ca, cb) = class_pair(&mut graph);
        let subject = graph.add_field(Side::A, ca, FieldDecl::new("f0", "I")).unwrap();
        graph.add_field(Side::A, ca, FieldDecl::new("f1", "J")).unwrap();
        let first = graph.add_field(Side::B, cb, FieldDecl::new("g0", "I")).unwrap();
        let second = graph.add_field(Side::B, cb, FieldDecl::new("g1", "J")).unwrap();

        let classifier = classifier();
        let ranking = classifier.rank(
            &graph,
            subject,
            &[second, first],
            MatchLevel::Intermediate,
            f64::MAX,
        );
        assert_eq!(ranking[0].candidate, first);
    }
}
