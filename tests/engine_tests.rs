//! End-to-end tests for the matching engine.

use classmatch::engine::ignore_progress;
use classmatch::model::{
    CacheKey, ClassDecl, ClassId, FieldDecl, Insn, MatchGraph, MethodDecl, VarDecl,
};
use classmatch::{MatchEngine, MatchLevel, Side};
use std::collections::HashSet;

/// A class with two methods (one string-heavy, one arithmetic with args) and
/// two fields. `strings` and `filler` differentiate classes from each other;
/// twins across sides share both.
fn add_populated_class(
    graph: &mut MatchGraph,
    side: Side,
    name: &str,
    strings: &[&str],
    filler: usize,
) -> ClassId {
    let cls = graph
        .add_class(side, ClassDecl::input(format!("L{name};"), name))
        .expect("fresh class id");

    let insns: Vec<Insn> = strings
        .iter()
        .map(|s| Insn::ldc_str(0x12, *s))
        .chain(std::iter::repeat(Insn::simple(0x04)).take(filler))
        .chain([Insn::simple(0xb1)])
        .collect();
    graph.add_method(side, cls, MethodDecl::new("m0", "()V").with_insns(insns)).expect("member");

    graph.add_method(
        side,
        cls,
        MethodDecl::new("m1", "(II)I")
            .with_insns(vec![
                Insn::var(0x15, 1),
                Insn::var(0x15, 2),
                Insn::simple(0x60),
                Insn::simple(0xac),
            ])
            .with_args(vec![
                VarDecl::new("x").with_slot(1).with_range(0, 4),
                VarDecl {
                    asm_index: 5,
                    ..VarDecl::new("y").with_slot(2).with_range(0, 4)
                },
            ]),
    )
    .expect("member");

    graph.add_field(side, cls, FieldDecl::new("f0", "I")).expect("member");
    graph.add_field(side, cls, FieldDecl::new("f1", "J")).expect("member");
    cls
}

/// Check the hard invariants that must hold after every public operation.
fn assert_invariants(graph: &MatchGraph) {
    let set_a = graph.side(Side::A);
    let set_b = graph.side(Side::B);

    let mut class_peers = HashSet::new();
    for c in set_a.class_ids() {
        if let Some(peer) = set_a.class(c).matched() {
            assert_eq!(set_b.class(peer).matched(), Some(c), "class link symmetry");
            assert_eq!(
                set_a.class(c).array_dims(),
                set_b.class(peer).array_dims(),
                "matched classes agree on array dims"
            );
            assert!(class_peers.insert(peer), "peer class claimed twice");
        }
    }

    let mut method_peers = HashSet::new();
    for m in set_a.method_ids() {
        if let Some(peer) = set_a.method(m).matched() {
            assert_eq!(set_b.method(peer).matched(), Some(m), "method link symmetry");
            assert_eq!(
                set_a.class(set_a.method(m).class()).matched(),
                Some(set_b.method(peer).class()),
                "matched methods live in matched classes"
            );
            assert!(method_peers.insert(peer), "peer method claimed twice");
        }
    }

    let mut field_peers = HashSet::new();
    for f in set_a.field_ids() {
        if let Some(peer) = set_a.field(f).matched() {
            assert_eq!(set_b.field(peer).matched(), Some(f), "field link symmetry");
            assert_eq!(
                set_a.class(set_a.field(f).class()).matched(),
                Some(set_b.field(peer).class()),
                "matched fields live in matched classes"
            );
            assert!(field_peers.insert(peer), "peer field claimed twice");
        }
    }

    let mut var_peers = HashSet::new();
    for v in set_a.var_ids() {
        if let Some(peer) = set_a.var(v).matched() {
            assert_eq!(set_b.var(peer).matched(), Some(v), "var link symmetry");
            assert_eq!(
                set_a.method(set_a.var(v).method()).matched(),
                Some(set_b.var(peer).method()),
                "matched vars live in matched methods"
            );
            assert_eq!(set_a.var(v).kind(), set_b.var(peer).kind(), "var kinds agree");
            assert!(var_peers.insert(peer), "peer var claimed twice");
        }
    }
}

// ============================================================================
// Scenario 1: trivial unobfuscated match
// ============================================================================

#[test]
fn trivial_pass_matches_identical_unobfuscated_ids() {
    let mut graph = MatchGraph::new();
    graph
        .add_class(Side::A, ClassDecl::input("Lfoo;", "foo").not_obfuscated())
        .expect("class");
    graph
        .add_class(Side::B, ClassDecl::input("Lfoo;", "foo").not_obfuscated())
        .expect("class");

    let mut engine = MatchEngine::new(graph);
    assert!(engine.match_trivial().expect("trivial pass"));

    let status = engine.status(true);
    assert_eq!(status.classes_matched, 1);
    assert_invariants(engine.graph());
}

#[test]
fn trivial_pass_skips_obfuscated_names() {
    let mut graph = MatchGraph::new();
    graph.add_class(Side::A, ClassDecl::input("La;", "a")).expect("class");
    graph.add_class(Side::B, ClassDecl::input("La;", "a")).expect("class");

    let mut engine = MatchEngine::new(graph);
    assert!(!engine.match_trivial().expect("trivial pass"));
    assert_eq!(engine.status(true).classes_matched, 0);
}

// ============================================================================
// Scenario 2: conflicting auto-match is discarded
// ============================================================================

#[test]
fn contested_peer_is_never_committed() {
    let mut graph = MatchGraph::new();
    // Two indistinguishable subjects, one candidate: both pick it, the
    // sanitize step throws both proposals away.
    add_populated_class(&mut graph, Side::A, "s1", &["shared", "words"], 4);
    add_populated_class(&mut graph, Side::A, "s2", &["shared", "words"], 4);
    let p = add_populated_class(&mut graph, Side::B, "p", &["shared", "words"], 4);

    let mut engine = MatchEngine::new(graph);
    let changed = engine
        .auto_match_classes(MatchLevel::Intermediate, &ignore_progress)
        .expect("auto-match");

    assert!(!changed);
    assert_eq!(engine.graph().side(Side::B).class(p).matched(), None);
    assert_eq!(engine.status(true).classes_matched, 0);
    assert_invariants(engine.graph());
}

// ============================================================================
// Scenario 3: hierarchy cascade on method match
// ============================================================================

#[test]
fn method_match_cascades_across_hierarchy() {
    let mut graph = MatchGraph::new();
    let ca = graph.add_class(Side::A, ClassDecl::input("Lca;", "ca")).expect("class");
    let cb = graph.add_class(Side::B, ClassDecl::input("Lcb;", "cb")).expect("class");

    let ma = graph.add_method(Side::A, ca, MethodDecl::new("m", "()V")).expect("member");
    let ma2 = graph.add_method(Side::A, ca, MethodDecl::new("m2", "()V")).expect("member");
    let mb = graph.add_method(Side::B, cb, MethodDecl::new("p", "()V")).expect("member");
    let mb2 = graph.add_method(Side::B, cb, MethodDecl::new("p2", "()V")).expect("member");
    graph.link_hierarchy(Side::A, &[ma, ma2]).expect("hierarchy");
    graph.link_hierarchy(Side::B, &[mb, mb2]).expect("hierarchy");

    let mut engine = MatchEngine::new(graph);
    engine.match_classes(ca, cb).expect("class match");
    engine.match_methods(ma, mb).expect("method match");

    let set_a = engine.graph().side(Side::A);
    assert_eq!(set_a.method(ma).matched(), Some(mb));
    assert_eq!(set_a.method(ma2).matched(), Some(mb2), "sibling binds too");
    assert_invariants(engine.graph());
}

// ============================================================================
// Scenario 4: array cascade on class match
// ============================================================================

#[test]
fn class_match_cascades_to_arrays() {
    let mut graph = MatchGraph::new();
    let e = graph.add_class(Side::A, ClassDecl::input("Le;", "e")).expect("class");
    let e_arr = graph.add_array_class(Side::A, e, 1).expect("array");
    let e_arr2 = graph.add_array_class(Side::A, e, 2).expect("array");
    let f = graph.add_class(Side::B, ClassDecl::input("Lf;", "f")).expect("class");
    let f_arr = graph.add_array_class(Side::B, f, 1).expect("array");
    let f_arr2 = graph.add_array_class(Side::B, f, 2).expect("array");

    let mut engine = MatchEngine::new(graph);
    engine.match_classes(e, f).expect("class match");

    let set_a = engine.graph().side(Side::A);
    assert_eq!(set_a.class(e_arr).matched(), Some(f_arr));
    assert_eq!(set_a.class(e_arr2).matched(), Some(f_arr2));
    assert_invariants(engine.graph());

    // Unmatching the element undoes the array cascade as well.
    engine.unmatch_class(Side::A, e);
    let set_a = engine.graph().side(Side::A);
    assert_eq!(set_a.class(e).matched(), None);
    assert_eq!(set_a.class(e_arr).matched(), None);
    assert_eq!(set_a.class(e_arr2).matched(), None);
}

#[test]
fn array_match_recurses_to_elements() {
    let mut graph = MatchGraph::new();
    let e = graph.add_class(Side::A, ClassDecl::input("Le;", "e")).expect("class");
    let e_arr = graph.add_array_class(Side::A, e, 1).expect("array");
    let f = graph.add_class(Side::B, ClassDecl::input("Lf;", "f")).expect("class");
    let f_arr = graph.add_array_class(Side::B, f, 1).expect("array");

    let mut engine = MatchEngine::new(graph);
    engine.match_classes(e_arr, f_arr).expect("array match");

    assert_eq!(engine.graph().side(Side::A).class(e).matched(), Some(f));
    assert_invariants(engine.graph());
}

// ============================================================================
// Scenario 5: merge-match rejection
// ============================================================================

#[test]
fn merge_match_demotes_divergent_class_pair() {
    let mut graph = MatchGraph::new();
    let ca = graph.add_class(Side::A, ClassDecl::input("Lca;", "ca")).expect("class");
    let cb = graph.add_class(Side::B, ClassDecl::input("Lcb;", "cb")).expect("class");
    let ma = graph.add_method(
        Side::A,
        ca,
        MethodDecl::new("m", "()V").with_insns(vec![Insn::simple(0x04); 10]),
    )
    .expect("method");
    let mb = graph.add_method(
        Side::B,
        cb,
        MethodDecl::new("p", "(I)V").with_insns(vec![Insn::simple(0x10); 25]),
    )
    .expect("method");

    let mut engine = MatchEngine::new(graph);
    engine.match_classes(ca, cb).expect("class match");
    engine.match_methods(ma, mb).expect("method match");

    engine
        .merge_match_classes(&ignore_progress)
        .expect("merge match");

    // The divergent pair is gone, and nothing convincing replaced it.
    let set_a = engine.graph().side(Side::A);
    assert_eq!(set_a.class(ca).matched(), None);
    assert_eq!(set_a.method(ma).matched(), None);
    assert_invariants(engine.graph());
}

#[test]
fn merge_match_keeps_agreeing_class_pair() {
    let mut graph = MatchGraph::new();
    let ca = graph.add_class(Side::A, ClassDecl::input("Lca;", "ca")).expect("class");
    let cb = graph.add_class(Side::B, ClassDecl::input("Lcb;", "cb")).expect("class");
    let body = vec![Insn::simple(0x2a), Insn::simple(0x04), Insn::simple(0xb1)];
    let ma = graph.add_method(Side::A, ca, MethodDecl::new("m", "()V").with_insns(body.clone())).expect("member");
    let mb = graph.add_method(Side::B, cb, MethodDecl::new("p", "()V").with_insns(body)).expect("member");

    let mut engine = MatchEngine::new(graph);
    engine.match_classes(ca, cb).expect("class match");
    engine.match_methods(ma, mb).expect("method match");

    engine
        .merge_match_classes(&ignore_progress)
        .expect("merge match");

    assert_eq!(engine.graph().side(Side::A).class(ca).matched(), Some(cb));
}

// ============================================================================
// Scenario 6: name propagation
// ============================================================================

#[test]
fn names_propagate_across_hierarchy() {
    let mut graph = MatchGraph::new();
    let mut methods = Vec::new();
    for i in 0..3 {
        let cls = graph
            .add_class(Side::B, ClassDecl::input(format!("Lc{i};"), format!("c{i}")))
            .expect("class");
        let method = graph
            .add_method(
                Side::B,
                cls,
                MethodDecl::new("m", "(I)V").with_args(vec![VarDecl::new("p")]),
            )
            .expect("method");
        methods.push(method);
    }
    graph.link_hierarchy(Side::B, &methods).expect("hierarchy");

    let (m1, m2, m3) = (methods[0], methods[1], methods[2]);
    assert!(graph.method_mut(Side::B, m1).set_mapped_name("foo"));
    let m2_arg = graph.side(Side::B).method(m2).args()[0];
    assert!(graph.var_mut(Side::B, m2_arg).set_mapped_name("x"));

    let mut engine = MatchEngine::new(graph);
    let propagated = engine.propagate_names(&ignore_progress);
    assert_eq!(propagated, 4);

    let graph = engine.graph();
    for m in [m1, m2, m3] {
        assert_eq!(graph.method_mapped_name(Side::B, m), Some("foo"));
        let arg = graph.side(Side::B).method(m).args()[0];
        assert_eq!(graph.var_mapped_name(Side::B, arg), Some("x"));
    }
}

// ============================================================================
// Laws and boundary behaviors
// ============================================================================

#[test]
fn rematch_of_same_pair_is_a_silent_no_op() {
    let mut graph = MatchGraph::new();
    let a = graph.add_class(Side::A, ClassDecl::input("La;", "a")).expect("class");
    let b = graph.add_class(Side::B, ClassDecl::input("Lb;", "b")).expect("class");

    let mut engine = MatchEngine::new(graph);
    engine.match_classes(a, b).expect("class match");

    // Seed the classifier cache; a true re-match must not clear it.
    let key = CacheKey::entity("probe", Side::A, 0);
    let _ = engine.graph().cache().get_or_insert_with(key, || 1u32);
    assert_eq!(engine.graph().cache().stats().size, 1);

    engine.match_classes(a, b).expect("re-match");
    assert_eq!(
        engine.graph().cache().stats().size,
        1,
        "no cache clear on already-matched pair"
    );
    assert_eq!(engine.graph().side(Side::A).class(a).matched(), Some(b));
}

#[test]
fn match_then_unmatch_restores_prior_state() {
    let mut graph = MatchGraph::new();
    let a = graph.add_class(Side::A, ClassDecl::input("La;", "a")).expect("class");
    let b = graph.add_class(Side::B, ClassDecl::input("Lb;", "b")).expect("class");
    let ma = graph.add_method(Side::A, a, MethodDecl::new("run", "()V").not_obfuscated()).expect("member");
    let mb = graph.add_method(Side::B, b, MethodDecl::new("run", "()V").not_obfuscated()).expect("member");
    let fa = graph.add_field(Side::A, a, FieldDecl::new("s", "I").not_obfuscated()).expect("member");
    let fb = graph.add_field(Side::B, b, FieldDecl::new("s", "I").not_obfuscated()).expect("member");

    let mut engine = MatchEngine::new(graph);
    engine.match_classes(a, b).expect("class match");
    // The cascade bound the unobfuscated members.
    assert_eq!(engine.graph().side(Side::A).method(ma).matched(), Some(mb));
    assert_eq!(engine.graph().side(Side::A).field(fa).matched(), Some(fb));

    engine.unmatch_class(Side::A, a);
    let set_a = engine.graph().side(Side::A);
    let set_b = engine.graph().side(Side::B);
    assert_eq!(set_a.class(a).matched(), None);
    assert_eq!(set_b.class(b).matched(), None);
    assert_eq!(set_a.method(ma).matched(), None);
    assert_eq!(set_b.method(mb).matched(), None);
    assert_eq!(set_a.field(fa).matched(), None);
    assert_eq!(set_b.field(fb).matched(), None);
}

#[test]
fn contract_violation_leaves_graph_untouched() {
    let mut graph = MatchGraph::new();
    let a = graph.add_class(Side::A, ClassDecl::input("La;", "a")).expect("class");
    let b = graph.add_class(Side::B, ClassDecl::input("Lb;", "b")).expect("class");
    let b2 = graph.add_class(Side::B, ClassDecl::input("Lb2;", "b2")).expect("class");
    let ma = graph.add_method(Side::A, a, MethodDecl::new("m", "()V")).expect("member");
    let foreign = graph.add_method(Side::B, b2, MethodDecl::new("p", "()V")).expect("member");

    let mut engine = MatchEngine::new(graph);
    engine.match_classes(a, b).expect("class match");

    let err = engine.match_methods(ma, foreign);
    assert!(err.is_err(), "cross-class member pairing must fail");
    assert_eq!(engine.graph().side(Side::A).method(ma).matched(), None);
    assert_eq!(engine.graph().side(Side::B).method(foreign).matched(), None);
    assert_invariants(engine.graph());
}

// ============================================================================
// Full driver run
// ============================================================================

#[test]
fn auto_match_all_reaches_full_correspondence() {
    let _ = classmatch::logging::init();

    let mut graph = MatchGraph::new();
    let specs: [(&str, &str, &[&str], usize); 3] = [
        ("a0", "b0", &["alpha", "beta"], 2),
        ("a1", "b1", &["gamma", "delta"], 12),
        ("a2", "b2", &["epsilon", "zeta"], 30),
    ];
    for (name_a, name_b, strings, filler) in specs {
        add_populated_class(&mut graph, Side::A, name_a, strings, filler);
        add_populated_class(&mut graph, Side::B, name_b, strings, filler);
    }

    let mut engine = MatchEngine::new(graph);
    let changed = engine.auto_match_all(&ignore_progress).expect("auto match");
    assert!(changed);

    let status = engine.status(true);
    assert_eq!(status.classes_matched, status.classes_total);
    assert_eq!(status.classes_total, 3);
    assert_eq!(status.methods_matched, status.methods_total);
    assert_eq!(status.methods_total, 6);
    assert_eq!(status.fields_matched, status.fields_total);
    assert_eq!(status.fields_total, 6);
    assert_eq!(status.args_matched, status.args_total);
    assert_eq!(status.args_total, 6);

    assert_invariants(engine.graph());

    // The driver clears the classifier cache when it finishes.
    assert_eq!(engine.graph().cache().stats().size, 0);

    // A second run finds nothing left to do.
    let changed = engine.auto_match_all(&ignore_progress).expect("auto match");
    assert!(!changed);
}

#[test]
fn auto_match_accepts_single_confident_candidate() {
    let mut graph = MatchGraph::new();
    add_populated_class(&mut graph, Side::A, "only", &["unique", "strings"], 6);
    add_populated_class(&mut graph, Side::B, "peer", &["unique", "strings"], 6);

    let mut engine = MatchEngine::new(graph);
    let changed = engine
        .auto_match_classes(MatchLevel::Intermediate, &ignore_progress)
        .expect("auto-match");
    assert!(changed, "a lone candidate passes regardless of rel threshold");
    assert_eq!(engine.status(true).classes_matched, 1);
}
