//! Match arbiter: the single owner of match-link mutation.
//!
//! Every operation checks its contract before touching the graph, logs one
//! line per mutation, re-establishes bidirectional symmetry atomically, runs
//! the cascades (arrays, unobfuscated members, hierarchy siblings), and
//! clears the classifier cache on the way out. "Already matched to the same
//! peer" short-circuits with no log, no mutation, and no cache clear.

use tracing::info;

use crate::error::{ClassMatchError, ContractErrorKind, Result};
use crate::model::{ClassId, FieldId, MatchGraph, MethodId, Side, VarId};

fn log_match(kind: &str, a: &str, b: &str, mapped: Option<&str>) {
    match mapped {
        Some(name) => info!("match {kind} {a} -> {b} ({name})"),
        None => info!("match {kind} {a} -> {b}"),
    }
}

// ============================================================================
// match
// ============================================================================

pub(crate) fn match_classes(graph: &mut MatchGraph, a: ClassId, b: ClassId) -> Result<()> {
    let dims_a = graph.side(Side::A).class(a).array_dims();
    let dims_b = graph.side(Side::B).class(b).array_dims();
    if dims_a != dims_b {
        return Err(ClassMatchError::contract(
            format!(
                "match class {} -> {}",
                graph.side(Side::A).class(a).id(),
                graph.side(Side::B).class(b).id()
            ),
            ContractErrorKind::ArrayDimensionMismatch {
                a: dims_a,
                b: dims_b,
            },
        ));
    }
    if graph.side(Side::A).class(a).matched() == Some(b) {
        return Ok(());
    }

    // Rebinding: prior partners lose their link and their member links.
    if let Some(prev) = graph.side(Side::A).class(a).matched() {
        graph.set_class_match(Side::A, a, None);
        graph.set_class_match(Side::B, prev, None);
        unmatch_members(graph, Side::A, a);
        unmatch_members(graph, Side::B, prev);
    }
    if let Some(prev) = graph.side(Side::B).class(b).matched() {
        graph.set_class_match(Side::B, b, None);
        graph.set_class_match(Side::A, prev, None);
        unmatch_members(graph, Side::B, b);
        unmatch_members(graph, Side::A, prev);
    }

    log_match(
        "class",
        graph.side(Side::A).class(a).id(),
        graph.side(Side::B).class(b).id(),
        graph.side(Side::B).class(b).mapped_name(),
    );
    graph.set_class_match(Side::A, a, Some(b));
    graph.set_class_match(Side::B, b, Some(a));

    cascade_arrays(graph, a, b)?;
    cascade_methods(graph, a, b)?;
    cascade_fields(graph, a, b)?;

    graph.cache().clear();
    Ok(())
}

fn cascade_arrays(graph: &mut MatchGraph, a: ClassId, b: ClassId) -> Result<()> {
    if graph.side(Side::A).class(a).is_array() {
        let elem_a = graph.side(Side::A).class(a).element();
        let elem_b = graph.side(Side::B).class(b).element();
        if let (Some(elem_a), Some(elem_b)) = (elem_a, elem_b) {
            if graph.side(Side::A).class(elem_a).matched().is_none()
                && graph.side(Side::B).class(elem_b).matched().is_none()
            {
                match_classes(graph, elem_a, elem_b)?;
            }
        }
        return Ok(());
    }

    // Pair each of a's unmatched array classes with the unique unmatched
    // same-dimension array class over b, if one exists.
    let arrays_a: Vec<ClassId> = graph.side(Side::A).class(a).arrays().to_vec();
    for arr_a in arrays_a {
        if graph.side(Side::A).class(arr_a).matched().is_some() {
            continue;
        }
        let dims = graph.side(Side::A).class(arr_a).array_dims();
        let unique = {
            let set_b = graph.side(Side::B);
            let mut it = set_b.class(b).arrays().iter().copied().filter(|&arr_b| {
                set_b.class(arr_b).array_dims() == dims && set_b.class(arr_b).matched().is_none()
            });
            match (it.next(), it.next()) {
                (Some(arr_b), None) => Some(arr_b),
                _ => None,
            }
        };
        if let Some(arr_b) = unique {
            match_classes(graph, arr_a, arr_b)?;
        }
    }
    Ok(())
}

fn cascade_methods(graph: &mut MatchGraph, a: ClassId, b: ClassId) -> Result<()> {
    let methods_a: Vec<MethodId> = graph.side(Side::A).class(a).methods().to_vec();
    for sm in methods_a {
        let (obfuscated, unmatched, id, name) = {
            let m = graph.side(Side::A).method(sm);
            (
                m.name_obfuscated(),
                m.matched().is_none(),
                m.id(),
                m.name().to_string(),
            )
        };
        if obfuscated || !unmatched {
            continue;
        }
        let dst = graph
            .side(Side::B)
            .method_by_id(b, &id)
            .or_else(|| graph.side(Side::B).method_by_name(b, &name))
            .or_else(|| hierarchy_fallback(graph, sm, b));
        if let Some(dst) = dst {
            if graph.side(Side::B).method(dst).matched().is_none() {
                match_methods(graph, sm, dst)?;
            }
        }
    }
    Ok(())
}

/// Find a destination method through an already-matched hierarchy sibling:
/// the sibling's peer names the destination clique on side B.
fn hierarchy_fallback(graph: &MatchGraph, sm: MethodId, dst_cls: ClassId) -> Option<MethodId> {
    let set_a = graph.side(Side::A);
    let set_b = graph.side(Side::B);
    for &sibling in set_a.method(sm).hierarchy() {
        if sibling == sm {
            continue;
        }
        let Some(peer) = set_a.method(sibling).matched() else {
            continue;
        };
        let peer_hierarchy = set_b.method(peer).hierarchy();
        let found = set_b.class(dst_cls).methods().iter().copied().find(|&cand| {
            set_b
                .method(cand)
                .hierarchy()
                .iter()
                .any(|h| peer_hierarchy.contains(h))
        });
        if found.is_some() {
            return found;
        }
    }
    None
}

fn cascade_fields(graph: &mut MatchGraph, a: ClassId, b: ClassId) -> Result<()> {
    let fields_a: Vec<FieldId> = graph.side(Side::A).class(a).fields().to_vec();
    for sf in fields_a {
        let (obfuscated, unmatched, id, name) = {
            let f = graph.side(Side::A).field(sf);
            (
                f.name_obfuscated(),
                f.matched().is_none(),
                f.id(),
                f.name().to_string(),
            )
        };
        if obfuscated || !unmatched {
            continue;
        }
        let dst = graph
            .side(Side::B)
            .field_by_id(b, &id)
            .or_else(|| graph.side(Side::B).field_by_name(b, &name));
        if let Some(dst) = dst {
            if graph.side(Side::B).field(dst).matched().is_none() {
                match_fields(graph, sf, dst)?;
            }
        }
    }
    Ok(())
}

pub(crate) fn match_methods(graph: &mut MatchGraph, a: MethodId, b: MethodId) -> Result<()> {
    let cls_a = graph.side(Side::A).method(a).class();
    let cls_b = graph.side(Side::B).method(b).class();
    if graph.side(Side::A).class(cls_a).matched() != Some(cls_b) {
        return Err(ClassMatchError::contract(
            "match method",
            ContractErrorKind::ClassesNotMatched {
                subject: graph.side(Side::A).method(a).id(),
                candidate: graph.side(Side::B).method(b).id(),
            },
        ));
    }
    if graph.side(Side::A).method(a).matched() == Some(b) {
        return Ok(());
    }

    unbind_method(graph, Side::A, a);
    unbind_method(graph, Side::B, b);

    log_match(
        "method",
        &qualified_method(graph, Side::A, a),
        &qualified_method(graph, Side::B, b),
        graph.side(Side::B).method(b).mapped_name(),
    );
    graph.set_method_match(Side::A, a, Some(b));
    graph.set_method_match(Side::B, b, Some(a));

    // Hierarchy cascade: bind unmatched siblings whose class already has a
    // peer, provided that peer holds a method of b's clique.
    let hierarchy: Vec<MethodId> = graph.side(Side::A).method(a).hierarchy().to_vec();
    for sm in hierarchy {
        if sm == a {
            continue;
        }
        let (sm_unmatched, peer_cls) = {
            let m = graph.side(Side::A).method(sm);
            (
                m.matched().is_none(),
                graph.side(Side::A).class(m.class()).matched(),
            )
        };
        let Some(peer_cls) = peer_cls else { continue };
        if !sm_unmatched {
            continue;
        }
        let dst = {
            let set_b = graph.side(Side::B);
            set_b.class(peer_cls).methods().iter().copied().find(|&cand| {
                set_b.method(cand).matched().is_none()
                    && set_b.method(cand).hierarchy().contains(&b)
            })
        };
        if let Some(dst) = dst {
            log_match(
                "method",
                &qualified_method(graph, Side::A, sm),
                &qualified_method(graph, Side::B, dst),
                graph.side(Side::B).method(dst).mapped_name(),
            );
            graph.set_method_match(Side::A, sm, Some(dst));
            graph.set_method_match(Side::B, dst, Some(sm));
        }
    }

    graph.cache().clear();
    Ok(())
}

pub(crate) fn match_fields(graph: &mut MatchGraph, a: FieldId, b: FieldId) -> Result<()> {
    let cls_a = graph.side(Side::A).field(a).class();
    let cls_b = graph.side(Side::B).field(b).class();
    if graph.side(Side::A).class(cls_a).matched() != Some(cls_b) {
        return Err(ClassMatchError::contract(
            "match field",
            ContractErrorKind::ClassesNotMatched {
                subject: graph.side(Side::A).field(a).id(),
                candidate: graph.side(Side::B).field(b).id(),
            },
        ));
    }
    if graph.side(Side::A).field(a).matched() == Some(b) {
        return Ok(());
    }

    unbind_field(graph, Side::A, a);
    unbind_field(graph, Side::B, b);

    log_match(
        "field",
        &qualified_field(graph, Side::A, a),
        &qualified_field(graph, Side::B, b),
        graph.side(Side::B).field(b).mapped_name(),
    );
    graph.set_field_match(Side::A, a, Some(b));
    graph.set_field_match(Side::B, b, Some(a));

    graph.cache().clear();
    Ok(())
}

pub(crate) fn match_vars(graph: &mut MatchGraph, a: VarId, b: VarId) -> Result<()> {
    let va_kind = graph.side(Side::A).var(a).kind();
    let vb_kind = graph.side(Side::B).var(b).kind();
    if va_kind != vb_kind {
        return Err(ClassMatchError::contract(
            "match var",
            ContractErrorKind::VarKindMismatch,
        ));
    }
    let method_a = graph.side(Side::A).var(a).method();
    let method_b = graph.side(Side::B).var(b).method();
    if graph.side(Side::A).method(method_a).matched() != Some(method_b) {
        return Err(ClassMatchError::contract(
            "match var",
            ContractErrorKind::MethodsNotMatched {
                subject: graph.side(Side::A).method(method_a).id(),
                candidate: graph.side(Side::B).method(method_b).id(),
            },
        ));
    }
    if graph.side(Side::A).var(a).matched() == Some(b) {
        return Ok(());
    }

    unbind_var(graph, Side::A, a);
    unbind_var(graph, Side::B, b);

    log_match(
        "var",
        &qualified_var(graph, Side::A, a),
        &qualified_var(graph, Side::B, b),
        graph.side(Side::B).var(b).mapped_name(),
    );
    graph.set_var_match(Side::A, a, Some(b));
    graph.set_var_match(Side::B, b, Some(a));

    graph.cache().clear();
    Ok(())
}

// ============================================================================
// unmatch
// ============================================================================

pub(crate) fn unmatch_class(graph: &mut MatchGraph, side: Side, id: ClassId) {
    let Some(peer) = graph.side(side).class(id).matched() else {
        return;
    };
    info!(
        "unmatch class {} -/- {}",
        graph.side(side).class(id).id(),
        graph.side(side.opposite()).class(peer).id()
    );
    graph.set_class_match(side, id, None);
    graph.set_class_match(side.opposite(), peer, None);
    unmatch_members(graph, side, id);
    unmatch_members(graph, side.opposite(), peer);

    if graph.side(side).class(id).is_array() {
        if let Some(elem) = graph.side(side).class(id).element() {
            unmatch_class(graph, side, elem);
        }
    } else {
        let arrays: Vec<ClassId> = graph.side(side).class(id).arrays().to_vec();
        for arr in arrays {
            unmatch_class(graph, side, arr);
        }
    }

    graph.cache().clear();
}

pub(crate) fn unmatch_method(graph: &mut MatchGraph, side: Side, id: MethodId) {
    if graph.side(side).method(id).matched().is_none() {
        return;
    }
    info!("unmatch method {}", qualified_method(graph, side, id));
    unbind_method(graph, side, id);

    // Hierarchy members follow: a dropped binding invalidates the cascade
    // that created the siblings' bindings.
    let hierarchy: Vec<MethodId> = graph.side(side).method(id).hierarchy().to_vec();
    for member in hierarchy {
        if member != id {
            unbind_method(graph, side, member);
        }
    }

    graph.cache().clear();
}

pub(crate) fn unmatch_field(graph: &mut MatchGraph, side: Side, id: FieldId) {
    if graph.side(side).field(id).matched().is_none() {
        return;
    }
    info!("unmatch field {}", qualified_field(graph, side, id));
    unbind_field(graph, side, id);
    graph.cache().clear();
}

pub(crate) fn unmatch_var(graph: &mut MatchGraph, side: Side, id: VarId) {
    if graph.side(side).var(id).matched().is_none() {
        return;
    }
    info!("unmatch var {}", qualified_var(graph, side, id));
    unbind_var(graph, side, id);
    graph.cache().clear();
}

// ============================================================================
// Internal unbinding helpers (no logging, no cache clear)
// ============================================================================

/// Drop every member and var link of the given class, both ends.
fn unmatch_members(graph: &mut MatchGraph, side: Side, class: ClassId) {
    let methods: Vec<MethodId> = graph.side(side).class(class).methods().to_vec();
    for m in methods {
        unbind_method(graph, side, m);
    }
    let fields: Vec<FieldId> = graph.side(side).class(class).fields().to_vec();
    for f in fields {
        unbind_field(graph, side, f);
    }
}

/// Drop a method pair's link and both methods' var links.
fn unbind_method(graph: &mut MatchGraph, side: Side, id: MethodId) {
    let Some(peer) = graph.side(side).method(id).matched() else {
        return;
    };
    drop_method_vars(graph, side, id);
    drop_method_vars(graph, side.opposite(), peer);
    graph.set_method_match(side, id, None);
    graph.set_method_match(side.opposite(), peer, None);
}

fn drop_method_vars(graph: &mut MatchGraph, side: Side, id: MethodId) {
    let vars: Vec<VarId> = {
        let m = graph.side(side).method(id);
        m.args().iter().chain(m.locals()).copied().collect()
    };
    for v in vars {
        unbind_var(graph, side, v);
    }
}

fn unbind_field(graph: &mut MatchGraph, side: Side, id: FieldId) {
    let Some(peer) = graph.side(side).field(id).matched() else {
        return;
    };
    graph.set_field_match(side, id, None);
    graph.set_field_match(side.opposite(), peer, None);
}

fn unbind_var(graph: &mut MatchGraph, side: Side, id: VarId) {
    let Some(peer) = graph.side(side).var(id).matched() else {
        return;
    };
    graph.set_var_match(side, id, None);
    graph.set_var_match(side.opposite(), peer, None);
}

// ============================================================================
// Display helpers
// ============================================================================

fn qualified_method(graph: &MatchGraph, side: Side, id: MethodId) -> String {
    let set = graph.side(side);
    let m = set.method(id);
    format!("{}{}", set.class(m.class()).id(), m.id())
}

fn qualified_field(graph: &MatchGraph, side: Side, id: FieldId) -> String {
    let set = graph.side(side);
    let f = set.field(id);
    format!("{}{}", set.class(f.class()).id(), f.id())
}

fn qualified_var(graph: &MatchGraph, side: Side, id: VarId) -> String {
    let set = graph.side(side);
    let v = set.var(id);
    let kind = if v.is_arg() { "arg" } else { "lv" };
    format!(
        "{}[{kind} {}]",
        qualified_method(graph, side, v.method()),
        v.index()
    )
}
