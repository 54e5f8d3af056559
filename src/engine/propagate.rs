//! Mapped-name propagation across method hierarchy cliques.

use std::collections::HashSet;

use tracing::debug;

use crate::engine::parallel::ProgressFn;
use crate::model::{MatchGraph, MethodId, Side};

/// Spread mapped names across side-B hierarchy cliques.
///
/// Each clique is visited once: the first mapped method name and the first
/// mapped name per arg slot found among the members are assigned to every
/// member still lacking one. Returns the number of names assigned.
pub(crate) fn propagate_names(graph: &mut MatchGraph, progress: ProgressFn<'_>) -> usize {
    let mut visited: HashSet<MethodId> = HashSet::new();
    let mut propagated = 0usize;

    let classes: Vec<_> = graph.classes_b().collect();
    let total = classes.len();
    for (done, cls) in classes.into_iter().enumerate() {
        let methods = graph.side(Side::B).class(cls).methods().to_vec();
        for m in methods {
            let hierarchy = graph.side(Side::B).method(m).hierarchy().to_vec();
            if hierarchy.len() <= 1 || visited.contains(&m) {
                continue;
            }
            visited.extend(hierarchy.iter().copied());
            propagated += propagate_clique(graph, m, &hierarchy);
        }
        if total > 0 {
            progress((done + 1) as f64 / total as f64);
        }
    }

    if propagated > 0 {
        debug!("propagated {propagated} names across method hierarchies");
    }
    propagated
}

fn propagate_clique(graph: &mut MatchGraph, entry: MethodId, hierarchy: &[MethodId]) -> usize {
    // Fully named at the entry point: nothing to collect for this clique.
    let entry_named = graph.method_mapped_name(Side::B, entry).is_some();
    let entry_args_named = graph
        .side(Side::B)
        .method(entry)
        .args()
        .iter()
        .all(|&v| graph.var_mapped_name(Side::B, v).is_some());
    if entry_named && entry_args_named {
        return 0;
    }

    // Collect the first resolvable method name and per-slot arg names.
    let max_args = hierarchy
        .iter()
        .map(|&h| graph.side(Side::B).method(h).args().len())
        .max()
        .unwrap_or(0);
    let mut method_name: Option<String> = None;
    let mut arg_names: Vec<Option<String>> = vec![None; max_args];
    for &member in hierarchy {
        if method_name.is_none() {
            method_name = graph.method_mapped_name(Side::B, member).map(str::to_string);
        }
        let args = graph.side(Side::B).method(member).args().to_vec();
        for (slot, &v) in args.iter().enumerate() {
            if arg_names[slot].is_none() {
                arg_names[slot] = graph.var_mapped_name(Side::B, v).map(str::to_string);
            }
        }
    }
    if method_name.is_none() && arg_names.iter().all(Option::is_none) {
        return 0;
    }

    // Assign to every member still lacking the corresponding name.
    let mut assigned = 0usize;
    for &member in hierarchy {
        if let Some(name) = &method_name {
            if graph.method_mapped_name(Side::B, member).is_none()
                && graph.method_mut(Side::B, member).set_mapped_name(name.clone())
            {
                assigned += 1;
            }
        }
        let args = graph.side(Side::B).method(member).args().to_vec();
        for (slot, &v) in args.iter().enumerate() {
            if let Some(Some(name)) = arg_names.get(slot) {
                if graph.var_mapped_name(Side::B, v).is_none()
                    && graph.var_mut(Side::B, v).set_mapped_name(name.clone())
                {
                    assigned += 1;
                }
            }
        }
    }
    assigned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parallel::ignore_progress;
    use crate::model::{ClassDecl, MethodDecl, VarDecl};

    fn clique_of_three(graph: &mut MatchGraph) -> [MethodId; 3] {
        let mut methods = Vec::new();
        for i in 0..3 {
            let cls = graph
                .add_class(Side::B, ClassDecl::input(format!("Lc{i};"), format!("c{i}")))
                .unwrap();
            let method = graph
                .add_method(
                    Side::B,
                    cls,
                    MethodDecl::new("m", "(I)V").with_args(vec![VarDecl::new("p")]),
                )
                .unwrap();
            methods.push(method);
        }
        let ids: [MethodId; 3] = [methods[0], methods[1], methods[2]];
        graph.link_hierarchy(Side::B, &ids).unwrap();
        ids
    }

    #[test]
    fn test_propagates_method_and_arg_names() {
        let mut graph = MatchGraph::new();
        let [m1, m2, m3] = clique_of_three(&mut graph);
        assert!(graph.method_mut(Side::B, m1).set_mapped_name("foo"));
        let m2_arg = graph.side(Side::B).method(m2).args()[0];
        assert!(graph.var_mut(Side::B, m2_arg).set_mapped_name("x"));

        let propagated = propagate_names(&mut graph, &ignore_progress);
        // Two method names (m2, m3) and two arg names (m1, m3).
        assert_eq!(propagated, 4);

        for m in [m1, m2, m3] {
            assert_eq!(graph.method_mapped_name(Side::B, m), Some("foo"));
            let arg = graph.side(Side::B).method(m).args()[0];
            assert_eq!(graph.var_mapped_name(Side::B, arg), Some("x"));
        }
        // The original holders kept their own names.
        assert_eq!(graph.side(Side::B).method(m1).mapped_name(), Some("foo"));
    }

    #[test]
    fn test_fully_named_entry_skips_clique() {
        let mut graph = MatchGraph::new();
        let [m1, m2, _] = clique_of_three(&mut graph);
        assert!(graph.method_mut(Side::B, m1).set_mapped_name("done"));
        let m1_arg = graph.side(Side::B).method(m1).args()[0];
        assert!(graph.var_mut(Side::B, m1_arg).set_mapped_name("a"));

        // The entry method (first in class order) is fully named, so the
        // clique is skipped even though m2 still lacks names.
        let propagated = propagate_names(&mut graph, &ignore_progress);
        assert_eq!(propagated, 0);
        assert_eq!(graph.method_mapped_name(Side::B, m2), None);
    }

    #[test]
    fn test_singleton_hierarchy_untouched() {
        let mut graph = MatchGraph::new();
        let cls = graph.add_class(Side::B, ClassDecl::input("Lc;", "c")).unwrap();
        let m = graph.add_method(Side::B, cls, MethodDecl::new("m", "()V")).unwrap();
        assert!(graph.method_mut(Side::B, m).set_mapped_name("solo"));

        let propagated = propagate_names(&mut graph, &ignore_progress);
        assert_eq!(propagated, 0);
    }
}
