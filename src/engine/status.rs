//! Matching progress totals.

use serde::{Deserialize, Serialize};

use crate::model::{MatchGraph, Side};

/// Totals and matched counts for side A, per entity kind.
///
/// Members contribute only when real; vars contribute through real methods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingStatus {
    pub classes_total: usize,
    pub classes_matched: usize,
    pub methods_total: usize,
    pub methods_matched: usize,
    pub fields_total: usize,
    pub fields_matched: usize,
    pub args_total: usize,
    pub args_matched: usize,
    pub locals_total: usize,
    pub locals_matched: usize,
}

impl std::fmt::Display for MatchingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "classes {}/{}, methods {}/{}, fields {}/{}, args {}/{}, locals {}/{}",
            self.classes_matched,
            self.classes_total,
            self.methods_matched,
            self.methods_total,
            self.fields_matched,
            self.fields_total,
            self.args_matched,
            self.args_total,
            self.locals_matched,
            self.locals_total
        )
    }
}

pub(crate) fn compute(graph: &MatchGraph, inputs_only: bool) -> MatchingStatus {
    let set = graph.side(Side::A);
    let mut status = MatchingStatus::default();

    for cls_id in set.class_ids() {
        let cls = set.class(cls_id);
        if inputs_only && !cls.is_input() {
            continue;
        }
        status.classes_total += 1;
        if cls.matched().is_some() {
            status.classes_matched += 1;
        }

        for &m in cls.methods() {
            let method = set.method(m);
            if !method.is_real() {
                continue;
            }
            status.methods_total += 1;
            if method.matched().is_some() {
                status.methods_matched += 1;
            }
            for &v in method.args() {
                status.args_total += 1;
                if set.var(v).matched().is_some() {
                    status.args_matched += 1;
                }
            }
            for &v in method.locals() {
                status.locals_total += 1;
                if set.var(v).matched().is_some() {
                    status.locals_matched += 1;
                }
            }
        }

        for &fld in cls.fields() {
            let field = set.field(fld);
            if !field.is_real() {
                continue;
            }
            status.fields_total += 1;
            if field.matched().is_some() {
                status.fields_matched += 1;
            }
        }
    }

    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassDecl, FieldDecl, MethodDecl};

    #[test]
    fn test_status_skips_placeholders_and_non_inputs() {
        let mut graph = MatchGraph::new();
        let a = graph.add_class(Side::A, ClassDecl::input("La;", "a")).unwrap();
        graph.add_method(Side::A, a, MethodDecl::new("m", "()V")).unwrap();
        graph.add_method(Side::A, a, MethodDecl::new("ghost", "()V").placeholder()).unwrap();
        graph.add_field(Side::A, a, FieldDecl::new("f", "I")).unwrap();

        // Library placeholder class, excluded under inputs_only.
        let lib = graph
            .add_class(
                Side::A,
                ClassDecl {
                    id: "Ljava/lang/Object;".to_string(),
                    name: "java/lang/Object".to_string(),
                    origin: None,
                    name_obfuscated: false,
                },
            )
            .unwrap();
        graph.add_method(Side::A, lib, MethodDecl::new("toString", "()Ljava/lang/String;")).unwrap();

        let status = compute(&graph, true);
        assert_eq!(status.classes_total, 1);
        assert_eq!(status.methods_total, 1, "placeholder method must not count");
        assert_eq!(status.fields_total, 1);

        let all = compute(&graph, false);
        assert_eq!(all.classes_total, 2);
        assert_eq!(all.methods_total, 2);
    }

    #[test]
    fn test_status_display() {
        let status = MatchingStatus {
            classes_total: 10,
            classes_matched: 3,
            ..MatchingStatus::default()
        };
        assert!(status.to_string().starts_with("classes 3/10"));
    }
}
