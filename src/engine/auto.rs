//! Auto-match driver: iterative classification passes.
//!
//! Every per-kind pass has the same shape: collect eligible subjects on side
//! A, rank each against its candidate pool in parallel, discard peers
//! claimed by more than one subject (sanitize), then commit the survivors
//! serially in insertion order through the arbiter.

use std::collections::HashMap;
use std::hash::Hash;

use indexmap::IndexMap;
use tracing::{info, warn};

use super::arbiter;
use super::parallel::{run_in_parallel, ProgressFn};
use super::status;
use super::MatchEngine;
use crate::error::Result;
use crate::matching::similarity::compare_insns;
use crate::matching::{check_rank, mismatch_budget, MatchLevel};
use crate::model::{ClassId, MethodId, Side, VarKind};

/// Drop every proposal whose peer is claimed by more than one subject.
/// Conflicts are discarded outright, never resolved.
fn sanitize<S, P>(proposals: Vec<(S, P)>) -> IndexMap<S, P>
where
    S: Copy + Eq + Hash,
    P: Copy + Eq + Hash,
{
    let mut claims: HashMap<P, usize> = HashMap::new();
    for (_, peer) in &proposals {
        *claims.entry(*peer).or_default() += 1;
    }
    proposals
        .into_iter()
        .filter(|(_, peer)| claims.get(peer) == Some(&1))
        .collect()
}

impl MatchEngine {
    /// Match every not-name-obfuscated input class to the side-B class with
    /// the identical id. Returns whether anything was bound.
    pub fn match_trivial(&mut self) -> Result<bool> {
        let pairs: Vec<(ClassId, ClassId)> = {
            let set_a = self.graph.side(Side::A);
            let set_b = self.graph.side(Side::B);
            set_a
                .class_ids()
                .filter_map(|a| {
                    let cls = set_a.class(a);
                    if cls.name_obfuscated() || !cls.is_input() || cls.matched().is_some() {
                        return None;
                    }
                    let b = set_b.cls_by_id(cls.id())?;
                    if set_b.class(b).matched().is_some() {
                        return None;
                    }
                    Some((a, b))
                })
                .collect()
        };

        let mut changed = false;
        for (a, b) in pairs {
            // A cascade from an earlier pair may have claimed this one.
            if self.graph.side(Side::A).class(a).matched().is_some() {
                continue;
            }
            arbiter::match_classes(&mut self.graph, a, b)?;
            changed = true;
        }
        Ok(changed)
    }

    /// One parallel class auto-match pass at the given level.
    pub fn auto_match_classes(
        &mut self,
        level: MatchLevel,
        progress: ProgressFn<'_>,
    ) -> Result<bool> {
        let eligible = |set: &crate::model::EntitySet, c: ClassId| {
            let cls = set.class(c);
            cls.is_input() && cls.name_obfuscated() && cls.matched().is_none()
        };
        let subjects: Vec<ClassId> = {
            let set = self.graph.side(Side::A);
            set.class_ids().filter(|&c| eligible(set, c)).collect()
        };
        let candidates: Vec<ClassId> = {
            let set = self.graph.side(Side::B);
            set.class_ids().filter(|&c| eligible(set, c)).collect()
        };

        let mut changed = false;
        if !subjects.is_empty() && !candidates.is_empty() {
            let max_score = self.class_classifier.max_score(level);
            let abs = self.config.abs_class_threshold;
            let rel = self.config.rel_class_threshold;
            let budget = mismatch_budget(abs, rel, max_score);
            let graph = &self.graph;
            let classifier = &self.class_classifier;

            let proposals: Vec<Option<(ClassId, ClassId)>> = run_in_parallel(
                &subjects,
                |&subject| {
                    let ranking = classifier.rank(graph, subject, &candidates, level, budget);
                    Ok(check_rank(&ranking, abs, rel, max_score)
                        .then(|| (subject, ranking[0].candidate)))
                },
                progress,
            )?;

            for (subject, peer) in sanitize(proposals.into_iter().flatten().collect()) {
                let before = self.graph.side(Side::A).class(subject).matched();
                arbiter::match_classes(&mut self.graph, subject, peer)?;
                if before != Some(peer) {
                    changed = true;
                }
            }
        }

        let totals = status::compute(&self.graph, true);
        info!(
            "classes: {} matched, {} unmatched, {} total",
            totals.classes_matched,
            totals.classes_total - totals.classes_matched,
            totals.classes_total
        );
        Ok(changed)
    }

    /// One parallel method auto-match pass at the given level.
    ///
    /// Candidates come from the subject's matched peer class; the arbiter
    /// would reject anything else.
    pub fn auto_match_methods(
        &mut self,
        level: MatchLevel,
        progress: ProgressFn<'_>,
    ) -> Result<bool> {
        let subjects: Vec<MethodId> = {
            let set = self.graph.side(Side::A);
            set.method_ids()
                .filter(|&m| {
                    let method = set.method(m);
                    let cls = set.class(method.class());
                    cls.is_input()
                        && cls.matched().is_some()
                        && method.matched().is_none()
                        && method.name_obfuscated()
                })
                .collect()
        };

        let mut changed = false;
        if !subjects.is_empty() {
            let max_score = self.method_classifier.max_score(level);
            let abs = self.config.abs_method_threshold;
            let rel = self.config.rel_method_threshold;
            let budget = mismatch_budget(abs, rel, max_score);
            let graph = &self.graph;
            let classifier = &self.method_classifier;

            let proposals: Vec<Option<(MethodId, MethodId)>> = run_in_parallel(
                &subjects,
                |&subject| {
                    let set_a = graph.side(Side::A);
                    let set_b = graph.side(Side::B);
                    let Some(peer_cls) = set_a.class(set_a.method(subject).class()).matched()
                    else {
                        return Ok(None);
                    };
                    let candidates: Vec<MethodId> = set_b
                        .class(peer_cls)
                        .methods()
                        .iter()
                        .copied()
                        .filter(|&c| {
                            set_b.method(c).matched().is_none() && set_b.method(c).name_obfuscated()
                        })
                        .collect();
                    if candidates.is_empty() {
                        return Ok(None);
                    }
                    let ranking = classifier.rank(graph, subject, &candidates, level, budget);
                    Ok(check_rank(&ranking, abs, rel, max_score)
                        .then(|| (subject, ranking[0].candidate)))
                },
                progress,
            )?;

            for (subject, peer) in sanitize(proposals.into_iter().flatten().collect()) {
                let before = self.graph.side(Side::A).method(subject).matched();
                arbiter::match_methods(&mut self.graph, subject, peer)?;
                if before != Some(peer) {
                    changed = true;
                }
            }
        }

        let totals = status::compute(&self.graph, true);
        info!(
            "methods: {} matched, {} unmatched",
            totals.methods_matched,
            totals.methods_total - totals.methods_matched
        );
        Ok(changed)
    }

    /// One parallel field auto-match pass at the given level.
    pub fn auto_match_fields(
        &mut self,
        level: MatchLevel,
        progress: ProgressFn<'_>,
    ) -> Result<bool> {
        let subjects: Vec<crate::model::FieldId> = {
            let set = self.graph.side(Side::A);
            set.field_ids()
                .filter(|&f| {
                    let field = set.field(f);
                    let cls = set.class(field.class());
                    cls.is_input()
                        && cls.matched().is_some()
                        && field.matched().is_none()
                        && field.name_obfuscated()
                })
                .collect()
        };

        let mut changed = false;
        if !subjects.is_empty() {
            let max_score = self.field_classifier.max_score(level);
            let abs = self.config.abs_field_threshold;
            let rel = self.config.rel_field_threshold;
            let budget = mismatch_budget(abs, rel, max_score);
            let graph = &self.graph;
            let classifier = &self.field_classifier;

            let proposals: Vec<Option<(crate::model::FieldId, crate::model::FieldId)>> =
                run_in_parallel(
                    &subjects,
                    |&subject| {
                        let set_a = graph.side(Side::A);
                        let set_b = graph.side(Side::B);
                        let Some(peer_cls) = set_a.class(set_a.field(subject).class()).matched()
                        else {
                            return Ok(None);
                        };
                        let candidates: Vec<crate::model::FieldId> = set_b
                            .class(peer_cls)
                            .fields()
                            .iter()
                            .copied()
                            .filter(|&c| {
                                set_b.field(c).matched().is_none()
                                    && set_b.field(c).name_obfuscated()
                            })
                            .collect();
                        if candidates.is_empty() {
                            return Ok(None);
                        }
                        let ranking = classifier.rank(graph, subject, &candidates, level, budget);
                        Ok(check_rank(&ranking, abs, rel, max_score)
                            .then(|| (subject, ranking[0].candidate)))
                    },
                    progress,
                )?;

            for (subject, peer) in sanitize(proposals.into_iter().flatten().collect()) {
                let before = self.graph.side(Side::A).field(subject).matched();
                arbiter::match_fields(&mut self.graph, subject, peer)?;
                if before != Some(peer) {
                    changed = true;
                }
            }
        }

        let totals = status::compute(&self.graph, true);
        info!(
            "fields: {} matched, {} unmatched",
            totals.fields_matched,
            totals.fields_total - totals.fields_matched
        );
        Ok(changed)
    }

    /// One parallel arg auto-match pass at the given level.
    pub fn auto_match_args(&mut self, level: MatchLevel, progress: ProgressFn<'_>) -> Result<bool> {
        self.auto_match_vars(VarKind::Arg, level, progress)
    }

    /// One parallel local-var auto-match pass at the given level.
    pub fn auto_match_locals(
        &mut self,
        level: MatchLevel,
        progress: ProgressFn<'_>,
    ) -> Result<bool> {
        self.auto_match_vars(VarKind::Local, level, progress)
    }

    fn auto_match_vars(
        &mut self,
        kind: VarKind,
        level: MatchLevel,
        progress: ProgressFn<'_>,
    ) -> Result<bool> {
        let subjects: Vec<crate::model::VarId> = {
            let set = self.graph.side(Side::A);
            set.var_ids()
                .filter(|&v| {
                    let var = set.var(v);
                    let method = set.method(var.method());
                    let cls = set.class(method.class());
                    var.kind() == kind
                        && cls.is_input()
                        && method.matched().is_some()
                        && var.matched().is_none()
                        && var.name_obfuscated()
                })
                .collect()
        };

        let mut changed = false;
        if !subjects.is_empty() {
            let max_score = self.var_classifier.max_score(level);
            let abs = self.config.abs_var_threshold;
            let rel = self.config.rel_var_threshold;
            let budget = mismatch_budget(abs, rel, max_score);
            let graph = &self.graph;
            let classifier = &self.var_classifier;

            let proposals: Vec<Option<(crate::model::VarId, crate::model::VarId)>> =
                run_in_parallel(
                    &subjects,
                    |&subject| {
                        let set_a = graph.side(Side::A);
                        let set_b = graph.side(Side::B);
                        let var = set_a.var(subject);
                        let Some(peer_method) = set_a.method(var.method()).matched() else {
                            return Ok(None);
                        };
                        let peer = set_b.method(peer_method);
                        let pool = if var.is_arg() {
                            peer.args()
                        } else {
                            peer.locals()
                        };
                        let candidates: Vec<crate::model::VarId> = pool
                            .iter()
                            .copied()
                            .filter(|&c| {
                                set_b.var(c).matched().is_none() && set_b.var(c).name_obfuscated()
                            })
                            .collect();
                        if candidates.is_empty() {
                            return Ok(None);
                        }
                        let ranking = classifier.rank(graph, subject, &candidates, level, budget);
                        Ok(check_rank(&ranking, abs, rel, max_score)
                            .then(|| (subject, ranking[0].candidate)))
                    },
                    progress,
                )?;

            for (subject, peer) in sanitize(proposals.into_iter().flatten().collect()) {
                let before = self.graph.side(Side::A).var(subject).matched();
                arbiter::match_vars(&mut self.graph, subject, peer)?;
                if before != Some(peer) {
                    changed = true;
                }
            }
        }

        let totals = status::compute(&self.graph, true);
        let (matched, total) = match kind {
            VarKind::Arg => (totals.args_matched, totals.args_total),
            VarKind::Local => (totals.locals_matched, totals.locals_total),
        };
        let label = match kind {
            VarKind::Arg => "args",
            VarKind::Local => "locals",
        };
        info!("{label}: {matched} matched, {} unmatched", total - matched);
        Ok(changed)
    }

    /// Member passes at one level until a fixed point.
    ///
    /// Methods then fields repeat while either binds; once both come up
    /// empty, classes get a retry, and two consecutive empty class passes
    /// end the loop.
    fn level_loop(&mut self, level: MatchLevel, progress: ProgressFn<'_>) -> Result<bool> {
        let mut any = false;
        let mut prev_class_empty = false;
        loop {
            let methods = self.auto_match_methods(level, progress)?;
            let fields = self.auto_match_fields(level, progress)?;
            if methods || fields {
                any = true;
                continue;
            }
            let classes = self.auto_match_classes(level, progress)?;
            if classes {
                any = true;
                prev_class_empty = false;
                continue;
            }
            if prev_class_empty {
                break;
            }
            prev_class_empty = true;
        }
        Ok(any)
    }

    /// Run the full driver: Initial classes (twice when productive), a level
    /// loop per remaining level, then arg/local passes to a fixed point.
    pub fn auto_match_all(&mut self, progress: ProgressFn<'_>) -> Result<bool> {
        let mut any = false;

        if self.auto_match_classes(MatchLevel::Initial, progress)? {
            any = true;
            // One extra pass captures candidates enabled by the first.
            self.auto_match_classes(MatchLevel::Initial, progress)?;
        }

        for level in [
            MatchLevel::Intermediate,
            MatchLevel::Full,
            MatchLevel::Extra,
        ] {
            if self.level_loop(level, progress)? {
                any = true;
            }
        }

        loop {
            let args = self.auto_match_args(MatchLevel::Full, progress)?;
            let locals = self.auto_match_locals(MatchLevel::Full, progress)?;
            if args || locals {
                any = true;
            } else {
                break;
            }
        }

        self.graph.cache().clear();
        Ok(any)
    }

    /// Verify matched classes by instruction similarity and re-match the
    /// demoted ones.
    ///
    /// A matched class whose matched real methods diverge below the
    /// configured similarity threshold is unmatched entirely; the expanded
    /// unmatched pool then goes through a fresh class auto-match. Returns
    /// whether that pass committed any new binding.
    pub fn merge_match_classes(&mut self, progress: ProgressFn<'_>) -> Result<bool> {
        let subjects: Vec<ClassId> = {
            let set = self.graph.side(Side::A);
            set.class_ids()
                .filter(|&c| set.class(c).is_input() && set.class(c).matched().is_some())
                .collect()
        };

        let threshold = self.config.merge_similarity_threshold;
        let graph = &self.graph;
        let flagged: Vec<Option<ClassId>> = run_in_parallel(
            &subjects,
            |&cls| {
                let set_a = graph.side(Side::A);
                let set_b = graph.side(Side::B);
                for &m in set_a.class(cls).methods() {
                    let method = set_a.method(m);
                    if !method.is_real() || method.insns().is_empty() {
                        continue;
                    }
                    let Some(peer) = method.matched() else {
                        continue;
                    };
                    if compare_insns(method.insns(), set_b.method(peer).insns()) < threshold {
                        return Ok(Some(cls));
                    }
                }
                Ok(None)
            },
            progress,
        )?;

        for cls in flagged.into_iter().flatten() {
            warn!(
                "merge mismatch: unmatching class {}",
                self.graph.side(Side::A).class(cls).id()
            );
            arbiter::unmatch_class(&mut self.graph, Side::A, cls);
        }

        self.auto_match_classes(self.config.level, progress)
    }
}
