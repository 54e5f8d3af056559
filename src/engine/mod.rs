//! Matching engine: arbiter, auto-match driver, and name propagation.
//!
//! [`MatchEngine`] is the public facade over the entity graph. Manual
//! match/unmatch operations delegate to the arbiter; the auto-match driver
//! layers iterative, level-by-level classification passes on top, each pass
//! being a parallel scoring phase followed by a serial commit.

mod arbiter;
mod auto;
mod parallel;
mod propagate;
mod status;

pub use parallel::{ignore_progress, run_in_parallel, ProgressFn};
pub use status::MatchingStatus;

use crate::config::MatchConfig;
use crate::error::Result;
use crate::matching::{
    class_classifier, field_classifier, method_classifier, var_classifier, Classifier,
};
use crate::model::{ClassId, FieldId, MatchGraph, MethodId, Side, VarId};

/// The matching engine for one pair of inputs.
#[must_use]
pub struct MatchEngine {
    graph: MatchGraph,
    config: MatchConfig,
    class_classifier: Classifier<ClassId>,
    method_classifier: Classifier<MethodId>,
    field_classifier: Classifier<FieldId>,
    var_classifier: Classifier<VarId>,
}

impl MatchEngine {
    /// Create an engine over a populated graph with default thresholds.
    pub fn new(graph: MatchGraph) -> Self {
        Self {
            graph,
            config: MatchConfig::default(),
            class_classifier: class_classifier(),
            method_classifier: method_classifier(),
            field_classifier: field_classifier(),
            var_classifier: var_classifier(),
        }
    }

    /// Replace the threshold configuration.
    pub fn with_config(mut self, config: MatchConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &MatchConfig {
        &self.config
    }

    #[must_use]
    pub const fn graph(&self) -> &MatchGraph {
        &self.graph
    }

    /// Mutable graph access for the loader / mapping-reader side.
    pub fn graph_mut(&mut self) -> &mut MatchGraph {
        &mut self.graph
    }

    /// Consume the engine, returning the graph.
    #[must_use]
    pub fn into_graph(self) -> MatchGraph {
        self.graph
    }

    // ========================================================================
    // Manual match operations (C4 surface)
    // ========================================================================

    /// Match a side-A class to a side-B class, cascading to arrays and
    /// unobfuscated members.
    pub fn match_classes(&mut self, a: ClassId, b: ClassId) -> Result<()> {
        arbiter::match_classes(&mut self.graph, a, b)
    }

    /// Match a side-A method to a side-B method, cascading across the
    /// override hierarchy.
    pub fn match_methods(&mut self, a: MethodId, b: MethodId) -> Result<()> {
        arbiter::match_methods(&mut self.graph, a, b)
    }

    /// Match a side-A field to a side-B field.
    pub fn match_fields(&mut self, a: FieldId, b: FieldId) -> Result<()> {
        arbiter::match_fields(&mut self.graph, a, b)
    }

    /// Match a side-A var to a side-B var of the same kind.
    pub fn match_vars(&mut self, a: VarId, b: VarId) -> Result<()> {
        arbiter::match_vars(&mut self.graph, a, b)
    }

    /// Unmatch a class, dropping every member and var link with it.
    pub fn unmatch_class(&mut self, side: Side, id: ClassId) {
        arbiter::unmatch_class(&mut self.graph, side, id);
    }

    /// Unmatch a method, its vars, and its hierarchy members.
    pub fn unmatch_method(&mut self, side: Side, id: MethodId) {
        arbiter::unmatch_method(&mut self.graph, side, id);
    }

    pub fn unmatch_field(&mut self, side: Side, id: FieldId) {
        arbiter::unmatch_field(&mut self.graph, side, id);
    }

    pub fn unmatch_var(&mut self, side: Side, id: VarId) {
        arbiter::unmatch_var(&mut self.graph, side, id);
    }

    // ========================================================================
    // Status / propagation
    // ========================================================================

    /// Totals and matched counts for side A. With `inputs_only`, classes
    /// without an input artifact are skipped.
    #[must_use]
    pub fn status(&self, inputs_only: bool) -> MatchingStatus {
        status::compute(&self.graph, inputs_only)
    }

    /// Spread mapped names across side-B method hierarchies; returns the
    /// number of names assigned.
    pub fn propagate_names(&mut self, progress: ProgressFn<'_>) -> usize {
        propagate::propagate_names(&mut self.graph, progress)
    }
}
