//! Entity graph for two-sided class matching.
//!
//! This module defines the canonical data structures the matching core
//! operates on: classes, methods, fields, and method vars, held in per-side
//! arenas inside a [`MatchGraph`]. The loader populates the graph once
//! through the declaration API; afterwards only match links and mapped/tmp
//! names mutate, and only through the arbiter and the name surface.

mod cache;
mod entity;
mod graph;

pub use cache::{CacheKey, CacheStats, ClassifierCache};
pub use entity::{
    ClassDecl, ClassEntity, ClassId, FieldDecl, FieldEntity, FieldId, Insn, InsnOperand,
    MethodDecl, MethodEntity, MethodId, Side, VarDecl, VarEntity, VarId, VarKind,
};
pub use graph::{EntitySet, MatchGraph};
