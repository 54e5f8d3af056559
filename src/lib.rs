//! **A matching engine for obfuscated class artifacts.**
//!
//! `classmatch` takes two sets of compiled classes (sides A and B) that
//! represent two versions of the same program with renamed symbols, and
//! derives a correspondence: classes to classes, methods to methods, fields
//! to fields, and per-method args/locals to their counterparts. The output
//! feeds a mapping emitter that writes human-readable mapping files.
//!
//! The crate is the matching core only. Artifact parsing, instruction
//! decoding, mapping file I/O, and any CLI live outside; they interact with
//! the core through the graph-population surface on [`MatchGraph`] and the
//! operations on [`MatchEngine`].
//!
//! ## Core Concepts & Modules
//!
//! - **[`model`]**: the entity graph. Per-side arenas of classes, methods,
//!   fields, and method vars, with bidirectional match links, method
//!   override-hierarchy sets, and the process-scoped classifier cache.
//! - **[`matching`]**: pure scoring. One classifier per entity kind, each a
//!   weighted composition of criteria enabled progressively by
//!   [`MatchLevel`], plus the rank-acceptance check and the instruction
//!   similarity metric.
//! - **[`engine`]**: the mutating side. The match arbiter (contract checks,
//!   cascades, cache invalidation), the parallel auto-match driver, merge
//!   verification, and mapped-name propagation.
//!
//! ## Getting Started
//!
//! ```no_run
//! use classmatch::{MatchEngine, MatchGraph, Side};
//! use classmatch::model::ClassDecl;
//!
//! fn main() -> classmatch::Result<()> {
//!     // Normally the class loader populates the graph.
//!     let mut graph = MatchGraph::new();
//!     graph.add_class(Side::A, ClassDecl::input("La;", "a"))?;
//!     graph.add_class(Side::B, ClassDecl::input("Lb;", "b"))?;
//!
//!     let mut engine = MatchEngine::new(graph);
//!     engine.match_trivial()?;
//!     engine.auto_match_all(&classmatch::engine::ignore_progress)?;
//!
//!     println!("{}", engine.status(true));
//!     Ok(())
//! }
//! ```
//!
//! ## Concurrency model
//!
//! Auto-match passes have exactly two phases: a parallel scoring phase that
//! reads the graph and writes only the classifier cache, and a serial commit
//! phase in which the arbiter mutates match links. The split is enforced by
//! the borrow checker: scoring borrows the graph shared, committing borrows
//! it exclusively.

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]
#![allow(
    // Cast safety: usize↔f64 casts are pervasive in similarity math — counts
    // are bounded by input size in practice
    clippy::cast_precision_loss,
    // Variable names like `ma`/`mb` or `a`/`b` are clear in two-sided context
    clippy::similar_names
)]

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod matching;
pub mod model;

// Re-export main types for convenience
pub use config::MatchConfig;
pub use engine::{ignore_progress, MatchEngine, MatchingStatus, ProgressFn};
pub use error::{ClassMatchError, ErrorContext, Result};
pub use matching::{check_rank, normalized_score, raw_from_score, MatchLevel, RankResult};
pub use model::{
    ClassId, FieldId, MatchGraph, MethodId, Side, VarId, VarKind,
};
