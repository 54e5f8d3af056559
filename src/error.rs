//! Unified error types for classmatch.
//!
//! The matching core fails fast on contract violations: every check runs
//! before the first mutation, so the entity graph is left intact whenever an
//! error surfaces.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for classmatch operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClassMatchError {
    /// A match/unmatch precondition was violated
    #[error("Match contract violated: {context}")]
    Contract {
        context: String,
        #[source]
        source: ContractErrorKind,
    },

    /// Errors surfaced while populating or querying the entity graph
    #[error("Entity graph error: {context}")]
    Graph {
        context: String,
        #[source]
        source: GraphErrorKind,
    },

    /// IO errors with context (loader-side failures propagate through here)
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Specific contract violation kinds.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ContractErrorKind {
    #[error("array dimension mismatch: {a} vs {b}")]
    ArrayDimensionMismatch { a: u8, b: u8 },

    #[error("classes of '{subject}' and '{candidate}' are not matched to each other")]
    ClassesNotMatched { subject: String, candidate: String },

    #[error("methods of '{subject}' and '{candidate}' are not matched to each other")]
    MethodsNotMatched { subject: String, candidate: String },

    #[error("cannot pair an argument var with a local var")]
    VarKindMismatch,
}

/// Specific graph error kinds.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GraphErrorKind {
    #[error("duplicate class id: {0}")]
    DuplicateClassId(String),

    #[error("class {0} is not an array class")]
    NotAnArrayClass(String),

    #[error("referenced entity belongs to the opposite side")]
    SideMismatch,
}

// ============================================================================
// Result type alias
// ============================================================================

/// Convenient Result type for classmatch operations
pub type Result<T> = std::result::Result<T, ClassMatchError>;

// ============================================================================
// Error construction helpers
// ============================================================================

impl ClassMatchError {
    /// Create a contract violation with context
    pub fn contract(context: impl Into<String>, source: ContractErrorKind) -> Self {
        Self::Contract {
            context: context.into(),
            source,
        }
    }

    /// Create a graph error with context
    pub fn graph(context: impl Into<String>, source: GraphErrorKind) -> Self {
        Self::Graph {
            context: context.into(),
            source,
        }
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        let message = format!("{source}");
        Self::Io {
            path: Some(path),
            message,
            source,
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<std::io::Error> for ClassMatchError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}

// ============================================================================
// Error context extension trait
// ============================================================================

/// Extension trait for adding context to errors.
///
/// Context strings chain outermost-first, tracing the path through the code
/// that produced the failure.
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context from a closure (lazy evaluation).
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: Into<ClassMatchError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        let ctx: String = context.into();
        self.map_err(|e| add_context_to_error(e.into(), &ctx))
    }

    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| {
            let ctx: String = f().into();
            add_context_to_error(e.into(), &ctx)
        })
    }
}

fn add_context_to_error(err: ClassMatchError, new_ctx: &str) -> ClassMatchError {
    match err {
        ClassMatchError::Contract {
            context: existing,
            source,
        } => ClassMatchError::Contract {
            context: chain_context(new_ctx, &existing),
            source,
        },
        ClassMatchError::Graph {
            context: existing,
            source,
        } => ClassMatchError::Graph {
            context: chain_context(new_ctx, &existing),
            source,
        },
        ClassMatchError::Io {
            path,
            message,
            source,
        } => ClassMatchError::Io {
            path,
            message: chain_context(new_ctx, &message),
            source,
        },
        ClassMatchError::Config(msg) => ClassMatchError::Config(chain_context(new_ctx, &msg)),
    }
}

/// Chain two context strings together.
fn chain_context(new: &str, existing: &str) -> String {
    if existing.is_empty() {
        new.to_string()
    } else {
        format!("{new}: {existing}")
    }
}
