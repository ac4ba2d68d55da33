//! Error types for the diff crate.

use vdelta_types::{ClassificationError, Path};

/// Errors that can occur while computing a diff.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// An input node could not be classified (malformed arena).
    #[error("diff computation failed: {0}")]
    Computation(#[from] ClassificationError),

    /// A self-referential input was met with cycle-fix disabled.
    #[error("cycle detected at {path} with cycle-fix disabled")]
    CycleDetected { path: Path },
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
