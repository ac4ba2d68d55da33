//! Error types for the patch crate.

use vdelta_types::{ClassificationError, Key, Kind, Path};

/// Errors from applying a patch.
///
/// The base value is never touched, so an error leaves the caller's data
/// exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// The base or a patch value is a malformed arena.
    #[error("malformed value: {0}")]
    Classification(#[from] ClassificationError),

    /// A path segment addresses into a value that cannot hold it, such as
    /// an index into a scalar or a field name into a sequence.
    #[error("cannot address {segment} inside {found} at {path}")]
    IncompatibleSegment {
        path: Path,
        segment: Key,
        found: Kind,
    },

    /// A segment addressing an unordered collection is not a position.
    #[error("segment {segment} at {path} is not a collection position")]
    InvalidPosition { path: Path, segment: Key },
}

/// Result alias for patch operations.
pub type ApplyResult<T> = Result<T, ApplyError>;
