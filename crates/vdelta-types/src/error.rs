use thiserror::Error;

use crate::kind::Kind;
use crate::value::NodeId;

/// A node could not be assigned a kind, or was not the kind an operation
/// required.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    /// A child or root reference points outside the arena.
    #[error("node {id} does not resolve in an arena of {len} nodes")]
    DanglingNode { id: NodeId, len: usize },

    /// The node exists but has a different kind than the operation needs.
    #[error("node {id} is {found}, expected {expected}")]
    UnexpectedKind {
        id: NodeId,
        expected: Kind,
        found: Kind,
    },
}

/// Result alias for arena and classification operations.
pub type TypeResult<T> = Result<T, ClassificationError>;

/// Errors from the text codec.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Plain JSON has no way to express a back-reference.
    #[error("value is cyclic at node {0}")]
    Cyclic(NodeId),

    #[error("malformed value: {0}")]
    Classification(#[from] ClassificationError),
}

/// Errors from parsing a hex digest.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DigestError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
