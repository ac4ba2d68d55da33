//! Structural diff and patch for heterogeneous values.
//!
//! This is the main entry point for applications embedding vdelta. It
//! re-exports the value model, the differ and the applier, and wraps the
//! stateless collaborators (hashing, text codec, deep copy) behind one
//! error type.
//!
//! ```
//! use serde_json::json;
//! use vdelta::{apply, diff, DiffOptions, Value};
//!
//! let old = Value::from_json(&json!({"user": {"name": "John"}}));
//! let new = Value::from_json(&json!({"user": {"name": "Jane"}}));
//! let patch = diff(&old, &new, &DiffOptions::default()).unwrap();
//! assert_eq!(apply(&old, &patch).unwrap(), new);
//! ```

pub mod engine;
pub mod error;

pub use engine::Engine;
pub use error::{Error, Result};

pub use vdelta_diff::{
    change_key, diff_associative, diff_delta, diff_record, diff_scalar, diff_sequence,
    diff_unordered, Change, ChangeKey, ChangeKind, Delta, DeltaCalculator, DiffOptions,
    DiffReport, KeyPolicy, Patch, PropertyChange, PropertyChangeKind,
};
pub use vdelta_types::{
    classify, Classification, ContentDigest, Key, Kind, Node, NodeId, Path, Scalar, Value,
    ValueHasher,
};

/// Compute the ordered change list turning `old` into `new`.
pub fn diff(old: &Value, new: &Value, options: &DiffOptions) -> Result<Patch> {
    Ok(vdelta_diff::diff(old, new, options)?)
}

/// Apply `patch` to a copy of `base`.
pub fn apply(base: &Value, patch: &[Change]) -> Result<Value> {
    Ok(vdelta_patch::apply(base, patch)?)
}

/// Content digest of a value. Structurally equal values share a digest.
pub fn hash_of(value: &Value) -> Result<ContentDigest> {
    Ok(ValueHasher::VALUE.hash_value(value)?)
}

/// Content digest of raw bytes, in a domain separate from values.
pub fn hash_bytes(bytes: &[u8]) -> ContentDigest {
    ValueHasher::BYTES.hash(bytes)
}

/// Lossless text form of a value, cycles included.
pub fn to_text(value: &Value) -> Result<String> {
    Ok(vdelta_types::to_text(value)?)
}

pub fn from_text(text: &str) -> Result<Value> {
    Ok(vdelta_types::from_text(text)?)
}

/// Stand-alone deep copy holding only the nodes reachable from the root.
pub fn copy(value: &Value) -> Result<Value> {
    Ok(value.compacted()?)
}
