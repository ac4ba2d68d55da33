//! Diff engine for vdelta.
//!
//! Compares two [`Value`](vdelta_types::Value)s structurally and produces
//! an ordered, path-addressed change list, plus per-kind summaries of it.
//!
//! # Key Types
//!
//! - [`diff`] / [`Change`] / [`Patch`] -- Structural differ and its change list
//! - [`DiffOptions`] -- Cycle handling, order-insensitive sequences, ignored keys
//! - [`change_key`] / [`ChangeKey`] -- Lossy path flattening per container kind
//! - [`Delta`] / [`PropertyChange`] -- Summarized changes with counts
//! - [`DeltaCalculator`] / [`DiffReport`] -- Per-kind calculators and wrappers

pub mod change;
pub mod delta;
pub mod differ;
pub mod error;
pub mod normalize;
pub mod options;
pub mod report;

pub use change::{Change, ChangeKind, Patch};
pub use delta::{Delta, PropertyChange, PropertyChangeKind};
pub use differ::{diff, diff_counted, DiffOutcome};
pub use error::{DiffError, DiffResult};
pub use normalize::{
    change_key, ChangeKey, KeyPolicy, LENGTH_KEY, ROOT_KEY, SIZE_KEY, TYPE_KEY, VALUE_KEY,
};
pub use options::DiffOptions;
pub use report::{
    calculator_for, diff_associative, diff_delta, diff_record, diff_scalar, diff_sequence,
    diff_unordered, AssociativeCalculator, DeltaCalculator, DiffReport, RecordCalculator,
    ScalarCalculator, SequenceCalculator, UnorderedCalculator,
};
