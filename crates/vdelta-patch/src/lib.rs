//! Patch applier for vdelta.
//!
//! [`apply`] replays an ordered change list produced by
//! [`vdelta_diff::diff`] onto a copy of a base value. Sequence removals are
//! deferred: a deleted slot is first overwritten with a sentinel and the
//! sequence is compacted once every change has been applied, so later
//! changes in the same patch still see the original indices.

pub mod apply;
pub mod error;

pub use apply::apply;
pub use error::{ApplyError, ApplyResult};
