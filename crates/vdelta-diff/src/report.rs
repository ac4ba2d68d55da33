//! Per-kind delta calculators and their convenience wrappers.
//!
//! Each calculator runs the structural differ and folds the change list
//! into a [`Delta`] with the key policy of its container kind, adding the
//! pseudo-entries that kind carries:
//!
//! | Calculator | Key policy | Pseudo-entries |
//! |---|---|---|
//! | [`ScalarCalculator`] | n/a | `__value__`, `__type__` |
//! | [`SequenceCalculator`] | first segment as `[i]` | `__length__` |
//! | [`RecordCalculator`] | last segment | none |
//! | [`UnorderedCalculator`] | first segment | `__size__` |
//! | [`AssociativeCalculator`] | first segment | `__size__` |

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;
use vdelta_types::{Kind, Node, Value};

use crate::delta::{Delta, PropertyChange};
use crate::differ::diff_counted;
use crate::error::DiffResult;
use crate::normalize::{ChangeKey, KeyPolicy, LENGTH_KEY, SIZE_KEY, TYPE_KEY, VALUE_KEY};
use crate::options::DiffOptions;

/// A delta plus informational timing and counters.
#[derive(Clone, Debug, Serialize)]
pub struct DiffReport {
    pub delta: Delta,
    pub elapsed: Duration,
    /// Node pairs compared while building the delta.
    pub compared_count: usize,
}

/// Builds a [`Delta`] for one container kind.
pub trait DeltaCalculator {
    /// The kind this calculator summarizes.
    fn kind(&self) -> Kind;

    fn calculate(&self, old: &Value, new: &Value, options: &DiffOptions) -> DiffResult<DiffReport>;
}

pub struct ScalarCalculator;
pub struct SequenceCalculator;
pub struct RecordCalculator;
pub struct UnorderedCalculator;
pub struct AssociativeCalculator;

impl DeltaCalculator for ScalarCalculator {
    fn kind(&self) -> Kind {
        Kind::Scalar
    }

    fn calculate(&self, old: &Value, new: &Value, _options: &DiffOptions) -> DiffResult<DiffReport> {
        let started = Instant::now();
        old.validate()?;
        new.validate()?;

        let mut delta = Delta::new();
        let entry = if old == new {
            PropertyChange::unchanged(old.clone(), new.clone())
        } else {
            PropertyChange::modified(old.clone(), new.clone())
        };
        delta.insert(ChangeKey::new(VALUE_KEY), entry);

        let (old_type, new_type) = (type_name(old)?, type_name(new)?);
        if old_type != new_type {
            delta.insert(
                ChangeKey::new(TYPE_KEY),
                PropertyChange::modified(Value::string(old_type), Value::string(new_type)),
            );
        }
        Ok(finish(delta, started, 1))
    }
}

impl DeltaCalculator for SequenceCalculator {
    fn kind(&self) -> Kind {
        Kind::Sequence
    }

    fn calculate(&self, old: &Value, new: &Value, options: &DiffOptions) -> DiffResult<DiffReport> {
        summarize(self.kind(), LENGTH_KEY, KeyPolicy::Sequence, old, new, options)
    }
}

impl DeltaCalculator for RecordCalculator {
    fn kind(&self) -> Kind {
        Kind::Record
    }

    fn calculate(&self, old: &Value, new: &Value, options: &DiffOptions) -> DiffResult<DiffReport> {
        let started = Instant::now();
        let outcome = diff_counted(old, new, options)?;
        let mut delta = Delta::new();
        delta.extend_from_changes(&outcome.changes, KeyPolicy::Record);
        Ok(finish(delta, started, outcome.compared))
    }
}

impl DeltaCalculator for UnorderedCalculator {
    fn kind(&self) -> Kind {
        Kind::Unordered
    }

    fn calculate(&self, old: &Value, new: &Value, options: &DiffOptions) -> DiffResult<DiffReport> {
        summarize(self.kind(), SIZE_KEY, KeyPolicy::Collection, old, new, options)
    }
}

impl DeltaCalculator for AssociativeCalculator {
    fn kind(&self) -> Kind {
        Kind::Associative
    }

    fn calculate(&self, old: &Value, new: &Value, options: &DiffOptions) -> DiffResult<DiffReport> {
        summarize(self.kind(), SIZE_KEY, KeyPolicy::Collection, old, new, options)
    }
}

/// Shared body of the sized calculators: a cardinality pseudo-entry when
/// both roots are `kind` and their sizes differ, then the changes.
fn summarize(
    kind: Kind,
    size_key: &str,
    policy: KeyPolicy,
    old: &Value,
    new: &Value,
    options: &DiffOptions,
) -> DiffResult<DiffReport> {
    let started = Instant::now();
    let outcome = diff_counted(old, new, options)?;

    let mut delta = Delta::new();
    let (old_node, new_node) = (old.node(old.root())?, new.node(new.root())?);
    if old_node.kind() == kind && new_node.kind() == kind {
        if let (Some(before), Some(after)) = (old_node.cardinality(), new_node.cardinality()) {
            if before != after {
                delta.insert(
                    ChangeKey::new(size_key),
                    PropertyChange::modified(
                        Value::number(before as f64),
                        Value::number(after as f64),
                    ),
                );
            }
        }
    }
    delta.extend_from_changes(&outcome.changes, policy);
    Ok(finish(delta, started, outcome.compared))
}

fn finish(delta: Delta, started: Instant, compared_count: usize) -> DiffReport {
    debug!(
        total = delta.total,
        added = delta.added,
        removed = delta.removed,
        modified = delta.modified,
        "delta calculated"
    );
    DiffReport {
        delta,
        elapsed: started.elapsed(),
        compared_count,
    }
}

/// Dynamic type name: the scalar type for scalars, the kind otherwise.
fn type_name(value: &Value) -> DiffResult<&'static str> {
    Ok(match value.node(value.root())? {
        Node::Scalar(scalar) => scalar.scalar_type().name(),
        other => other.kind().name(),
    })
}

/// The calculator for a root kind. Non-container kinds use the scalar one.
pub fn calculator_for(kind: Kind) -> &'static dyn DeltaCalculator {
    match kind {
        Kind::Sequence => &SequenceCalculator,
        Kind::Record => &RecordCalculator,
        Kind::Unordered => &UnorderedCalculator,
        Kind::Associative => &AssociativeCalculator,
        Kind::Null | Kind::Absent | Kind::Scalar | Kind::Opaque => &ScalarCalculator,
    }
}

/// Pick the calculator from the roots: the shared kind when both roots
/// agree, the scalar calculator when they do not.
pub fn diff_delta(old: &Value, new: &Value, options: &DiffOptions) -> DiffResult<DiffReport> {
    let (old_kind, new_kind) = (old.kind()?, new.kind()?);
    let kind = if old_kind == new_kind { old_kind } else { Kind::Scalar };
    calculator_for(kind).calculate(old, new, options)
}

pub fn diff_scalar(old: &Value, new: &Value) -> DiffResult<DiffReport> {
    ScalarCalculator.calculate(old, new, &DiffOptions::default())
}

pub fn diff_sequence(old: &Value, new: &Value, options: &DiffOptions) -> DiffResult<DiffReport> {
    SequenceCalculator.calculate(old, new, options)
}

pub fn diff_record(old: &Value, new: &Value, options: &DiffOptions) -> DiffResult<DiffReport> {
    RecordCalculator.calculate(old, new, options)
}

pub fn diff_unordered(old: &Value, new: &Value, options: &DiffOptions) -> DiffResult<DiffReport> {
    UnorderedCalculator.calculate(old, new, options)
}

pub fn diff_associative(old: &Value, new: &Value, options: &DiffOptions) -> DiffResult<DiffReport> {
    AssociativeCalculator.calculate(old, new, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::PropertyChangeKind;
    use crate::normalize::ROOT_KEY;
    use serde_json::json;
    use vdelta_types::Scalar;

    fn v(json: serde_json::Value) -> Value {
        Value::from_json(&json)
    }

    fn defaults() -> DiffOptions {
        DiffOptions::default()
    }

    #[test]
    fn scalar_equal_is_unchanged() {
        let report = diff_scalar(&Value::number(1.0), &Value::number(1.0)).unwrap();
        let entry = report.delta.get(VALUE_KEY).unwrap();
        assert_eq!(entry.kind, PropertyChangeKind::Unchanged);
        assert_eq!(report.delta.total, 0);
        assert!(report.delta.get(TYPE_KEY).is_none());
    }

    #[test]
    fn scalar_type_change_reported() {
        let report = diff_scalar(&Value::number(1.0), &Value::string("1")).unwrap();
        let value = report.delta.get(VALUE_KEY).unwrap();
        assert_eq!(value.kind, PropertyChangeKind::Modified);
        let ty = report.delta.get(TYPE_KEY).unwrap();
        assert_eq!(ty.old_value, Some(Value::string("number")));
        assert_eq!(ty.new_value, Some(Value::string("string")));
        assert_eq!(report.delta.modified, 2);
        assert_eq!(report.delta.total, 2);
    }

    #[test]
    fn scalar_same_type_has_no_type_entry() {
        let report = diff_scalar(&Value::string("a"), &Value::string("b")).unwrap();
        assert!(report.delta.get(TYPE_KEY).is_none());
        assert_eq!(report.delta.total, 1);
    }

    #[test]
    fn sequence_length_pseudo_key() {
        let report = diff_sequence(&v(json!([1, 2])), &v(json!([1, 2, 3])), &defaults()).unwrap();
        let length = report.delta.get(LENGTH_KEY).unwrap();
        assert_eq!(length.old_value, Some(Value::number(2.0)));
        assert_eq!(length.new_value, Some(Value::number(3.0)));
        let added = report.delta.get("[2]").unwrap();
        assert_eq!(added.kind, PropertyChangeKind::Added);
        assert_eq!(report.delta.total, 2);
    }

    #[test]
    fn sequence_equal_length_has_no_length_key() {
        let report = diff_sequence(&v(json!([1, 2])), &v(json!([1, 5])), &defaults()).unwrap();
        assert!(report.delta.get(LENGTH_KEY).is_none());
        assert_eq!(report.delta.get("[1]").unwrap().kind, PropertyChangeKind::Modified);
    }

    #[test]
    fn sequence_nested_changes_collapse_to_slot() {
        let report = diff_sequence(
            &v(json!([{"a": 1, "b": 1}])),
            &v(json!([{"a": 2, "b": 2}])),
            &defaults(),
        )
        .unwrap();
        assert_eq!(report.delta.changes.len(), 1);
        let slot = report.delta.get("[0]").unwrap();
        // `b` is compared after `a`, so its change wins the slot.
        assert_eq!(slot.new_value, Some(Value::number(2.0)));
        assert_eq!(slot.old_value, Some(Value::number(1.0)));
    }

    #[test]
    fn record_surfaces_leaf_name() {
        let report = diff_record(
            &v(json!({"user": {"name": "John", "age": 30}})),
            &v(json!({"user": {"name": "Jane", "age": 30}})),
            &defaults(),
        )
        .unwrap();
        assert_eq!(report.delta.changes.len(), 1);
        let name = report.delta.get("name").unwrap();
        assert_eq!(name.kind, PropertyChangeKind::Modified);
        assert_eq!(name.old_value, Some(Value::string("John")));
        assert_eq!(name.new_value, Some(Value::string("Jane")));
        assert_eq!(report.delta.modified, 1);
    }

    #[test]
    fn record_counts_each_kind() {
        let report = diff_record(
            &v(json!({"keep": 1, "modify": "old", "remove": 42})),
            &v(json!({"keep": 1, "modify": "new", "added": [1, 2, 3]})),
            &defaults(),
        )
        .unwrap();
        assert_eq!(report.delta.added, 1);
        assert_eq!(report.delta.removed, 1);
        assert_eq!(report.delta.modified, 1);
        assert_eq!(report.delta.total, 3);
    }

    #[test]
    fn unordered_size_pseudo_key() {
        let build = |items: &[&str]| {
            let mut set = Value::empty_unordered();
            let root = set.root();
            for item in items {
                let id = set.alloc(Node::Scalar(Scalar::String((*item).into())));
                set.push_element(root, id).unwrap();
            }
            set
        };
        let report = diff_unordered(&build(&["a"]), &build(&["a", "b"]), &defaults()).unwrap();
        let size = report.delta.get(SIZE_KEY).unwrap();
        assert_eq!(size.old_value, Some(Value::number(1.0)));
        assert_eq!(size.new_value, Some(Value::number(2.0)));
        assert_eq!(report.delta.get("1").unwrap().kind, PropertyChangeKind::Added);
    }

    #[test]
    fn associative_keys_are_projected() {
        let build = |entries: &[(bool, f64)]| {
            let mut map = Value::empty_associative();
            let root = map.root();
            for (k, val) in entries {
                let key = map.alloc(Node::Scalar(Scalar::Boolean(*k)));
                let val = map.alloc(Node::Scalar(Scalar::Number(*val)));
                map.insert_entry(root, key, val).unwrap();
            }
            map
        };
        let report = diff_associative(
            &build(&[(true, 1.0)]),
            &build(&[(true, 2.0), (false, 0.0)]),
            &defaults(),
        )
        .unwrap();
        assert!(report.delta.get(SIZE_KEY).is_some());
        assert_eq!(report.delta.get("key_true").unwrap().kind, PropertyChangeKind::Modified);
        assert_eq!(report.delta.get("key_false").unwrap().kind, PropertyChangeKind::Added);
    }

    #[test]
    fn mismatched_roots_use_root_key() {
        let report = diff_sequence(&v(json!([1])), &v(json!({"a": 1})), &defaults()).unwrap();
        assert!(report.delta.get(LENGTH_KEY).is_none());
        assert_eq!(report.delta.get(ROOT_KEY).unwrap().kind, PropertyChangeKind::Modified);
    }

    #[test]
    fn auto_selection_by_root_kind() {
        let report = diff_delta(&v(json!([1, 2])), &v(json!([1])), &defaults()).unwrap();
        assert!(report.delta.get(LENGTH_KEY).is_some());
        let report = diff_delta(&v(json!(1)), &v(json!([1])), &defaults()).unwrap();
        assert!(report.delta.get(TYPE_KEY).is_some());
        assert_eq!(calculator_for(Kind::Opaque).kind(), Kind::Scalar);
    }

    #[test]
    fn identical_inputs_yield_empty_delta() {
        let doc = json!({"a": [1, 2, {"b": true}]});
        let report = diff_record(&v(doc.clone()), &v(doc), &defaults()).unwrap();
        assert!(report.delta.is_empty());
        assert!(report.compared_count > 0);
    }
}
