//! Structural differ: recursive comparison of two values.
//!
//! The differ walks both arenas in lockstep and emits a flat, ordered
//! [`Patch`]. Containers of the same kind are recursed into; everything
//! else is compared as a whole and replaced with a single `Update`.
//!
//! - Records are compared key by key (sorted): keys of `old` first, then
//!   keys only present in `new`.
//! - Sequences are positional by default. With
//!   [`DiffOptions::order_insensitive`] they are matched as multisets.
//! - Unordered collections are keyed by iteration position (`"0"`, `"1"`,
//!   ...) and associative collections by projected key, then compared like
//!   records. Element changes are therefore position sensitive.
//!
//! # Cycles
//!
//! Every container pair under comparison is recorded as open. Meeting an
//! open pair again ends that branch with no changes when cycle-fix is on,
//! and fails with [`DiffError::CycleDetected`] when it is off.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, trace};

use vdelta_types::{Node, NodeId, Path, Value};

use crate::change::{Change, Patch};
use crate::error::{DiffError, DiffResult};
use crate::options::DiffOptions;

/// A change list plus the number of node pairs compared to produce it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiffOutcome {
    pub changes: Patch,
    pub compared: usize,
}

/// Compute the ordered change list turning `old` into `new`.
pub fn diff(old: &Value, new: &Value, options: &DiffOptions) -> DiffResult<Patch> {
    Ok(diff_counted(old, new, options)?.changes)
}

/// Like [`diff`], also reporting how many node pairs were compared.
pub fn diff_counted(old: &Value, new: &Value, options: &DiffOptions) -> DiffResult<DiffOutcome> {
    // Classify both arenas up front so a failure never yields a partial patch.
    old.validate()?;
    new.validate()?;

    let mut differ = Differ::new(old, new, options, HashSet::new());
    let old_root = old.present(old.root())?;
    let new_root = new.present(new.root())?;
    differ.compare_slots(Path::root(), old_root, new_root)?;

    debug!(
        changes = differ.changes.len(),
        compared = differ.compared,
        "diff complete"
    );
    Ok(DiffOutcome {
        changes: differ.changes,
        compared: differ.compared,
    })
}

struct Differ<'a> {
    old: &'a Value,
    new: &'a Value,
    options: &'a DiffOptions,
    /// Container pairs currently being compared.
    open: HashSet<(NodeId, NodeId)>,
    changes: Patch,
    compared: usize,
}

impl<'a> Differ<'a> {
    fn new(
        old: &'a Value,
        new: &'a Value,
        options: &'a DiffOptions,
        open: HashSet<(NodeId, NodeId)>,
    ) -> Self {
        Self {
            old,
            new,
            options,
            open,
            changes: Vec::new(),
            compared: 0,
        }
    }

    /// Compare two slots where `None` means no value.
    fn compare_slots(
        &mut self,
        path: Path,
        old: Option<NodeId>,
        new: Option<NodeId>,
    ) -> DiffResult<()> {
        match (old, new) {
            (None, None) => Ok(()),
            (None, Some(n)) => self.emit_create(path, n),
            (Some(o), None) => self.emit_delete(path, o),
            (Some(o), Some(n)) => self.compare(path, o, n),
        }
    }

    fn compare(&mut self, path: Path, o: NodeId, n: NodeId) -> DiffResult<()> {
        self.compared += 1;
        let old: &'a Value = self.old;
        let new: &'a Value = self.new;
        let (old_node, new_node) = (old.node(o)?, new.node(n)?);

        match (old_node, new_node) {
            (Node::Null, Node::Null) | (Node::Absent, Node::Absent) => Ok(()),
            (Node::Scalar(a), Node::Scalar(b)) if a == b => Ok(()),
            (Node::Opaque(a), Node::Opaque(b)) if a == b => Ok(()),
            (Node::Record(a), Node::Record(b)) => {
                self.nested(&path, o, n, |d| d.compare_fields(&path, a, b))
            }
            (Node::Sequence(a), Node::Sequence(b)) => {
                self.nested(&path, o, n, |d| d.compare_sequence(&path, a, b))
            }
            (Node::Unordered(a), Node::Unordered(b)) => {
                self.nested(&path, o, n, |d| d.compare_unordered(&path, a, b))
            }
            (Node::Associative(_), Node::Associative(_)) => {
                let a = old.projected_entries(o)?;
                let b = new.projected_entries(n)?;
                self.nested(&path, o, n, |d| d.compare_fields(&path, &a, &b))
            }
            _ => self.emit_update(path, o, n),
        }
    }

    /// Run `body` with the pair `(o, n)` marked open.
    fn nested<F>(&mut self, path: &Path, o: NodeId, n: NodeId, body: F) -> DiffResult<()>
    where
        F: FnOnce(&mut Self) -> DiffResult<()>,
    {
        if self.open.contains(&(o, n)) {
            if !self.options.cycles_fix {
                return Err(DiffError::CycleDetected { path: path.clone() });
            }
            trace!(%path, "cycle short-circuited");
            return Ok(());
        }
        self.open.insert((o, n));
        body(self)?;
        self.open.remove(&(o, n));
        Ok(())
    }

    fn compare_fields(
        &mut self,
        path: &Path,
        old: &BTreeMap<String, NodeId>,
        new: &BTreeMap<String, NodeId>,
    ) -> DiffResult<()> {
        for (key, o) in old {
            if self.options.ignores(key) {
                continue;
            }
            let n = match new.get(key) {
                Some(n) => self.new.present(*n)?,
                None => None,
            };
            let o = self.old.present(*o)?;
            self.compare_slots(path.child(key.as_str()), o, n)?;
        }
        for (key, n) in new {
            if old.contains_key(key) || self.options.ignores(key) {
                continue;
            }
            let n = self.new.present(*n)?;
            self.compare_slots(path.child(key.as_str()), None, n)?;
        }
        Ok(())
    }

    fn compare_unordered(&mut self, path: &Path, old: &[NodeId], new: &[NodeId]) -> DiffResult<()> {
        for position in 0..old.len().max(new.len()) {
            let key = position.to_string();
            if self.options.ignores(&key) {
                continue;
            }
            let o = match old.get(position) {
                Some(o) => self.old.present(*o)?,
                None => None,
            };
            let n = match new.get(position) {
                Some(n) => self.new.present(*n)?,
                None => None,
            };
            self.compare_slots(path.child(key), o, n)?;
        }
        Ok(())
    }

    fn compare_sequence(&mut self, path: &Path, old: &[NodeId], new: &[NodeId]) -> DiffResult<()> {
        if self.options.order_insensitive {
            return self.compare_multiset(path, old, new);
        }

        for (i, (o, n)) in old.iter().zip(new).enumerate() {
            match (self.old.present(*o)?, self.new.present(*n)?) {
                (None, None) => {}
                (Some(o), Some(n)) => self.compare(path.child(i), o, n)?,
                // The slot exists on both sides; only its content differs.
                _ => self.emit_update(path.child(i), *o, *n)?,
            }
        }
        let overlap = old.len().min(new.len());
        for (i, n) in new.iter().enumerate().skip(overlap) {
            self.emit_create(path.child(i), *n)?;
        }
        for (i, o) in old.iter().enumerate().skip(overlap) {
            self.emit_delete(path.child(i), *o)?;
        }
        Ok(())
    }

    /// Multiset comparison: each `old` element claims the first unclaimed
    /// equivalent `new` element. Leftover `old` elements are deleted in
    /// place; leftover `new` elements are created at append positions past
    /// the end of `old`.
    fn compare_multiset(&mut self, path: &Path, old: &[NodeId], new: &[NodeId]) -> DiffResult<()> {
        let mut claimed = vec![false; new.len()];
        let mut leftover = Vec::new();

        for (i, o) in old.iter().enumerate() {
            let mut hit = None;
            for (j, n) in new.iter().enumerate() {
                if !claimed[j] && self.equivalent(*o, *n)? {
                    hit = Some(j);
                    break;
                }
            }
            match hit {
                Some(j) => claimed[j] = true,
                None => leftover.push(i),
            }
        }

        for i in leftover {
            self.emit_delete(path.child(i), old[i])?;
        }
        let unclaimed = new
            .iter()
            .zip(&claimed)
            .filter(|(_, taken)| !**taken)
            .map(|(n, _)| *n);
        for (k, n) in unclaimed.enumerate() {
            self.emit_create(path.child(old.len() + k), n)?;
        }
        Ok(())
    }

    /// Whether two elements produce no changes under the current options.
    fn equivalent(&mut self, o: NodeId, n: NodeId) -> DiffResult<bool> {
        let mut trial = Differ::new(self.old, self.new, self.options, self.open.clone());
        let result = trial.compare_slots(
            Path::root(),
            self.old.present(o)?,
            self.new.present(n)?,
        );
        self.compared += trial.compared;
        result?;
        Ok(trial.changes.is_empty())
    }

    fn emit_create(&mut self, path: Path, n: NodeId) -> DiffResult<()> {
        let new_value = self.new.subtree(n)?;
        self.changes.push(Change::Create { path, new_value });
        Ok(())
    }

    fn emit_delete(&mut self, path: Path, o: NodeId) -> DiffResult<()> {
        let old_value = self.old.subtree(o)?;
        self.changes.push(Change::Delete { path, old_value });
        Ok(())
    }

    fn emit_update(&mut self, path: Path, o: NodeId, n: NodeId) -> DiffResult<()> {
        let old_value = self.old.subtree(o)?;
        let new_value = self.new.subtree(n)?;
        self.changes.push(Change::Update {
            path,
            old_value,
            new_value,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeKind;
    use serde_json::json;
    use vdelta_types::{Key, Scalar};

    fn v(json: serde_json::Value) -> Value {
        Value::from_json(&json)
    }

    fn run(old: serde_json::Value, new: serde_json::Value) -> Patch {
        diff(&v(old), &v(new), &DiffOptions::default()).unwrap()
    }

    fn path(keys: Vec<Key>) -> Path {
        Path::from(keys)
    }

    fn self_referential(name: &str) -> Value {
        let mut value = Value::empty_record();
        let root = value.root();
        let leaf = value.alloc(Node::Scalar(Scalar::String(name.into())));
        value.insert_field(root, "name", leaf).unwrap();
        value.insert_field(root, "self", root).unwrap();
        value
    }

    #[test]
    fn identical_values_no_changes() {
        let doc = json!({"a": [1, {"b": null}], "c": "x"});
        assert!(run(doc.clone(), doc).is_empty());
    }

    #[test]
    fn scalar_update_at_root() {
        let patch = run(json!(1), json!(2));
        assert_eq!(
            patch,
            vec![Change::Update {
                path: Path::root(),
                old_value: Value::number(1.0),
                new_value: Value::number(2.0),
            }]
        );
    }

    #[test]
    fn scalar_type_change_is_one_update() {
        let patch = run(json!(1), json!("1"));
        assert_eq!(patch.len(), 1);
        assert_eq!(patch[0].kind(), ChangeKind::Update);
    }

    #[test]
    fn record_create_delete_update() {
        let patch = run(
            json!({"keep": 1, "modify": "old", "remove": true}),
            json!({"keep": 1, "modify": "new", "added": [1]}),
        );
        assert_eq!(patch.len(), 3);
        assert_eq!(patch[0].kind(), ChangeKind::Update);
        assert_eq!(patch[0].path(), &path(vec!["modify".into()]));
        assert_eq!(patch[1].kind(), ChangeKind::Delete);
        assert_eq!(patch[1].path(), &path(vec!["remove".into()]));
        assert_eq!(patch[2].kind(), ChangeKind::Create);
        assert_eq!(patch[2].new_value(), Some(&v(json!([1]))));
    }

    #[test]
    fn nested_record_change_has_full_path() {
        let patch = run(
            json!({"user": {"name": "John", "age": 30}}),
            json!({"user": {"name": "Jane", "age": 30}}),
        );
        assert_eq!(patch.len(), 1);
        assert_eq!(patch[0].path(), &path(vec!["user".into(), "name".into()]));
        assert_eq!(patch[0].old_value(), Some(&Value::string("John")));
        assert_eq!(patch[0].new_value(), Some(&Value::string("Jane")));
    }

    #[test]
    fn kind_mismatch_replaces_whole_value() {
        let patch = run(json!({"a": [1, 2]}), json!({"a": {"0": 1}}));
        assert_eq!(patch.len(), 1);
        assert_eq!(patch[0].kind(), ChangeKind::Update);
        assert_eq!(patch[0].path(), &path(vec!["a".into()]));
    }

    #[test]
    fn null_is_not_an_empty_container() {
        let patch = run(json!({"a": null}), json!({"a": {}}));
        assert_eq!(patch.len(), 1);
        assert_eq!(patch[0].kind(), ChangeKind::Update);
    }

    #[test]
    fn positional_sequence_growth_and_shrink() {
        let grown = run(json!([1, 2]), json!([1, 2, 3, 4]));
        assert_eq!(grown.len(), 2);
        assert!(grown.iter().all(|c| c.kind() == ChangeKind::Create));
        assert_eq!(grown[0].path(), &path(vec![2.into()]));
        assert_eq!(grown[1].path(), &path(vec![3.into()]));

        let shrunk = run(json!([1, 2, 3]), json!([1]));
        assert_eq!(shrunk.len(), 2);
        assert!(shrunk.iter().all(|c| c.kind() == ChangeKind::Delete));
        assert_eq!(shrunk[0].path(), &path(vec![1.into()]));
    }

    #[test]
    fn permutation_is_three_positional_updates() {
        let patch = run(json!([1, 2, 3]), json!([3, 1, 2]));
        assert_eq!(patch.len(), 3);
        for (i, change) in patch.iter().enumerate() {
            assert_eq!(change.kind(), ChangeKind::Update);
            assert_eq!(change.path(), &path(vec![i.into()]));
        }
    }

    #[test]
    fn permutation_is_empty_when_order_insensitive() {
        let options = DiffOptions::default().with_order_insensitive();
        let patch = diff(&v(json!([1, 2, 3])), &v(json!([3, 1, 2])), &options).unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn order_insensitive_with_duplicates() {
        let options = DiffOptions::default().with_order_insensitive();
        let patch = diff(&v(json!([1, 1, 2])), &v(json!([2, 1, 3])), &options).unwrap();
        // One `1` is unmatched on the old side, `3` is new.
        assert_eq!(patch.len(), 2);
        assert_eq!(patch[0].kind(), ChangeKind::Delete);
        assert_eq!(patch[0].path(), &path(vec![1.into()]));
        assert_eq!(patch[1].kind(), ChangeKind::Create);
        assert_eq!(patch[1].path(), &path(vec![3.into()]));
        assert_eq!(patch[1].new_value(), Some(&Value::number(3.0)));
    }

    #[test]
    fn order_insensitive_applies_to_nested_sequences() {
        let options = DiffOptions::default().with_order_insensitive();
        let patch = diff(
            &v(json!([{"tags": ["a", "b"]}, 2])),
            &v(json!([2, {"tags": ["b", "a"]}])),
            &options,
        )
        .unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn ignore_keys_apply_at_any_depth() {
        let options = DiffOptions::default().with_ignore_keys(["updated_at"]);
        let patch = diff(
            &v(json!({"updated_at": 1, "item": {"updated_at": 2, "n": 1}})),
            &v(json!({"updated_at": 9, "item": {"updated_at": 8, "n": 2}, "list": [{"updated_at": 0}]})),
            &options,
        )
        .unwrap();
        assert_eq!(patch.len(), 2);
        assert_eq!(patch[0].path(), &path(vec!["item".into(), "n".into()]));
        assert_eq!(patch[1].path(), &path(vec!["list".into()]));
    }

    #[test]
    fn self_referential_records_diff_clean() {
        let patch = diff(
            &self_referential("a"),
            &self_referential("a"),
            &DiffOptions::default(),
        )
        .unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn self_referential_records_report_leaf_change() {
        let patch = diff(
            &self_referential("a"),
            &self_referential("b"),
            &DiffOptions::default(),
        )
        .unwrap();
        assert_eq!(patch.len(), 1);
        assert_eq!(patch[0].path(), &path(vec!["name".into()]));
    }

    #[test]
    fn cycles_rejected_without_fix() {
        let err = diff(
            &self_referential("a"),
            &self_referential("a"),
            &DiffOptions::default().without_cycles_fix(),
        )
        .unwrap_err();
        assert!(matches!(err, DiffError::CycleDetected { .. }));
    }

    #[test]
    fn unordered_collections_keyed_by_position() {
        let mut old = Value::empty_unordered();
        let mut new = Value::empty_unordered();
        for (target, items) in [(&mut old, [1.0, 2.0].as_slice()), (&mut new, [1.0, 5.0, 6.0].as_slice())] {
            let root = target.root();
            for n in items {
                let id = target.alloc(Node::Scalar(Scalar::Number(*n)));
                target.push_element(root, id).unwrap();
            }
        }
        let patch = diff(&old, &new, &DiffOptions::default()).unwrap();
        assert_eq!(patch.len(), 2);
        assert_eq!(patch[0].path(), &path(vec!["1".into()]));
        assert_eq!(patch[0].kind(), ChangeKind::Update);
        assert_eq!(patch[1].path(), &path(vec!["2".into()]));
        assert_eq!(patch[1].kind(), ChangeKind::Create);
    }

    #[test]
    fn associative_collections_keyed_by_projection() {
        let build = |entries: &[(f64, &str)]| {
            let mut map = Value::empty_associative();
            let root = map.root();
            for (k, val) in entries {
                let key = map.alloc(Node::Scalar(Scalar::Number(*k)));
                let val = map.alloc(Node::Scalar(Scalar::String((*val).into())));
                map.insert_entry(root, key, val).unwrap();
            }
            map
        };
        let patch = diff(
            &build(&[(1.0, "a"), (2.0, "b")]),
            &build(&[(2.0, "c"), (3.0, "d")]),
            &DiffOptions::default(),
        )
        .unwrap();
        assert_eq!(patch.len(), 3);
        assert_eq!(patch[0].kind(), ChangeKind::Delete);
        assert_eq!(patch[0].path(), &path(vec!["key_1".into()]));
        assert_eq!(patch[1].kind(), ChangeKind::Update);
        assert_eq!(patch[1].path(), &path(vec!["key_2".into()]));
        assert_eq!(patch[2].kind(), ChangeKind::Create);
        assert_eq!(patch[2].path(), &path(vec!["key_3".into()]));
    }

    #[test]
    fn opaque_values_compare_by_token() {
        assert!(diff(
            &Value::opaque("Date", "2024-01-01"),
            &Value::opaque("Date", "2024-01-01"),
            &DiffOptions::default()
        )
        .unwrap()
        .is_empty());
        let patch = diff(
            &Value::opaque("Date", "2024-01-01"),
            &Value::opaque("RegExp", "2024-01-01"),
            &DiffOptions::default(),
        )
        .unwrap();
        assert_eq!(patch.len(), 1);
    }

    #[test]
    fn absent_root_is_created() {
        let patch = diff(&Value::absent(), &Value::number(1.0), &DiffOptions::default()).unwrap();
        assert_eq!(patch.len(), 1);
        assert_eq!(patch[0].kind(), ChangeKind::Create);
        assert!(patch[0].path().is_root());
    }

    #[test]
    fn malformed_arena_is_a_computation_error() {
        let text = r#"{"nodes":[{"sequence":[3]}],"root":0}"#;
        let broken: Value = serde_json::from_str(text).unwrap();
        let err = diff(&broken, &v(json!([])), &DiffOptions::default()).unwrap_err();
        assert!(matches!(err, DiffError::Computation(_)));
    }

    #[test]
    fn compared_count_grows_with_input() {
        let small = diff_counted(&v(json!([1])), &v(json!([1])), &DiffOptions::default()).unwrap();
        let large = diff_counted(
            &v(json!([1, 2, 3, 4])),
            &v(json!([1, 2, 3, 4])),
            &DiffOptions::default(),
        )
        .unwrap();
        assert!(large.compared > small.compared);
    }
}
