//! Replay of a change list onto a working copy of a value.
//!
//! Application happens in two phases:
//!
//! 1. Every change is applied in patch order. `Create`/`Update` resolve
//!    the parent path, creating missing intermediate containers (a record
//!    before a field segment, a sequence before an index segment), and set
//!    the leaf. `Delete` removes record and associative entries at once but
//!    only marks sequence and unordered slots with a shared sentinel node,
//!    registering the container's path.
//! 2. Each registered container is compacted, deepest path first, by
//!    dropping its sentinel slots.
//!
//! The base is cloned before phase 1, so cycles in it survive as cycles in
//! the result and the base itself is never mutated.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use vdelta_diff::Change;
use vdelta_types::{Key, Kind, Node, NodeId, Opaque, Path, Scalar, Value};

use crate::error::{ApplyError, ApplyResult};

/// Marks a deleted slot until compaction. Matched by node identity.
const SENTINEL_TYPE: &str = "vdelta::deleted-slot";

/// Apply `patch` to a copy of `base` and return the result.
pub fn apply(base: &Value, patch: &[Change]) -> ApplyResult<Value> {
    base.validate()?;
    // Each path gets its own nodes so a write lands at one location only.
    let mut working = base.unshared()?;
    let mut applier = Applier::new(&mut working);
    for change in patch {
        applier.apply_change(change)?;
    }
    let compacted = applier.compact();
    let result = working.compacted()?;
    debug!(
        changes = patch.len(),
        compacted,
        nodes = result.node_count(),
        "patch applied"
    );
    Ok(result)
}

struct Applier<'v> {
    value: &'v mut Value,
    sentinel: NodeId,
    /// Containers holding sentinel slots.
    pending: BTreeSet<Path>,
}

impl<'v> Applier<'v> {
    fn new(value: &'v mut Value) -> Self {
        let sentinel = value.alloc(Node::Opaque(Opaque {
            type_name: SENTINEL_TYPE.to_string(),
            token: String::new(),
        }));
        Self {
            value,
            sentinel,
            pending: BTreeSet::new(),
        }
    }

    fn apply_change(&mut self, change: &Change) -> ApplyResult<()> {
        trace!(kind = ?change.kind(), path = %change.path(), "applying change");
        match change {
            Change::Create { path, new_value } | Change::Update { path, new_value, .. } => {
                self.set(path, new_value)
            }
            Change::Delete { path, .. } => self.delete(path),
        }
    }

    fn set(&mut self, path: &Path, new_value: &Value) -> ApplyResult<()> {
        new_value.validate()?;
        let graft = self.value.import_unshared(new_value)?;
        let Some((parent_path, leaf)) = path.split_last() else {
            self.value.set_root(graft)?;
            return Ok(());
        };
        let parent = self.resolve_or_create(&parent_path, leaf)?;
        self.write_slot(parent, &parent_path, leaf, graft)
    }

    fn delete(&mut self, path: &Path) -> ApplyResult<()> {
        let Some((parent_path, leaf)) = path.split_last() else {
            let absent = self.value.alloc(Node::Absent);
            self.value.set_root(absent)?;
            return Ok(());
        };
        let Some(parent) = self.resolve(&parent_path)? else {
            trace!(%path, "delete target already gone");
            return Ok(());
        };

        let slot_index = match self.value.node(parent)?.kind() {
            Kind::Record => {
                let name = field(&parent_path, leaf, Kind::Record)?;
                self.value.remove_field(parent, name)?;
                return Ok(());
            }
            Kind::Associative => {
                let name = field(&parent_path, leaf, Kind::Associative)?;
                if let Some(index) = self.entry_position(parent, name)? {
                    if let Node::Associative(entries) = self.value.node_mut(parent)? {
                        entries.remove(index);
                    }
                }
                return Ok(());
            }
            Kind::Sequence => index(&parent_path, leaf, Kind::Sequence)?,
            Kind::Unordered => position(&parent_path, leaf)?,
            other => return Err(incompatible(&parent_path, leaf, other)),
        };

        let sentinel = self.sentinel;
        if let Node::Sequence(items) | Node::Unordered(items) = self.value.node_mut(parent)? {
            if let Some(slot) = items.get_mut(slot_index) {
                *slot = sentinel;
                self.pending.insert(parent_path);
            }
        }
        Ok(())
    }

    /// Walk `path`, creating missing containers. `next` is the key that
    /// will be written into the final container.
    fn resolve_or_create(&mut self, path: &Path, next: &Key) -> ApplyResult<NodeId> {
        let segments = path.segments();
        let mut current = self.value.root();
        if self.value.present(current)?.is_none() {
            current = self.value.alloc(empty_for(segments.first().unwrap_or(next)));
            self.value.set_root(current)?;
        }

        for (depth, key) in segments.iter().enumerate() {
            let here = Path::from(segments[..depth].to_vec());
            let existing = match self.lookup(current, &here, key)? {
                Some(child) => self.value.present(child)?,
                None => None,
            };
            current = match existing {
                Some(child) => child,
                None => {
                    let following = segments.get(depth + 1).unwrap_or(next);
                    let child = self.value.alloc(empty_for(following));
                    self.write_slot(current, &here, key, child)?;
                    child
                }
            };
        }
        Ok(current)
    }

    /// Walk `path` without creating anything. `None` if any step is missing.
    fn resolve(&self, path: &Path) -> ApplyResult<Option<NodeId>> {
        let segments = path.segments();
        let mut current = match self.value.present(self.value.root())? {
            Some(root) => root,
            None => return Ok(None),
        };
        for (depth, key) in segments.iter().enumerate() {
            let here = Path::from(segments[..depth].to_vec());
            current = match self.lookup(current, &here, key)? {
                Some(child) => match self.value.present(child)? {
                    Some(child) => child,
                    None => return Ok(None),
                },
                None => return Ok(None),
            };
        }
        Ok(Some(current))
    }

    fn lookup(&self, container: NodeId, path: &Path, key: &Key) -> ApplyResult<Option<NodeId>> {
        match self.value.node(container)? {
            Node::Record(fields) => {
                let name = field(path, key, Kind::Record)?;
                Ok(fields.get(name).copied())
            }
            Node::Sequence(items) => Ok(items.get(index(path, key, Kind::Sequence)?).copied()),
            Node::Unordered(items) => Ok(items.get(position(path, key)?).copied()),
            Node::Associative(_) => {
                let name = field(path, key, Kind::Associative)?;
                Ok(self.value.projected_entries(container)?.get(name).copied())
            }
            other => Err(incompatible(path, key, other.kind())),
        }
    }

    fn write_slot(&mut self, container: NodeId, path: &Path, key: &Key, child: NodeId) -> ApplyResult<()> {
        match self.value.node(container)?.kind() {
            Kind::Record => {
                let name = field(path, key, Kind::Record)?;
                self.value.insert_field(container, name, child)?;
            }
            Kind::Sequence => {
                let i = index(path, key, Kind::Sequence)?;
                self.write_position(container, i, child)?;
            }
            Kind::Unordered => {
                let p = position(path, key)?;
                self.write_position(container, p, child)?;
            }
            Kind::Associative => {
                let name = field(path, key, Kind::Associative)?;
                match self.entry_position(container, name)? {
                    Some(i) => {
                        if let Node::Associative(entries) = self.value.node_mut(container)? {
                            entries[i].1 = child;
                        }
                    }
                    None => {
                        let key_node = self.unproject(name)?;
                        self.value.insert_entry(container, key_node, child)?;
                    }
                }
            }
            other => return Err(incompatible(path, key, other)),
        }
        Ok(())
    }

    /// Set slot `index`, padding any gap with `Absent`.
    fn write_position(&mut self, container: NodeId, index: usize, child: NodeId) -> ApplyResult<()> {
        let len = self.value.node(container)?.cardinality().unwrap_or(0);
        let padding: Vec<NodeId> = (len..index).map(|_| self.value.alloc(Node::Absent)).collect();
        if let Node::Sequence(items) | Node::Unordered(items) = self.value.node_mut(container)? {
            match items.get_mut(index) {
                Some(slot) => *slot = child,
                None => {
                    items.extend(padding);
                    items.push(child);
                }
            }
        }
        Ok(())
    }

    /// Position of the last associative entry whose key projects to `name`.
    fn entry_position(&self, map: NodeId, name: &str) -> ApplyResult<Option<usize>> {
        let Node::Associative(entries) = self.value.node(map)? else {
            return Ok(None);
        };
        let mut found = None;
        for (i, (key, _)) in entries.iter().enumerate() {
            if self.value.project_key(*key)? == name {
                found = Some(i);
            }
        }
        Ok(found)
    }

    /// Invert the associative key projection for a newly created entry.
    fn unproject(&mut self, name: &str) -> ApplyResult<NodeId> {
        if let Some(text) = name.strip_prefix("key_") {
            if let Some(big) = text.strip_suffix('n').and_then(|t| t.parse::<i128>().ok()) {
                return Ok(self.value.alloc(Node::Scalar(Scalar::BigInt(big))));
            }
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(text) {
                if !json.is_string() {
                    return Ok(self.value.import(&Value::from_json(&json))?);
                }
            }
        }
        Ok(self
            .value
            .alloc(Node::Scalar(Scalar::String(name.to_string()))))
    }

    /// Drop sentinel slots from every registered container, deepest first.
    /// Returns the number of containers compacted.
    fn compact(&mut self) -> usize {
        let mut paths: Vec<Path> = std::mem::take(&mut self.pending).into_iter().collect();
        paths.sort_by(|a, b| b.len().cmp(&a.len()));

        let sentinel = self.sentinel;
        let mut compacted = 0;
        for path in paths {
            // A container may have moved or vanished; nothing to do then.
            let Ok(Some(container)) = self.resolve(&path) else {
                trace!(%path, "compaction target no longer resolves");
                continue;
            };
            if let Ok(Node::Sequence(items) | Node::Unordered(items)) = self.value.node_mut(container) {
                items.retain(|id| *id != sentinel);
                compacted += 1;
            }
        }
        compacted
    }
}

fn empty_for(key: &Key) -> Node {
    match key {
        Key::Index(_) => Node::Sequence(Vec::new()),
        Key::Field(_) => Node::Record(Default::default()),
    }
}

fn incompatible(path: &Path, key: &Key, found: Kind) -> ApplyError {
    ApplyError::IncompatibleSegment {
        path: path.clone(),
        segment: key.clone(),
        found,
    }
}

fn field<'k>(path: &Path, key: &'k Key, found: Kind) -> ApplyResult<&'k str> {
    key.as_field().ok_or_else(|| incompatible(path, key, found))
}

fn index(path: &Path, key: &Key, found: Kind) -> ApplyResult<usize> {
    key.as_index().ok_or_else(|| incompatible(path, key, found))
}

/// Unordered collections accept an index or a decimal field name.
fn position(path: &Path, key: &Key) -> ApplyResult<usize> {
    match key {
        Key::Index(i) => Ok(*i),
        Key::Field(name) => name.parse().map_err(|_| ApplyError::InvalidPosition {
            path: path.clone(),
            segment: key.clone(),
        }),
    }
}
