//! Per-container summaries of a change list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vdelta_types::Value;

use crate::change::Change;
use crate::normalize::{change_key, ChangeKey, KeyPolicy};

/// How a single key changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyChangeKind {
    Added,
    Removed,
    Modified,
    Unchanged,
}

/// One entry of a [`Delta`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyChange {
    pub kind: PropertyChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

impl PropertyChange {
    pub fn added(new_value: Value) -> Self {
        Self {
            kind: PropertyChangeKind::Added,
            old_value: None,
            new_value: Some(new_value),
        }
    }

    pub fn removed(old_value: Value) -> Self {
        Self {
            kind: PropertyChangeKind::Removed,
            old_value: Some(old_value),
            new_value: None,
        }
    }

    pub fn modified(old_value: Value, new_value: Value) -> Self {
        Self {
            kind: PropertyChangeKind::Modified,
            old_value: Some(old_value),
            new_value: Some(new_value),
        }
    }

    pub fn unchanged(old_value: Value, new_value: Value) -> Self {
        Self {
            kind: PropertyChangeKind::Unchanged,
            old_value: Some(old_value),
            new_value: Some(new_value),
        }
    }
}

impl From<&Change> for PropertyChange {
    fn from(change: &Change) -> Self {
        match change {
            Change::Create { new_value, .. } => Self::added(new_value.clone()),
            Change::Delete { old_value, .. } => Self::removed(old_value.clone()),
            Change::Update {
                old_value,
                new_value,
                ..
            } => Self::modified(old_value.clone(), new_value.clone()),
        }
    }
}

/// Summary of changes keyed by [`ChangeKey`], with counts.
///
/// `total == added + removed + modified`; `Unchanged` entries are not
/// counted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub changes: BTreeMap<ChangeKey, PropertyChange>,
    pub total: usize,
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if nothing was added, removed, or modified.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn get(&self, key: &str) -> Option<&PropertyChange> {
        self.changes.get(key)
    }

    /// Insert an entry; an existing entry under the same key is replaced.
    pub fn insert(&mut self, key: ChangeKey, change: PropertyChange) {
        self.changes.insert(key, change);
        self.recount();
    }

    /// Insert one entry per change, keyed under `policy`.
    pub fn extend_from_changes<'a, I>(&mut self, changes: I, policy: KeyPolicy)
    where
        I: IntoIterator<Item = &'a Change>,
    {
        for change in changes {
            self.changes
                .insert(change_key(change.path(), policy), PropertyChange::from(change));
        }
        self.recount();
    }

    fn recount(&mut self) {
        let count = |kind| self.changes.values().filter(|c| c.kind == kind).count();
        self.added = count(PropertyChangeKind::Added);
        self.removed = count(PropertyChangeKind::Removed);
        self.modified = count(PropertyChangeKind::Modified);
        self.total = self.added + self.removed + self.modified;
    }
}
