//! The change list a diff produces and a patch replays.

use serde::{Deserialize, Serialize};
use vdelta_types::{Path, Value};

/// What a [`Change`] does at its path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

/// One path-addressed edit.
///
/// `Create` carries only the new value, `Delete` only the old one, and
/// `Update` both.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    Create {
        path: Path,
        new_value: Value,
    },
    Update {
        path: Path,
        old_value: Value,
        new_value: Value,
    },
    Delete {
        path: Path,
        old_value: Value,
    },
}

/// An ordered change list. Order matters when it is applied.
pub type Patch = Vec<Change>;

impl Change {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::Create { .. } => ChangeKind::Create,
            Change::Update { .. } => ChangeKind::Update,
            Change::Delete { .. } => ChangeKind::Delete,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Change::Create { path, .. } | Change::Update { path, .. } | Change::Delete { path, .. } => {
                path
            }
        }
    }

    pub fn old_value(&self) -> Option<&Value> {
        match self {
            Change::Update { old_value, .. } | Change::Delete { old_value, .. } => Some(old_value),
            Change::Create { .. } => None,
        }
    }

    pub fn new_value(&self) -> Option<&Value> {
        match self {
            Change::Create { new_value, .. } | Change::Update { new_value, .. } => Some(new_value),
            Change::Delete { .. } => None,
        }
    }
}
