//! Flattening of change paths into one-level [`ChangeKey`]s.
//!
//! The projection is deliberately lossy. Two nested changes under the
//! same sequence slot or the same collection key collapse onto one key,
//! and the later change wins when a delta is built.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use vdelta_types::{Key, Path};

/// Key of the whole value (empty path).
pub const ROOT_KEY: &str = "__root__";
/// Sequence length pseudo-key.
pub const LENGTH_KEY: &str = "__length__";
/// Collection cardinality pseudo-key.
pub const SIZE_KEY: &str = "__size__";
/// Scalar type pseudo-key.
pub const TYPE_KEY: &str = "__type__";
/// Scalar value pseudo-key.
pub const VALUE_KEY: &str = "__value__";

/// A flat key in a [`Delta`](crate::Delta) change map.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeKey(String);

impl ChangeKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for synthetic keys such as `__length__`.
    pub fn is_pseudo(&self) -> bool {
        matches!(
            self.0.as_str(),
            ROOT_KEY | LENGTH_KEY | SIZE_KEY | TYPE_KEY | VALUE_KEY
        )
    }
}

impl Borrow<str> for ChangeKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which container owns the delta being built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyPolicy {
    /// Last segment: the most specific changed field.
    Record,
    /// First segment as `[i]`: which top-level slot changed.
    Sequence,
    /// First segment as a bare string: the synthetic position or key.
    Collection,
}

/// Reduce `path` to a single key under `policy`.
pub fn change_key(path: &Path, policy: KeyPolicy) -> ChangeKey {
    if let [only] = path.segments() {
        return ChangeKey(bracketed(only));
    }
    let segment = match policy {
        KeyPolicy::Record => path.last(),
        KeyPolicy::Sequence | KeyPolicy::Collection => path.first(),
    };
    match (segment, policy) {
        (None, _) => ChangeKey::new(ROOT_KEY),
        (Some(Key::Index(i)), KeyPolicy::Collection) => ChangeKey(i.to_string()),
        (Some(key), _) => ChangeKey(bracketed(key)),
    }
}

fn bracketed(key: &Key) -> String {
    match key {
        Key::Index(i) => format!("[{i}]"),
        Key::Field(name) => name.clone(),
    }
}
