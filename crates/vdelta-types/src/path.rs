//! Paths addressing a sub-value from the root.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One step of a [`Path`]: a field name or a sequence index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Index(usize),
    Field(String),
}

impl Key {
    pub fn as_field(&self) -> Option<&str> {
        match self {
            Key::Field(name) => Some(name),
            Key::Index(_) => None,
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(i) => Some(*i),
            Key::Field(_) => None,
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Field(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Field(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "[{i}]"),
            Key::Field(name) => f.write_str(name),
        }
    }
}

/// An ordered sequence of keys. The empty path is the whole value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<Key>);

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[Key] {
        &self.0
    }

    pub fn first(&self) -> Option<&Key> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&Key> {
        self.0.last()
    }

    /// A new path with `key` appended.
    pub fn child(&self, key: impl Into<Key>) -> Self {
        let mut segments = self.0.clone();
        segments.push(key.into());
        Self(segments)
    }

    /// Split into the parent path and the final key.
    pub fn split_last(&self) -> Option<(Path, &Key)> {
        self.0
            .split_last()
            .map(|(last, parent)| (Path(parent.to_vec()), last))
    }
}

impl From<Vec<Key>> for Path {
    fn from(segments: Vec<Key>) -> Self {
        Self(segments)
    }
}

impl FromIterator<Key> for Path {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(root)");
        }
        for (i, key) in self.0.iter().enumerate() {
            match key {
                Key::Field(name) if i > 0 => write!(f, ".{name}")?,
                other => write!(f, "{other}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mixes_fields_and_indices() {
        let path = Path::root().child("users").child(2).child("name");
        assert_eq!(path.to_string(), "users[2].name");
        assert_eq!(Path::root().to_string(), "(root)");
    }

    #[test]
    fn split_last_returns_parent() {
        let path = Path::from(vec![Key::from("a"), Key::from(0)]);
        let (parent, last) = path.split_last().unwrap();
        assert_eq!(parent, Path::from(vec![Key::from("a")]));
        assert_eq!(last, &Key::Index(0));
        assert!(Path::root().split_last().is_none());
    }

    #[test]
    fn keys_serialize_untagged() {
        let path = Path::root().child("a").child(3);
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, r#"["a",3]"#);
        let parsed: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, path);
    }
}
