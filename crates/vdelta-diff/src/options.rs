use serde::{Deserialize, Serialize};

/// Options controlling a structural diff.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffOptions {
    /// Stop at node pairs already being compared instead of recursing
    /// forever. With this off, cyclic inputs are rejected.
    pub cycles_fix: bool,
    /// Compare sequences as multisets instead of position by position.
    pub order_insensitive: bool,
    /// Field names whose subtrees are skipped at any depth.
    pub ignore_keys: Vec<String>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            cycles_fix: true,
            order_insensitive: false,
            ignore_keys: Vec::new(),
        }
    }
}

impl DiffOptions {
    pub fn with_order_insensitive(mut self) -> Self {
        self.order_insensitive = true;
        self
    }

    pub fn without_cycles_fix(mut self) -> Self {
        self.cycles_fix = false;
        self
    }

    pub fn with_ignore_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Returns `true` if the field `key` is excluded from comparison.
    pub fn ignores(&self, key: &str) -> bool {
        self.ignore_keys.iter().any(|k| k == key)
    }
}
