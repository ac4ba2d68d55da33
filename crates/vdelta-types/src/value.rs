//! Arena representation of heterogeneous in-memory values.
//!
//! A [`Value`] owns a flat vector of [`Node`]s and a root [`NodeId`].
//! Containers refer to their children by index into the same arena, so a
//! self-referential value is an ordinary index loop and node identity is
//! index equality.
//!
//! # Invariants
//!
//! - A record entry holding an `Absent` node is equivalent to a missing key.
//! - Unordered collections compare positionally, in iteration order.
//! - Associative collections compare by projected key (see
//!   [`Value::project_key`]).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ClassificationError, TypeResult};
use crate::kind::Kind;

/// Index of a node inside one [`Value`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A primitive value.
///
/// Equality is by dynamic type and value. `NaN` equals `NaN`, so every
/// value compares equal to itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scalar {
    String(String),
    Number(f64),
    Boolean(bool),
    BigInt(#[serde(with = "bigint_text")] i128),
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::String(a), Scalar::String(b)) => a == b,
            (Scalar::Number(a), Scalar::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Scalar::Boolean(a), Scalar::Boolean(b)) => a == b,
            (Scalar::BigInt(a), Scalar::BigInt(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => f.write_str(s),
            Scalar::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Boolean(b) => write!(f, "{b}"),
            Scalar::BigInt(n) => write!(f, "{n}n"),
        }
    }
}

/// Serialized as a decimal string; JSON numbers cannot carry 128 bits.
mod bigint_text {
    use super::*;

    pub fn serialize<S: Serializer>(value: &i128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i128, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// A value that is compared by type and identity token only, never
/// recursed into (dates, patterns, callables).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Opaque {
    pub type_name: String,
    pub token: String,
}

/// One node of a value arena.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Null,
    /// No value at all; distinct from `Null`.
    Absent,
    Scalar(Scalar),
    Sequence(Vec<NodeId>),
    Record(BTreeMap<String, NodeId>),
    /// Multiset in iteration order.
    Unordered(Vec<NodeId>),
    /// Key/value entries in iteration order.
    Associative(Vec<(NodeId, NodeId)>),
    Opaque(Opaque),
}

/// A complete value: an arena of nodes plus the root.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Value {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
}

impl Value {
    /// A value consisting of the single node `node`.
    ///
    /// Container nodes must be empty; their children would not resolve.
    pub fn from_node(node: Node) -> Self {
        Self {
            nodes: vec![node],
            root: NodeId(0),
        }
    }

    pub fn null() -> Self {
        Self::from_node(Node::Null)
    }

    pub fn absent() -> Self {
        Self::from_node(Node::Absent)
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::from_node(Node::Scalar(Scalar::String(s.into())))
    }

    pub fn number(n: f64) -> Self {
        Self::from_node(Node::Scalar(Scalar::Number(n)))
    }

    pub fn boolean(b: bool) -> Self {
        Self::from_node(Node::Scalar(Scalar::Boolean(b)))
    }

    pub fn bigint(n: i128) -> Self {
        Self::from_node(Node::Scalar(Scalar::BigInt(n)))
    }

    pub fn opaque(type_name: impl Into<String>, token: impl Into<String>) -> Self {
        Self::from_node(Node::Opaque(Opaque {
            type_name: type_name.into(),
            token: token.into(),
        }))
    }

    pub fn empty_sequence() -> Self {
        Self::from_node(Node::Sequence(Vec::new()))
    }

    pub fn empty_record() -> Self {
        Self::from_node(Node::Record(BTreeMap::new()))
    }

    pub fn empty_unordered() -> Self {
        Self::from_node(Node::Unordered(Vec::new()))
    }

    pub fn empty_associative() -> Self {
        Self::from_node(Node::Associative(Vec::new()))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Point the root at an existing node.
    pub fn set_root(&mut self, id: NodeId) -> TypeResult<()> {
        self.node(id)?;
        self.root = id;
        Ok(())
    }

    /// Number of nodes in the arena, reachable or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Kind of the root node.
    pub fn kind(&self) -> TypeResult<Kind> {
        Ok(self.node(self.root)?.kind())
    }

    // ---------------------------------------------------------------
    // Arena access
    // ---------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> TypeResult<&Node> {
        self.nodes
            .get(id.0)
            .ok_or(ClassificationError::DanglingNode {
                id,
                len: self.nodes.len(),
            })
    }

    pub fn node_mut(&mut self, id: NodeId) -> TypeResult<&mut Node> {
        let len = self.nodes.len();
        self.nodes
            .get_mut(id.0)
            .ok_or(ClassificationError::DanglingNode { id, len })
    }

    /// Append a node and return its id.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Insert or replace a record field. Returns the previous child.
    pub fn insert_field(
        &mut self,
        record: NodeId,
        key: impl Into<String>,
        child: NodeId,
    ) -> TypeResult<Option<NodeId>> {
        self.node(child)?;
        match self.node_mut(record)? {
            Node::Record(fields) => Ok(fields.insert(key.into(), child)),
            other => Err(unexpected(record, Kind::Record, other)),
        }
    }

    /// Remove a record field. Returns the removed child, if any.
    pub fn remove_field(&mut self, record: NodeId, key: &str) -> TypeResult<Option<NodeId>> {
        match self.node_mut(record)? {
            Node::Record(fields) => Ok(fields.remove(key)),
            other => Err(unexpected(record, Kind::Record, other)),
        }
    }

    /// Append an element to a sequence or unordered collection.
    pub fn push_element(&mut self, container: NodeId, child: NodeId) -> TypeResult<()> {
        self.node(child)?;
        match self.node_mut(container)? {
            Node::Sequence(items) | Node::Unordered(items) => {
                items.push(child);
                Ok(())
            }
            other => Err(unexpected(container, Kind::Sequence, other)),
        }
    }

    /// Append an entry to an associative collection.
    pub fn insert_entry(&mut self, map: NodeId, key: NodeId, value: NodeId) -> TypeResult<()> {
        self.node(key)?;
        self.node(value)?;
        match self.node_mut(map)? {
            Node::Associative(entries) => {
                entries.push((key, value));
                Ok(())
            }
            other => Err(unexpected(map, Kind::Associative, other)),
        }
    }

    /// Check that the root and every reference reachable from it resolve.
    ///
    /// Unreachable nodes are never read, so they are not checked.
    pub fn validate(&self) -> TypeResult<()> {
        let mut seen = HashSet::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            match self.node(id)? {
                Node::Sequence(items) | Node::Unordered(items) => stack.extend(items),
                Node::Record(fields) => stack.extend(fields.values()),
                Node::Associative(entries) => {
                    stack.extend(entries.iter().flat_map(|(k, v)| [*k, *v]))
                }
                _ => {}
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Copying
    // ---------------------------------------------------------------

    /// Copy the nodes reachable from `id` into a fresh arena rooted there.
    ///
    /// Cycles among the copied nodes are preserved.
    pub fn subtree(&self, id: NodeId) -> TypeResult<Value> {
        let mut out = Value {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        out.root = out.graft(self, id, &mut HashMap::new(), Sharing::Keep)?;
        Ok(out)
    }

    /// Compact copy of the whole value, dropping unreachable nodes.
    pub fn compacted(&self) -> TypeResult<Value> {
        self.subtree(self.root)
    }

    /// Copy in which a node reached along several paths gets one copy per
    /// path. References back to an ancestor stay back-references, so
    /// cycles survive while a write through one path never shows up at
    /// another.
    pub fn unshared(&self) -> TypeResult<Value> {
        let mut out = Value {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        out.root = out.import_unshared(self)?;
        Ok(out)
    }

    /// Copy `other` into this arena and return the id of its root here.
    pub fn import(&mut self, other: &Value) -> TypeResult<NodeId> {
        self.graft(other, other.root, &mut HashMap::new(), Sharing::Keep)
    }

    /// Like [`Value::import`], splitting shared nodes as [`Value::unshared`] does.
    pub fn import_unshared(&mut self, other: &Value) -> TypeResult<NodeId> {
        self.graft(other, other.root, &mut HashMap::new(), Sharing::Split)
    }

    fn graft(
        &mut self,
        src: &Value,
        id: NodeId,
        remap: &mut HashMap<NodeId, NodeId>,
        sharing: Sharing,
    ) -> TypeResult<NodeId> {
        if let Some(&mapped) = remap.get(&id) {
            return Ok(mapped);
        }
        let source = src.node(id)?;
        // Reserve the slot first so back-references resolve to it.
        let slot = self.alloc(Node::Absent);
        remap.insert(id, slot);

        let copied = match source {
            Node::Sequence(items) => Node::Sequence(self.graft_all(src, items, remap, sharing)?),
            Node::Unordered(items) => {
                Node::Unordered(self.graft_all(src, items, remap, sharing)?)
            }
            Node::Record(fields) => {
                let mut out = BTreeMap::new();
                for (key, child) in fields {
                    out.insert(key.clone(), self.graft(src, *child, remap, sharing)?);
                }
                Node::Record(out)
            }
            Node::Associative(entries) => {
                let mut out = Vec::with_capacity(entries.len());
                for (key, child) in entries {
                    let key = self.graft(src, *key, remap, sharing)?;
                    let child = self.graft(src, *child, remap, sharing)?;
                    out.push((key, child));
                }
                Node::Associative(out)
            }
            leaf => leaf.clone(),
        };
        *self.node_mut(slot)? = copied;
        // Splitting keeps only ancestors mapped; a later visit copies again.
        if sharing == Sharing::Split {
            remap.remove(&id);
        }
        Ok(slot)
    }

    fn graft_all(
        &mut self,
        src: &Value,
        items: &[NodeId],
        remap: &mut HashMap<NodeId, NodeId>,
        sharing: Sharing,
    ) -> TypeResult<Vec<NodeId>> {
        items
            .iter()
            .map(|child| self.graft(src, *child, remap, sharing))
            .collect()
    }

    // ---------------------------------------------------------------
    // Keys and equality
    // ---------------------------------------------------------------

    /// Project an associative key to the string the differ keys it by.
    ///
    /// String keys project to themselves. Anything else becomes
    /// `"key_" + text`, where `text` is the key's JSON-like rendering.
    pub fn project_key(&self, key: NodeId) -> TypeResult<String> {
        let text = match self.node(key)? {
            Node::Scalar(Scalar::String(s)) => return Ok(s.clone()),
            Node::Null => "null".to_string(),
            Node::Absent => "undefined".to_string(),
            Node::Scalar(scalar) => scalar.to_string(),
            Node::Opaque(opaque) => opaque.token.clone(),
            container => match self.node_to_json(key) {
                Ok(json) => json.to_string(),
                Err(_) => format!("{}{}", container.kind(), key),
            },
        };
        Ok(format!("key_{text}"))
    }

    /// Associative entries keyed by projection. Later entries win.
    pub fn projected_entries(&self, map: NodeId) -> TypeResult<BTreeMap<String, NodeId>> {
        match self.node(map)? {
            Node::Associative(entries) => {
                let mut out = BTreeMap::new();
                for (key, child) in entries {
                    out.insert(self.project_key(*key)?, *child);
                }
                Ok(out)
            }
            other => Err(unexpected(map, Kind::Associative, other)),
        }
    }

    /// `None` for an `Absent` node, so absent record entries read as missing.
    pub fn present(&self, id: NodeId) -> TypeResult<Option<NodeId>> {
        Ok(match self.node(id)? {
            Node::Absent => None,
            _ => Some(id),
        })
    }
}

/// Whether a graft keeps nodes shared between parents shared.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Sharing {
    Keep,
    Split,
}

fn unexpected(id: NodeId, expected: Kind, found: &Node) -> ClassificationError {
    ClassificationError::UnexpectedKind {
        id,
        expected,
        found: found.kind(),
    }
}

/// Structural equality of node `a` in `left` and node `b` in `right`.
///
/// A pair that is already being compared further up the stack is assumed
/// equal, which makes equal-shaped cycles compare equal.
pub fn structurally_equal(left: &Value, a: NodeId, right: &Value, b: NodeId) -> TypeResult<bool> {
    let mut open = HashSet::new();
    nodes_equal(left, a, right, b, &mut open)
}

fn nodes_equal(
    left: &Value,
    a: NodeId,
    right: &Value,
    b: NodeId,
    open: &mut HashSet<(NodeId, NodeId)>,
) -> TypeResult<bool> {
    if !open.insert((a, b)) {
        return Ok(true);
    }
    let result = match (left.node(a)?, right.node(b)?) {
        (Node::Null, Node::Null) | (Node::Absent, Node::Absent) => true,
        (Node::Scalar(x), Node::Scalar(y)) => x == y,
        (Node::Opaque(x), Node::Opaque(y)) => x == y,
        (Node::Sequence(xs), Node::Sequence(ys)) | (Node::Unordered(xs), Node::Unordered(ys)) => {
            xs.len() == ys.len() && all_equal(left, xs, right, ys, open)?
        }
        (Node::Record(xs), Node::Record(ys)) => fields_equal(left, xs, right, ys, open)?,
        (Node::Associative(_), Node::Associative(_)) => {
            let xs = left.projected_entries(a)?;
            let ys = right.projected_entries(b)?;
            fields_equal(left, &xs, right, &ys, open)?
        }
        _ => false,
    };
    open.remove(&(a, b));
    Ok(result)
}

fn all_equal(
    left: &Value,
    xs: &[NodeId],
    right: &Value,
    ys: &[NodeId],
    open: &mut HashSet<(NodeId, NodeId)>,
) -> TypeResult<bool> {
    for (x, y) in xs.iter().zip(ys) {
        if !nodes_equal(left, *x, right, *y, open)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn fields_equal(
    left: &Value,
    xs: &BTreeMap<String, NodeId>,
    right: &Value,
    ys: &BTreeMap<String, NodeId>,
    open: &mut HashSet<(NodeId, NodeId)>,
) -> TypeResult<bool> {
    for (key, x) in xs {
        let y = match ys.get(key) {
            Some(y) => right.present(*y)?,
            None => None,
        };
        let equal = match (left.present(*x)?, y) {
            (None, None) => true,
            (Some(x), Some(y)) => nodes_equal(left, x, right, y, open)?,
            _ => false,
        };
        if !equal {
            return Ok(false);
        }
    }
    for (key, y) in ys {
        if !xs.contains_key(key) && right.present(*y)?.is_some() {
            return Ok(false);
        }
    }
    Ok(true)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        structurally_equal(self, self.root, other, other.root).unwrap_or(false)
    }
}
