//! Value classification.
//!
//! Every node in an arena maps to exactly one [`Kind`]. Containers also
//! report a cardinality, which the delta calculators use for the
//! `__length__` and `__size__` pseudo-entries.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeResult;
use crate::value::{Node, NodeId, Scalar, Value};

/// The structural kind of a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Null,
    Absent,
    Scalar,
    Sequence,
    Record,
    Unordered,
    Associative,
    Opaque,
}

impl Kind {
    /// Returns `true` for kinds the differ recurses into.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            Kind::Sequence | Kind::Record | Kind::Unordered | Kind::Associative
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Absent => "absent",
            Kind::Scalar => "scalar",
            Kind::Sequence => "sequence",
            Kind::Record => "record",
            Kind::Unordered => "unordered",
            Kind::Associative => "associative",
            Kind::Opaque => "opaque",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dynamic type of a scalar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    String,
    Number,
    Boolean,
    BigInt,
}

impl ScalarType {
    pub fn name(self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Number => "number",
            ScalarType::Boolean => "boolean",
            ScalarType::BigInt => "bigint",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of classifying a single node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    pub kind: Kind,
    /// Element or entry count; `None` for non-containers.
    pub cardinality: Option<usize>,
}

impl Node {
    pub fn kind(&self) -> Kind {
        match self {
            Node::Null => Kind::Null,
            Node::Absent => Kind::Absent,
            Node::Scalar(_) => Kind::Scalar,
            Node::Sequence(_) => Kind::Sequence,
            Node::Record(_) => Kind::Record,
            Node::Unordered(_) => Kind::Unordered,
            Node::Associative(_) => Kind::Associative,
            Node::Opaque(_) => Kind::Opaque,
        }
    }

    pub fn cardinality(&self) -> Option<usize> {
        match self {
            Node::Sequence(items) | Node::Unordered(items) => Some(items.len()),
            Node::Record(fields) => Some(fields.len()),
            Node::Associative(entries) => Some(entries.len()),
            _ => None,
        }
    }
}

impl Scalar {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Scalar::String(_) => ScalarType::String,
            Scalar::Number(_) => ScalarType::Number,
            Scalar::Boolean(_) => ScalarType::Boolean,
            Scalar::BigInt(_) => ScalarType::BigInt,
        }
    }
}

/// Classify the node `id` of `value`.
///
/// Fails only when `id` does not resolve in the arena.
pub fn classify(value: &Value, id: NodeId) -> TypeResult<Classification> {
    let node = value.node(id)?;
    Ok(Classification {
        kind: node.kind(),
        cardinality: node.cardinality(),
    })
}
