//! Text encode/decode of values.
//!
//! Two forms are supported:
//!
//! - [`to_text`] / [`from_text`]: the arena itself as JSON. Lossless,
//!   including cycles, scalar types, and collection kinds.
//! - [`Value::to_json`] / [`Value::from_json`]: plain JSON documents for
//!   interop. Unordered collections become arrays, associative
//!   collections become objects keyed by projected key, and cycles are
//!   rejected.

use std::collections::HashSet;

use serde_json::{Map, Number};

use crate::error::CodecError;
use crate::value::{Node, NodeId, Scalar, Value};

/// Largest integer an `f64` represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Encode the arena form of `value` as JSON text.
pub fn to_text(value: &Value) -> Result<String, CodecError> {
    Ok(serde_json::to_string(value)?)
}

/// Decode arena-form JSON text, checking that every reference resolves.
pub fn from_text(text: &str) -> Result<Value, CodecError> {
    let value: Value = serde_json::from_str(text)?;
    value.validate()?;
    Ok(value)
}

impl Value {
    /// Build a value from a plain JSON document.
    pub fn from_json(json: &serde_json::Value) -> Self {
        let mut value = Value {
            nodes: Vec::new(),
            root: NodeId::new(0),
        };
        // Children are allocated before their parent, so the root comes last.
        value.root = value.build_json(json);
        value
    }

    fn build_json(&mut self, json: &serde_json::Value) -> NodeId {
        let node = match json {
            serde_json::Value::Null => Node::Null,
            serde_json::Value::Bool(b) => Node::Scalar(Scalar::Boolean(*b)),
            serde_json::Value::Number(n) => {
                Node::Scalar(Scalar::Number(n.as_f64().unwrap_or(f64::NAN)))
            }
            serde_json::Value::String(s) => Node::Scalar(Scalar::String(s.clone())),
            serde_json::Value::Array(items) => {
                let children = items.iter().map(|item| self.build_json(item)).collect();
                Node::Sequence(children)
            }
            serde_json::Value::Object(fields) => {
                let children = fields
                    .iter()
                    .map(|(key, item)| (key.clone(), self.build_json(item)))
                    .collect();
                Node::Record(children)
            }
        };
        self.alloc(node)
    }

    /// Render the whole value as a plain JSON document.
    pub fn to_json(&self) -> Result<serde_json::Value, CodecError> {
        self.node_to_json(self.root())
    }

    /// Render the node `id` as a plain JSON document.
    pub fn node_to_json(&self, id: NodeId) -> Result<serde_json::Value, CodecError> {
        let mut open = HashSet::new();
        self.json_of(id, &mut open)
    }

    fn json_of(
        &self,
        id: NodeId,
        open: &mut HashSet<NodeId>,
    ) -> Result<serde_json::Value, CodecError> {
        if !open.insert(id) {
            return Err(CodecError::Cyclic(id));
        }
        let json = match self.node(id)? {
            Node::Null | Node::Absent => serde_json::Value::Null,
            Node::Scalar(scalar) => scalar_json(scalar),
            Node::Opaque(opaque) => serde_json::Value::String(opaque.token.clone()),
            Node::Sequence(items) | Node::Unordered(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|item| self.json_of(*item, open))
                    .collect::<Result<_, _>>()?,
            ),
            Node::Record(fields) => {
                let mut out = Map::new();
                for (key, child) in fields {
                    if self.present(*child)?.is_some() {
                        out.insert(key.clone(), self.json_of(*child, open)?);
                    }
                }
                serde_json::Value::Object(out)
            }
            Node::Associative(_) => {
                let mut out = Map::new();
                for (key, child) in self.projected_entries(id)? {
                    out.insert(key, self.json_of(child, open)?);
                }
                serde_json::Value::Object(out)
            }
        };
        open.remove(&id);
        Ok(json)
    }
}

fn scalar_json(scalar: &Scalar) -> serde_json::Value {
    match scalar {
        Scalar::String(s) => serde_json::Value::String(s.clone()),
        Scalar::Boolean(b) => serde_json::Value::Bool(*b),
        Scalar::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
            serde_json::Value::Number(Number::from(*n as i64))
        }
        Scalar::Number(n) => Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Scalar::BigInt(n) => match i64::try_from(*n) {
            Ok(small) => serde_json::Value::Number(Number::from(small)),
            Err(_) => serde_json::Value::String(n.to_string()),
        },
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_json_roundtrip() {
        let doc = json!({"user": {"name": "Jane", "tags": ["a", "b"], "age": 30, "score": 1.5}});
        let value = Value::from_json(&doc);
        assert_eq!(value.to_json().unwrap(), doc);
    }

    #[test]
    fn cyclic_value_is_rejected_as_plain_json() {
        let mut value = Value::empty_record();
        let root = value.root();
        value.insert_field(root, "self", root).unwrap();
        assert!(matches!(value.to_json(), Err(CodecError::Cyclic(_))));
    }

    #[test]
    fn arena_text_keeps_cycles_and_types() {
        let mut value = Value::empty_record();
        let root = value.root();
        let big = value.alloc(Node::Scalar(Scalar::BigInt(i128::MAX)));
        value.insert_field(root, "big", big).unwrap();
        value.insert_field(root, "self", root).unwrap();

        let text = to_text(&value).unwrap();
        let decoded = from_text(&text).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn from_text_rejects_dangling_references() {
        let text = r#"{"nodes":[{"sequence":[4]}],"root":0}"#;
        assert!(matches!(
            from_text(text),
            Err(CodecError::Classification(_))
        ));
    }

    #[test]
    fn non_finite_numbers_become_null() {
        let value = Value::number(f64::INFINITY);
        assert_eq!(value.to_json().unwrap(), json!(null));
    }
}
