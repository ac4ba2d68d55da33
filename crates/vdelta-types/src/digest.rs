//! Content digests for values and byte buffers.
//!
//! [`ValueHasher`] is a domain-separated BLAKE3 hasher. Values are hashed
//! over a canonical encoding so that structurally equal acyclic values
//! produce the same [`ContentDigest`] regardless of arena layout.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DigestError, TypeResult};
use crate::value::{Node, NodeId, Scalar, Value};

/// A 32-byte BLAKE3 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex characters.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    pub fn from_hex(s: &str) -> Result<Self, DigestError> {
        let bytes = hex::decode(s).map_err(|e| DigestError::InvalidHex(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| DigestError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.short_hex())
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// Canonical encoding tags.
const TAG_NULL: u8 = 0;
const TAG_ABSENT: u8 = 1;
const TAG_STRING: u8 = 2;
const TAG_NUMBER: u8 = 3;
const TAG_BOOLEAN: u8 = 4;
const TAG_BIGINT: u8 = 5;
const TAG_SEQUENCE: u8 = 6;
const TAG_RECORD: u8 = 7;
const TAG_UNORDERED: u8 = 8;
const TAG_ASSOCIATIVE: u8 = 9;
const TAG_OPAQUE: u8 = 10;
const TAG_BACKREF: u8 = 11;

/// Domain-separated BLAKE3 hasher.
///
/// The domain tag is prepended to every computation, so a value and a raw
/// buffer with identical bytes never share a digest.
pub struct ValueHasher {
    domain: &'static str,
}

impl ValueHasher {
    /// Hasher for structured values.
    pub const VALUE: Self = Self {
        domain: "vdelta-value-v1",
    };
    /// Hasher for raw byte buffers.
    pub const BYTES: Self = Self {
        domain: "vdelta-bytes-v1",
    };

    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    pub fn domain(&self) -> &str {
        self.domain
    }

    fn start(&self) -> blake3::Hasher {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher
    }

    pub fn hash(&self, data: &[u8]) -> ContentDigest {
        let mut hasher = self.start();
        hasher.update(data);
        ContentDigest(*hasher.finalize().as_bytes())
    }

    /// Hash the canonical encoding of a value.
    pub fn hash_value(&self, value: &Value) -> TypeResult<ContentDigest> {
        let mut hasher = self.start();
        let mut stack = Vec::new();
        encode(value, value.root(), &mut stack, &mut hasher)?;
        Ok(ContentDigest(*hasher.finalize().as_bytes()))
    }

    pub fn verify(&self, data: &[u8], expected: &ContentDigest) -> bool {
        self.hash(data) == *expected
    }
}

fn write_len(hasher: &mut blake3::Hasher, len: usize) {
    hasher.update(&(len as u64).to_le_bytes());
}

fn write_str(hasher: &mut blake3::Hasher, s: &str) {
    write_len(hasher, s.len());
    hasher.update(s.as_bytes());
}

fn encode(
    value: &Value,
    id: NodeId,
    stack: &mut Vec<NodeId>,
    hasher: &mut blake3::Hasher,
) -> TypeResult<()> {
    // A node already open on the stack is written as its distance upward.
    if let Some(pos) = stack.iter().rposition(|open| *open == id) {
        hasher.update(&[TAG_BACKREF]);
        write_len(hasher, stack.len() - pos);
        return Ok(());
    }
    stack.push(id);
    match value.node(id)? {
        Node::Null => {
            hasher.update(&[TAG_NULL]);
        }
        Node::Absent => {
            hasher.update(&[TAG_ABSENT]);
        }
        Node::Scalar(Scalar::String(s)) => {
            hasher.update(&[TAG_STRING]);
            write_str(hasher, s);
        }
        Node::Scalar(Scalar::Number(n)) => {
            let canonical = if n.is_nan() {
                f64::NAN
            } else if *n == 0.0 {
                0.0
            } else {
                *n
            };
            hasher.update(&[TAG_NUMBER]);
            hasher.update(&canonical.to_bits().to_le_bytes());
        }
        Node::Scalar(Scalar::Boolean(b)) => {
            hasher.update(&[TAG_BOOLEAN, u8::from(*b)]);
        }
        Node::Scalar(Scalar::BigInt(n)) => {
            hasher.update(&[TAG_BIGINT]);
            hasher.update(&n.to_le_bytes());
        }
        Node::Opaque(opaque) => {
            hasher.update(&[TAG_OPAQUE]);
            write_str(hasher, &opaque.type_name);
            write_str(hasher, &opaque.token);
        }
        Node::Sequence(items) => encode_items(value, TAG_SEQUENCE, items, stack, hasher)?,
        Node::Unordered(items) => encode_items(value, TAG_UNORDERED, items, stack, hasher)?,
        Node::Record(fields) => {
            let mut present = Vec::with_capacity(fields.len());
            for (key, child) in fields {
                if value.present(*child)?.is_some() {
                    present.push((key, *child));
                }
            }
            hasher.update(&[TAG_RECORD]);
            write_len(hasher, present.len());
            for (key, child) in present {
                write_str(hasher, key);
                encode(value, child, stack, hasher)?;
            }
        }
        Node::Associative(_) => {
            let entries = value.projected_entries(id)?;
            hasher.update(&[TAG_ASSOCIATIVE]);
            write_len(hasher, entries.len());
            for (key, child) in entries {
                write_str(hasher, &key);
                encode(value, child, stack, hasher)?;
            }
        }
    }
    stack.pop();
    Ok(())
}

fn encode_items(
    value: &Value,
    tag: u8,
    items: &[NodeId],
    stack: &mut Vec<NodeId>,
    hasher: &mut blake3::Hasher,
) -> TypeResult<()> {
    hasher.update(&[tag]);
    write_len(hasher, items.len());
    for item in items {
        encode(value, *item, stack, hasher)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn arb_json() -> impl Strategy<Value = serde_json::Value> {
        let leaf = prop_oneof![
            Just(serde_json::Value::Null),
            any::<bool>().prop_map(serde_json::Value::from),
            any::<i32>().prop_map(serde_json::Value::from),
            "[a-z]{0,8}".prop_map(serde_json::Value::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::Array),
                prop::collection::btree_map("[a-z]{1,3}", inner, 0..4)
                    .prop_map(|fields| serde_json::Value::Object(fields.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn digest_ignores_arena_layout(doc in arb_json()) {
            let direct = Value::from_json(&doc);

            // Same value grafted behind unrelated nodes.
            let mut padded = Value::from_node(Node::Null);
            padded.alloc(Node::Scalar(Scalar::String("unreachable".into())));
            let root = padded.import(&direct).unwrap();
            padded.set_root(root).unwrap();

            prop_assert_eq!(
                ValueHasher::VALUE.hash_value(&direct).unwrap(),
                ValueHasher::VALUE.hash_value(&padded).unwrap()
            );
        }
    }

    #[test]
    fn equal_values_hash_equal() {
        let a = Value::from_json(&json!({"b": [1, 2], "a": "x"}));
        let b = Value::from_json(&json!({"a": "x", "b": [1, 2]}));
        assert_eq!(
            ValueHasher::VALUE.hash_value(&a).unwrap(),
            ValueHasher::VALUE.hash_value(&b).unwrap()
        );
    }

    #[test]
    fn scalar_types_are_distinguished() {
        let n = ValueHasher::VALUE.hash_value(&Value::number(1.0)).unwrap();
        let s = ValueHasher::VALUE.hash_value(&Value::string("1")).unwrap();
        let b = ValueHasher::VALUE.hash_value(&Value::bigint(1)).unwrap();
        assert_ne!(n, s);
        assert_ne!(n, b);
    }

    #[test]
    fn sequence_and_unordered_differ() {
        let seq = Value::from_json(&json!([]));
        let set = Value::empty_unordered();
        assert_ne!(
            ValueHasher::VALUE.hash_value(&seq).unwrap(),
            ValueHasher::VALUE.hash_value(&set).unwrap()
        );
    }

    #[test]
    fn cyclic_value_hashes() {
        let mut value = Value::empty_record();
        let root = value.root();
        value.insert_field(root, "self", root).unwrap();
        let first = ValueHasher::VALUE.hash_value(&value).unwrap();
        let second = ValueHasher::VALUE.hash_value(&value.clone()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn domains_separate_bytes() {
        assert_ne!(
            ValueHasher::VALUE.hash(b"data"),
            ValueHasher::BYTES.hash(b"data")
        );
        let id = ValueHasher::BYTES.hash(b"payload");
        assert!(ValueHasher::BYTES.verify(b"payload", &id));
        assert!(!ValueHasher::BYTES.verify(b"tampered", &id));
    }

    #[test]
    fn hex_roundtrip() {
        let id = ValueHasher::BYTES.hash(b"test");
        assert_eq!(ContentDigest::from_hex(&id.to_hex()).unwrap(), id);
        assert_eq!(id.short_hex().len(), 8);
        assert_eq!(
            ContentDigest::from_hex("abcd"),
            Err(DigestError::InvalidLength {
                expected: 32,
                actual: 2
            })
        );
    }
}
