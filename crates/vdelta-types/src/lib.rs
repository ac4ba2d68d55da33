//! Foundation types for vdelta.
//!
//! Every other vdelta crate depends on `vdelta-types`. It owns the value
//! representation the differ and applier work on, plus the stateless
//! collaborators around it (classification, hashing, text codec).
//!
//! # Key Types
//!
//! - [`Value`] / [`Node`] / [`NodeId`] -- Arena-backed values; cycles are index loops
//! - [`Kind`] / [`classify`] -- Structural kind and cardinality of a node
//! - [`Path`] / [`Key`] -- Addresses of sub-values
//! - [`ValueHasher`] / [`ContentDigest`] -- Domain-separated BLAKE3 digests
//! - [`to_text`] / [`from_text`] -- Lossless text encoding

pub mod codec;
pub mod digest;
pub mod error;
pub mod kind;
pub mod path;
pub mod value;

pub use codec::{from_text, to_text};
pub use digest::{ContentDigest, ValueHasher};
pub use error::{ClassificationError, CodecError, DigestError, TypeResult};
pub use kind::{classify, Classification, Kind, ScalarType};
pub use path::{Key, Path};
pub use value::{structurally_equal, Node, NodeId, Opaque, Scalar, Value};
