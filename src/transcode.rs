//! Structural conversion of scan result graphs into JSON.
//!
//! Result types describe themselves as a [`Node`] through [`Inspect`]; the
//! node is a closed set of shapes (mappings, abstract-form wrappers,
//! sequences, attribute-bearing objects, named opaque leaves and scalars)
//! plus an [`Node::Opaque`] escape hatch for anything else. [`transcode`]
//! walks that graph with a fixed rule precedence and never fails.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde_json::{Map, Number, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

/// Placeholder emitted for filesystem paths.
pub const PATH_PLACEHOLDER: &str = "<PosixPath> toString not implemented";
/// Placeholder emitted for OCSP responses.
pub const OCSP_PLACEHOLDER: &str = "<OCSPResponse> toString not implemented";
/// Prefix marking members that are never exported.
pub const PRIVATE_MARKER: char = '_';

/// An in-memory value of open shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Mapping(Vec<(String, Node)>),
    /// A wrapper whose canonical representation is the inner node.
    Tree(Box<Node>),
    Sequence(Vec<Node>),
    Bytes(Vec<u8>),
    Object {
        type_name: String,
        members: Vec<(String, Member)>,
    },
    Uuid(Uuid),
    Certificate(CertificateLeaf),
    Path(PathBuf),
    OcspResponse(OcspResponseLeaf),
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    /// A leaf with no known conversion; `attributes` is what it exposes.
    Opaque {
        type_name: String,
        attributes: Vec<String>,
    },
}

/// A named member of an attribute-bearing object.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field(Node),
    /// A callable member; never exported.
    Method,
}

/// X.509 certificate as seen by the transcoder.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateLeaf {
    pub not_valid_before: OffsetDateTime,
    pub not_valid_after: OffsetDateTime,
    pub subject: String,
    pub serial_number: String,
    pub der: Vec<u8>,
}

/// Stapled OCSP response.
#[derive(Debug, Clone, PartialEq)]
pub struct OcspResponseLeaf {
    pub der: Vec<u8>,
}

impl Node {
    /// Builder for attribute-bearing objects.
    pub fn object(type_name: impl Into<String>) -> ObjectBuilder {
        ObjectBuilder {
            type_name: type_name.into(),
            members: Vec::new(),
        }
    }

    pub fn mapping<K, I>(entries: I) -> Node
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Node)>,
    {
        Node::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn text(s: impl Into<String>) -> Node {
        Node::Text(s.into())
    }
}

pub struct ObjectBuilder {
    type_name: String,
    members: Vec<(String, Member)>,
}

impl ObjectBuilder {
    pub fn field(mut self, name: impl Into<String>, value: &(impl Inspect + ?Sized)) -> Self {
        self.members.push((name.into(), Member::Field(value.inspect())));
        self
    }

    pub fn node(mut self, name: impl Into<String>, node: Node) -> Self {
        self.members.push((name.into(), Member::Field(node)));
        self
    }

    pub fn method(mut self, name: impl Into<String>) -> Self {
        self.members.push((name.into(), Member::Method));
        self
    }

    pub fn build(self) -> Node {
        Node::Object {
            type_name: self.type_name,
            members: self.members,
        }
    }
}

/// Types that can describe themselves as a [`Node`].
pub trait Inspect {
    fn inspect(&self) -> Node;
}

/// Convert a value into a JSON-safe tree. See [`transcode_node`].
pub fn transcode<T: Inspect + ?Sized>(value: &T, class_key: Option<&str>) -> Value {
    transcode_node(&value.inspect(), class_key)
}

/// Apply the conversion rules in order, first match wins:
/// mapping, abstract form, sequence, object, named leaf, scalar fallback.
pub fn transcode_node(node: &Node, class_key: Option<&str>) -> Value {
    match node {
        Node::Mapping(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (k, v) in entries {
                map.insert(k.clone(), transcode_node(v, class_key));
            }
            Value::Object(map)
        }
        // The abstract form is walked without the discriminator key.
        Node::Tree(inner) => transcode_node(inner, None),
        Node::Sequence(items) => Value::Array(
            items
                .iter()
                .map(|v| transcode_node(v, class_key))
                .collect(),
        ),
        Node::Bytes(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
        Node::Object { type_name, members } => {
            let mut map = Map::new();
            for (name, member) in members {
                if name.starts_with(PRIVATE_MARKER) {
                    continue;
                }
                if let Member::Field(v) = member {
                    map.insert(name.clone(), transcode_node(v, class_key));
                }
            }
            if let Some(key) = class_key {
                map.insert(key.to_string(), Value::String(type_name.clone()));
            }
            Value::Object(map)
        }
        Node::Uuid(id) => Value::String(id.hyphenated().to_string()),
        Node::Certificate(cert) => {
            let mut map = Map::with_capacity(2);
            map.insert(
                "not_valid_before".into(),
                Value::String(format_timestamp(cert.not_valid_before)),
            );
            map.insert(
                "not_valid_after".into(),
                Value::String(format_timestamp(cert.not_valid_after)),
            );
            Value::Object(map)
        }
        Node::Path(_) => Value::String(PATH_PLACEHOLDER.into()),
        Node::OcspResponse(_) => Value::String(OCSP_PLACEHOLDER.into()),
        Node::Null => Value::Null,
        Node::Bool(b) => Value::Bool(*b),
        Node::Int(i) => Value::from(*i),
        Node::UInt(u) => Value::from(*u),
        Node::Text(s) => Value::String(s.clone()),
        Node::Float(f) => match Number::from_f64(*f) {
            Some(n) => Value::Number(n),
            None => unrepresentable("f64", &[], &f.to_string()),
        },
        Node::Opaque {
            type_name,
            attributes,
        } => unrepresentable(type_name, attributes, type_name),
    }
}

fn unrepresentable(type_name: &str, attributes: &[String], shown: &str) -> Value {
    warn!(
        type_name,
        attributes = ?attributes,
        value = shown,
        "Value is not JSON serializable; emitting marker."
    );
    Value::String(format!("<{type_name}> not JSON serializable"))
}

fn format_timestamp(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_else(|_| ts.to_string())
}

impl Inspect for Node {
    fn inspect(&self) -> Node {
        self.clone()
    }
}

impl Inspect for Value {
    fn inspect(&self) -> Node {
        match self {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Node::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Node::UInt(u)
                } else {
                    Node::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Node::Text(s.clone()),
            Value::Array(items) => Node::Sequence(items.iter().map(Inspect::inspect).collect()),
            Value::Object(map) => Node::Mapping(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.inspect()))
                    .collect(),
            ),
        }
    }
}

impl Inspect for str {
    fn inspect(&self) -> Node {
        Node::Text(self.to_string())
    }
}

impl Inspect for String {
    fn inspect(&self) -> Node {
        Node::Text(self.clone())
    }
}

impl Inspect for bool {
    fn inspect(&self) -> Node {
        Node::Bool(*self)
    }
}

macro_rules! inspect_signed {
    ($($t:ty),*) => {$(
        impl Inspect for $t {
            fn inspect(&self) -> Node {
                Node::Int(i64::from(*self))
            }
        }
    )*};
}

macro_rules! inspect_unsigned {
    ($($t:ty),*) => {$(
        impl Inspect for $t {
            fn inspect(&self) -> Node {
                Node::UInt(u64::from(*self))
            }
        }
    )*};
}

inspect_signed!(i8, i16, i32, i64);
inspect_unsigned!(u8, u16, u32, u64);

impl Inspect for usize {
    fn inspect(&self) -> Node {
        Node::UInt(*self as u64)
    }
}

impl Inspect for f64 {
    fn inspect(&self) -> Node {
        Node::Float(*self)
    }
}

impl Inspect for IpAddr {
    fn inspect(&self) -> Node {
        Node::Text(self.to_string())
    }
}

impl Inspect for Uuid {
    fn inspect(&self) -> Node {
        Node::Uuid(*self)
    }
}

impl Inspect for Path {
    fn inspect(&self) -> Node {
        Node::Path(self.to_path_buf())
    }
}

impl Inspect for PathBuf {
    fn inspect(&self) -> Node {
        Node::Path(self.clone())
    }
}

impl Inspect for CertificateLeaf {
    fn inspect(&self) -> Node {
        Node::Certificate(self.clone())
    }
}

impl Inspect for OcspResponseLeaf {
    fn inspect(&self) -> Node {
        Node::OcspResponse(self.clone())
    }
}

impl<T: Inspect> Inspect for Option<T> {
    fn inspect(&self) -> Node {
        match self {
            Some(v) => v.inspect(),
            None => Node::Null,
        }
    }
}

impl<T: Inspect> Inspect for [T] {
    fn inspect(&self) -> Node {
        Node::Sequence(self.iter().map(Inspect::inspect).collect())
    }
}

impl<T: Inspect> Inspect for Vec<T> {
    fn inspect(&self) -> Node {
        self.as_slice().inspect()
    }
}

impl<T: Inspect + ?Sized> Inspect for &T {
    fn inspect(&self) -> Node {
        (**self).inspect()
    }
}

impl<T: Inspect + ?Sized> Inspect for Box<T> {
    fn inspect(&self) -> Node {
        (**self).inspect()
    }
}

impl<V: Inspect> Inspect for BTreeMap<String, V> {
    fn inspect(&self) -> Node {
        Node::Mapping(self.iter().map(|(k, v)| (k.clone(), v.inspect())).collect())
    }
}

impl<V: Inspect> Inspect for HashMap<String, V> {
    fn inspect(&self) -> Node {
        Node::Mapping(self.iter().map(|(k, v)| (k.clone(), v.inspect())).collect())
    }
}
