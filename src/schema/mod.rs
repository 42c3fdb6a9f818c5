//! Schema model, synthesis and validation
//!
//! A [`SchemaDocument`] holds a root [`SchemaNode`] plus a flat table of
//! named definitions that `$ref` pointers resolve against. Nodes are plain
//! serde structs; cycles only exist through definition names, never through
//! owned pointers, so the compiler and validator can guard recursion with a
//! set of in-progress definition keys.

mod cache;
mod compiler;
mod generators;
mod pattern;
mod validator;

pub use cache::*;
pub use compiler::*;
pub use generators::*;
pub use pattern::*;
pub use validator::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{MockError, MockResult};

/// Key under which a root self-reference (`"#"`) is tracked
pub const ROOT_POINTER: &str = "#";

/// Primitive kinds of the schema grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Null => "null",
        }
    }

    /// Whether a JSON value is an instance of this kind
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => match value {
                Value::Number(n) => {
                    n.is_i64() || n.is_u64() || n.as_f64().map_or(false, |f| f.fract() == 0.0)
                }
                _ => false,
            },
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::Null => value.is_null(),
        }
    }
}

/// `type` keyword: a single kind or a union
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSet {
    Single(PrimitiveKind),
    Union(Vec<PrimitiveKind>),
}

impl TypeSet {
    pub fn kinds(&self) -> Vec<PrimitiveKind> {
        match self {
            Self::Single(kind) => vec![*kind],
            Self::Union(kinds) => kinds.clone(),
        }
    }
}

/// Draft-4 boolean flag or draft-6 numeric exclusive bound
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExclusiveBound {
    Flag(bool),
    Value(f64),
}

/// `items` keyword: one schema for every element or a positional tuple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Items {
    Tuple(Vec<SchemaNode>),
    Single(Box<SchemaNode>),
}

/// One recursive unit of the schema grammar
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchemaNode {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TypeSet>,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    // String constraints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    // Numeric constraints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<ExclusiveBound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<ExclusiveBound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,

    // Value pinning
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,

    // Object shape
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SchemaNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    // Array shape
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Items>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,

    // Composition
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<SchemaNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<SchemaNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<SchemaNode>,

    // Definition tables, hoisted into the document on load
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub definitions: BTreeMap<String, SchemaNode>,
    #[serde(rename = "$defs", skip_serializing_if = "BTreeMap::is_empty")]
    pub defs: BTreeMap<String, SchemaNode>,
}

/// The single keyword family that decides how a node is interpreted.
///
/// Precedence: `$ref`, then composition (`oneOf`, `anyOf`, `allOf`), then
/// `const`, then a non-empty `enum`, then the declared or inferred type.
#[derive(Debug, Clone, Copy)]
pub enum ShapeDriver<'a> {
    Ref(&'a str),
    OneOf(&'a [SchemaNode]),
    AnyOf(&'a [SchemaNode]),
    AllOf(&'a [SchemaNode]),
    Const(&'a Value),
    Enum(&'a [Value]),
    Typed(PrimitiveKind),
    Union(&'a [PrimitiveKind]),
    Untyped,
}

impl SchemaNode {
    /// Parse a node from raw JSON
    pub fn from_value(value: Value) -> MockResult<Self> {
        serde_json::from_value(value).map_err(|e| MockError::InvalidSchema(e.to_string()))
    }

    /// Convenience constructor for a bare typed node
    pub fn of_kind(kind: PrimitiveKind) -> Self {
        Self {
            kind: Some(TypeSet::Single(kind)),
            ..Default::default()
        }
    }

    pub fn driver(&self) -> ShapeDriver<'_> {
        if let Some(pointer) = &self.reference {
            return ShapeDriver::Ref(pointer);
        }
        if !self.one_of.is_empty() {
            return ShapeDriver::OneOf(&self.one_of);
        }
        if !self.any_of.is_empty() {
            return ShapeDriver::AnyOf(&self.any_of);
        }
        if !self.all_of.is_empty() {
            return ShapeDriver::AllOf(&self.all_of);
        }
        if let Some(value) = &self.const_value {
            return ShapeDriver::Const(value);
        }
        if let Some(values) = self.enum_values.as_deref().filter(|v| !v.is_empty()) {
            return ShapeDriver::Enum(values);
        }
        match &self.kind {
            Some(TypeSet::Single(kind)) => ShapeDriver::Typed(*kind),
            Some(TypeSet::Union(kinds)) if kinds.len() == 1 => ShapeDriver::Typed(kinds[0]),
            Some(TypeSet::Union(kinds)) if !kinds.is_empty() => ShapeDriver::Union(kinds),
            _ => self.inferred_kind().map_or(ShapeDriver::Untyped, ShapeDriver::Typed),
        }
    }

    /// Kind implied by the constraints present on an untyped node
    pub fn inferred_kind(&self) -> Option<PrimitiveKind> {
        if !self.properties.is_empty() || !self.required.is_empty() {
            Some(PrimitiveKind::Object)
        } else if self.items.is_some() || self.min_items.is_some() || self.max_items.is_some() {
            Some(PrimitiveKind::Array)
        } else if self.min_length.is_some()
            || self.max_length.is_some()
            || self.pattern.is_some()
            || self.format.is_some()
        {
            Some(PrimitiveKind::String)
        } else if self.minimum.is_some()
            || self.maximum.is_some()
            || self.multiple_of.is_some()
            || self.exclusive_minimum.is_some()
            || self.exclusive_maximum.is_some()
        {
            Some(PrimitiveKind::Number)
        } else {
            None
        }
    }

    /// `nullable: true` or a `type` union that lists `"null"`
    pub fn is_nullable(&self) -> bool {
        self.nullable.unwrap_or(false)
            || matches!(&self.kind, Some(TypeSet::Union(kinds)) if kinds.contains(&PrimitiveKind::Null))
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }
}

/// Where a `$ref` pointer leads
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefTarget<'a> {
    /// A named definition (or the root, keyed by [`ROOT_POINTER`])
    Internal { key: &'a str, node: &'a SchemaNode },
    /// Points outside this document
    External,
    /// Internal pointer with no matching definition
    Missing,
}

/// Root node, flat definition table, and presentation metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub root: SchemaNode,
    pub definitions: BTreeMap<String, SchemaNode>,
    pub title: Option<String>,
}

impl SchemaDocument {
    /// Build a document from a parsed JSON schema.
    ///
    /// `definitions`, `$defs` and OpenAPI-style `components.schemas` are all
    /// hoisted into one table; later tables win on name collisions.
    pub fn from_value(value: Value) -> MockResult<Self> {
        if !value.is_object() {
            return Err(MockError::InvalidSchema(
                "schema document must be a JSON object".to_string(),
            ));
        }

        let components = value
            .pointer("/components/schemas")
            .cloned()
            .map(serde_json::from_value::<BTreeMap<String, SchemaNode>>)
            .transpose()
            .map_err(|e| MockError::InvalidSchema(e.to_string()))?;

        let mut root = SchemaNode::from_value(value)?;
        let mut definitions = std::mem::take(&mut root.definitions);
        definitions.append(&mut std::mem::take(&mut root.defs));
        if let Some(mut components) = components {
            definitions.append(&mut components);
        }

        Ok(Self {
            title: root.title.clone(),
            root,
            definitions,
        })
    }

    /// Wrap a single node with no definition table
    pub fn from_node(root: SchemaNode) -> Self {
        Self {
            title: root.title.clone(),
            root,
            definitions: BTreeMap::new(),
        }
    }

    pub fn with_definition(mut self, name: impl Into<String>, node: SchemaNode) -> Self {
        self.definitions.insert(name.into(), node);
        self
    }

    /// Resolve a `$ref` pointer against this document
    pub fn lookup<'a>(&'a self, pointer: &'a str) -> RefTarget<'a> {
        if !pointer.starts_with('#') {
            return RefTarget::External;
        }
        if pointer == ROOT_POINTER || pointer == "#/" {
            return RefTarget::Internal {
                key: ROOT_POINTER,
                node: &self.root,
            };
        }

        let name = ["#/definitions/", "#/$defs/", "#/components/schemas/"]
            .iter()
            .find_map(|prefix| pointer.strip_prefix(prefix));

        match name.and_then(|n| self.definitions.get_key_value(&unescape_pointer(n))) {
            Some((key, node)) => RefTarget::Internal { key: key.as_str(), node },
            None => RefTarget::Missing,
        }
    }

    /// Root node with any top-level `$ref` chain followed
    pub fn resolved_root(&self) -> &SchemaNode {
        let mut node = &self.root;
        for _ in 0..self.definitions.len() + 1 {
            match node.reference.as_deref().map(|p| self.lookup(p)) {
                Some(RefTarget::Internal { node: target, .. }) if !std::ptr::eq(target, node) => {
                    node = target
                }
                _ => break,
            }
        }
        node
    }
}

fn unescape_pointer(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}
