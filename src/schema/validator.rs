//! Strict-mode request body checking

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use super::pattern::pattern_matches;
use super::{ExclusiveBound, Items, PrimitiveKind, RefTarget, SchemaDocument, SchemaNode, ShapeDriver};

/// Root path marker used in failure reports
pub const ROOT_PATH: &str = "$";

/// First failing check found while walking a body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationFailure {
    /// Dotted field path, `$` for the body itself
    pub path: String,
    /// Human-readable description of the violated constraint
    pub expected: String,
    /// The offending value (`null` when absent)
    pub actual: Value,
}

impl ValidationFailure {
    pub fn new(path: impl Into<String>, expected: impl Into<String>, actual: Value) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
            actual,
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}, got {}", self.path, self.expected, self.actual)
    }
}

/// Walks a [`SchemaDocument`] against a JSON value in check mode.
///
/// Checks short-circuit: the first violation is returned and nothing after
/// it is inspected.
#[derive(Debug, Clone, Copy)]
pub struct RequestValidator<'a> {
    document: &'a SchemaDocument,
}

impl<'a> RequestValidator<'a> {
    pub fn new(document: &'a SchemaDocument) -> Self {
        Self { document }
    }

    /// Validate a request body; an absent body is checked as `null`
    pub fn validate(&self, body: Option<&Value>) -> Result<(), ValidationFailure> {
        let body = body.unwrap_or(&Value::Null);
        self.validate_node(&self.document.root, body)
    }

    /// Validate `value` against an arbitrary node of this document
    pub fn validate_node(&self, node: &SchemaNode, value: &Value) -> Result<(), ValidationFailure> {
        let mut walk = CheckWalk {
            document: self.document,
            resolving: HashSet::new(),
        };
        walk.check(node, value, ROOT_PATH)
    }
}

struct CheckWalk<'a> {
    document: &'a SchemaDocument,
    /// (definition key, path) pairs currently on the stack
    resolving: HashSet<(String, String)>,
}

impl<'a> CheckWalk<'a> {
    fn check(&mut self, node: &SchemaNode, value: &Value, path: &str) -> Result<(), ValidationFailure> {
        if value.is_null() && node.is_nullable() {
            return Ok(());
        }

        match node.driver() {
            ShapeDriver::Ref(pointer) => self.check_ref(pointer, value, path),
            ShapeDriver::AllOf(branches) => {
                for branch in branches {
                    self.check(branch, value, path)?;
                }
                Ok(())
            }
            ShapeDriver::AnyOf(branches) => {
                if branches.iter().any(|b| self.check(b, value, path).is_ok()) {
                    Ok(())
                } else {
                    Err(fail(path, "a value matching at least one anyOf branch", value))
                }
            }
            ShapeDriver::OneOf(branches) => {
                let matched = branches
                    .iter()
                    .filter(|b| self.check(b, value, path).is_ok())
                    .count();
                if matched == 1 {
                    Ok(())
                } else {
                    Err(fail(path, "a value matching exactly one oneOf branch", value))
                }
            }
            ShapeDriver::Const(expected) => {
                if value == expected {
                    Ok(())
                } else {
                    Err(fail(path, format!("const {}", expected), value))
                }
            }
            ShapeDriver::Enum(options) => {
                if options.contains(value) {
                    Ok(())
                } else {
                    Err(fail(path, format!("one of {}", Value::Array(options.to_vec())), value))
                }
            }
            ShapeDriver::Typed(kind) => self.check_kind(node, kind, value, path),
            ShapeDriver::Union(kinds) => match kinds.iter().find(|k| k.matches(value)) {
                Some(kind) => self.check_kind(node, *kind, value, path),
                None => {
                    let names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
                    Err(fail(path, names.join(" | "), value))
                }
            },
            ShapeDriver::Untyped => Ok(()),
        }
    }

    fn check_ref(&mut self, pointer: &str, value: &Value, path: &str) -> Result<(), ValidationFailure> {
        let document = self.document;
        match document.lookup(pointer) {
            RefTarget::Internal { key, node } => {
                let frame = (key.to_string(), path.to_string());
                if !self.resolving.insert(frame.clone()) {
                    return Ok(());
                }
                let result = self.check(node, value, path);
                self.resolving.remove(&frame);
                result
            }
            RefTarget::External => Ok(()),
            RefTarget::Missing => Err(fail(path, format!("resolvable reference {}", pointer), value)),
        }
    }

    fn check_kind(
        &mut self,
        node: &SchemaNode,
        kind: PrimitiveKind,
        value: &Value,
        path: &str,
    ) -> Result<(), ValidationFailure> {
        if !kind.matches(value) {
            return Err(fail(path, kind.as_str(), value));
        }

        match (kind, value) {
            (PrimitiveKind::Object, Value::Object(map)) => {
                for name in &node.required {
                    if !map.contains_key(name) {
                        return Err(ValidationFailure::new(
                            child_path(path, name),
                            "required property",
                            Value::Null,
                        ));
                    }
                }
                for (name, property) in &node.properties {
                    if let Some(field) = map.get(name) {
                        self.check(property, field, &child_path(path, name))?;
                    }
                }
                Ok(())
            }
            (PrimitiveKind::Array, Value::Array(elements)) => {
                let len = elements.len() as u64;
                if let Some(min) = node.min_items.filter(|min| len < *min) {
                    return Err(fail(path, format!("minItems {}", min), value));
                }
                if let Some(max) = node.max_items.filter(|max| len > *max) {
                    return Err(fail(path, format!("maxItems {}", max), value));
                }
                match &node.items {
                    Some(Items::Single(item)) => {
                        for (i, element) in elements.iter().enumerate() {
                            self.check(item, element, &index_path(path, i))?;
                        }
                    }
                    Some(Items::Tuple(positions)) => {
                        for (i, (item, element)) in positions.iter().zip(elements).enumerate() {
                            self.check(item, element, &index_path(path, i))?;
                        }
                    }
                    None => {}
                }
                Ok(())
            }
            (PrimitiveKind::String, Value::String(s)) => check_string(node, s, value, path),
            (PrimitiveKind::Number | PrimitiveKind::Integer, Value::Number(n)) => {
                check_number(node, n.as_f64().unwrap_or_default(), value, path)
            }
            _ => Ok(()),
        }
    }
}

fn check_string(node: &SchemaNode, s: &str, value: &Value, path: &str) -> Result<(), ValidationFailure> {
    let len = s.chars().count() as u64;
    if let Some(min) = node.min_length.filter(|min| len < *min) {
        return Err(fail(path, format!("minLength {}", min), value));
    }
    if let Some(max) = node.max_length.filter(|max| len > *max) {
        return Err(fail(path, format!("maxLength {}", max), value));
    }
    if let Some(pattern) = &node.pattern {
        if pattern_matches(pattern, s) == Some(false) {
            return Err(fail(path, format!("pattern {}", pattern), value));
        }
    }
    if let Some(format) = &node.format {
        if !format_matches(format, s) {
            return Err(fail(path, format!("format {}", format), value));
        }
    }
    Ok(())
}

fn check_number(node: &SchemaNode, n: f64, value: &Value, path: &str) -> Result<(), ValidationFailure> {
    let exclusive_min = matches!(node.exclusive_minimum, Some(ExclusiveBound::Flag(true)));
    let exclusive_max = matches!(node.exclusive_maximum, Some(ExclusiveBound::Flag(true)));

    if let Some(min) = node.minimum {
        if n < min || (exclusive_min && n == min) {
            let label = if exclusive_min { "exclusiveMinimum" } else { "minimum" };
            return Err(fail(path, format!("{} {}", label, min), value));
        }
    }
    if let Some(max) = node.maximum {
        if n > max || (exclusive_max && n == max) {
            let label = if exclusive_max { "exclusiveMaximum" } else { "maximum" };
            return Err(fail(path, format!("{} {}", label, max), value));
        }
    }
    if let Some(ExclusiveBound::Value(bound)) = node.exclusive_minimum {
        if n <= bound {
            return Err(fail(path, format!("exclusiveMinimum {}", bound), value));
        }
    }
    if let Some(ExclusiveBound::Value(bound)) = node.exclusive_maximum {
        if n >= bound {
            return Err(fail(path, format!("exclusiveMaximum {}", bound), value));
        }
    }
    if let Some(step) = node.multiple_of.filter(|m| *m > 0.0) {
        let quotient = n / step;
        if (quotient - quotient.round()).abs() > 1e-9 {
            return Err(fail(path, format!("multipleOf {}", step), value));
        }
    }
    Ok(())
}

/// Formats without a checker always pass
fn format_matches(format: &str, s: &str) -> bool {
    match format.to_ascii_lowercase().as_str() {
        "uuid" => uuid::Uuid::parse_str(s).is_ok(),
        "date-time" => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
        "date" => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
        "email" | "idn-email" => match s.split_once('@') {
            Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
            None => false,
        },
        "ipv4" => s.parse::<Ipv4Addr>().is_ok(),
        "ipv6" => s.parse::<Ipv6Addr>().is_ok(),
        _ => true,
    }
}

fn fail(path: &str, expected: impl Into<String>, actual: &Value) -> ValidationFailure {
    ValidationFailure::new(path, expected, actual.clone())
}

fn child_path(parent: &str, name: &str) -> String {
    if parent == ROOT_PATH {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}
