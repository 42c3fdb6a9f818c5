//! Schema-to-value compilation

use parking_lot::Mutex;
use rand::prelude::*;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace};

use super::cache::{structural_hash, CacheStats, SchemaCache};
use super::generators::{generate_leaf, random_text};
use super::{Items, PrimitiveKind, RefTarget, SchemaDocument, SchemaNode, ShapeDriver};
use crate::config::{CacheConfig, GenerationConfig};
use crate::error::{MockError, MockResult};

/// Value emitted in place of a `$ref` that points outside the document
pub const EXTERNAL_REF_SENTINEL: &str = "<external-ref>";

/// Chance that a `nullable` node compiles to `null`
pub const NULLABLE_PROBABILITY: f64 = 0.1;

/// Default `minItems` / `maxItems` for single-schema arrays
pub const DEFAULT_MIN_ITEMS: u64 = 1;
pub const DEFAULT_MAX_ITEMS: u64 = 5;

/// Upper bound on generated array length regardless of `maxItems`
pub const MAX_GENERATED_ITEMS: u64 = 100;

/// Knobs the compiler reads on every walk
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    pub optional_property_probability: f64,
    pub max_depth: usize,
    pub use_examples: bool,
}

impl CompileOptions {
    /// Stable string mixed into cache keys
    pub fn fingerprint(&self) -> String {
        format!(
            "p={};d={};ex={}",
            self.optional_property_probability, self.max_depth, self.use_examples
        )
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::from(&GenerationConfig::default())
    }
}

impl From<&GenerationConfig> for CompileOptions {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            optional_property_probability: config.optional_property_probability.clamp(0.0, 1.0),
            max_depth: config.max_depth,
            use_examples: config.use_examples,
        }
    }
}

/// Turns schema nodes into concrete JSON values.
///
/// Each compilation draws a fresh child RNG from a shared seeded parent, so a
/// configured seed makes a sequence of compilations reproducible while
/// concurrent callers never contend on the RNG for more than one draw.
/// Parsed documents are memoized in a [`SchemaCache`] keyed by structural
/// hash.
pub struct SchemaCompiler {
    options: CompileOptions,
    rng: Mutex<StdRng>,
    documents: SchemaCache<Arc<SchemaDocument>>,
}

impl SchemaCompiler {
    pub fn new(config: &GenerationConfig) -> Self {
        Self::with_cache(config, &CacheConfig::default())
    }

    pub fn with_cache(config: &GenerationConfig, cache: &CacheConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            options: CompileOptions::from(config),
            rng: Mutex::new(rng),
            documents: SchemaCache::from_config(cache),
        }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Parse a raw schema into a document, memoized by structural hash
    pub fn prepare(&self, schema: &Value) -> MockResult<Arc<SchemaDocument>> {
        let key = structural_hash(schema, &self.options.fingerprint());
        self.documents.get_or_try_insert_with(key, || {
            debug!(key, "Preparing schema document");
            SchemaDocument::from_value(schema.clone()).map(Arc::new)
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.documents.stats()
    }

    /// Compile a document's root
    pub fn compile(&self, document: &SchemaDocument) -> MockResult<Value> {
        self.compile_node(document, &document.root)
    }

    /// Compile a node, resolving references against `document`
    pub fn compile_node(&self, document: &SchemaDocument, node: &SchemaNode) -> MockResult<Value> {
        let mut rng = self.child_rng();
        self.compile_with_rng(document, node, &mut rng)
    }

    /// Compile `count` independent samples of the document root
    pub fn compile_many(&self, document: &SchemaDocument, count: usize) -> MockResult<Vec<Value>> {
        let mut rng = self.child_rng();
        (0..count)
            .map(|_| self.compile_with_rng(document, &document.root, &mut rng))
            .collect()
    }

    /// Parse and compile a raw schema in one step
    pub fn compile_value(&self, schema: &Value) -> MockResult<Value> {
        let document = self.prepare(schema)?;
        self.compile(&document)
    }

    pub fn compile_with_rng<R: Rng + ?Sized>(
        &self,
        document: &SchemaDocument,
        node: &SchemaNode,
        rng: &mut R,
    ) -> MockResult<Value> {
        let mut walk = CompileWalk {
            document,
            options: &self.options,
            rng,
            resolving: HashSet::new(),
        };
        walk.compile(node, 0)
    }

    /// Draw a child RNG for one unit of work
    pub fn child_rng(&self) -> StdRng {
        let seed: u64 = self.rng.lock().gen();
        StdRng::seed_from_u64(seed)
    }
}

impl Default for SchemaCompiler {
    fn default() -> Self {
        Self::new(&GenerationConfig::default())
    }
}

impl std::fmt::Debug for SchemaCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCompiler")
            .field("options", &self.options)
            .field("cache", &self.documents.stats())
            .finish()
    }
}

struct CompileWalk<'a, R: ?Sized> {
    document: &'a SchemaDocument,
    options: &'a CompileOptions,
    rng: &'a mut R,
    /// Definition keys on the active recursion path
    resolving: HashSet<String>,
}

impl<'a, R: Rng + ?Sized> CompileWalk<'a, R> {
    fn compile(&mut self, node: &SchemaNode, depth: usize) -> MockResult<Value> {
        if depth > self.options.max_depth {
            trace!(depth, "Depth bound reached, emitting partial value");
            return Ok(self.partial(node));
        }

        if self.options.use_examples {
            if let Some(example) = node.examples.as_ref().and_then(|e| e.first()) {
                return Ok(example.clone());
            }
        }

        if node.is_nullable() && self.rng.gen_bool(NULLABLE_PROBABILITY) {
            return Ok(Value::Null);
        }

        match node.driver() {
            ShapeDriver::Ref(pointer) => self.compile_ref(pointer, depth),
            ShapeDriver::OneOf(branches) | ShapeDriver::AnyOf(branches) => {
                let branch = &branches[self.rng.gen_range(0..branches.len())];
                self.compile(branch, depth + 1)
            }
            ShapeDriver::AllOf(branches) => self.compile_all_of(branches, depth),
            ShapeDriver::Const(value) => Ok(value.clone()),
            ShapeDriver::Enum(values) => Ok(values[self.rng.gen_range(0..values.len())].clone()),
            ShapeDriver::Typed(kind) => self.compile_kind(node, kind, depth),
            ShapeDriver::Union(kinds) => {
                // Null members were already given their chance above
                let concrete: Vec<PrimitiveKind> =
                    kinds.iter().copied().filter(|k| *k != PrimitiveKind::Null).collect();
                if concrete.is_empty() {
                    return Ok(Value::Null);
                }
                let kind = concrete[self.rng.gen_range(0..concrete.len())];
                self.compile_kind(node, kind, depth)
            }
            ShapeDriver::Untyped => Ok(node
                .default
                .clone()
                .unwrap_or_else(|| Value::String(random_text(8, &mut *self.rng)))),
        }
    }

    fn compile_ref(&mut self, pointer: &str, depth: usize) -> MockResult<Value> {
        let document = self.document;
        match document.lookup(pointer) {
            RefTarget::Internal { key, node } => {
                if !self.resolving.insert(key.to_string()) {
                    trace!(pointer, "Cycle detected, emitting empty object");
                    return Ok(json!({}));
                }
                let result = self.compile(node, depth + 1);
                self.resolving.remove(key);
                result
            }
            RefTarget::External => Ok(Value::String(EXTERNAL_REF_SENTINEL.to_string())),
            RefTarget::Missing => Err(MockError::RefResolution {
                pointer: pointer.to_string(),
            }),
        }
    }

    /// Object branches are shallow-merged in order; without any object branch
    /// the last branch's value stands.
    fn compile_all_of(&mut self, branches: &[SchemaNode], depth: usize) -> MockResult<Value> {
        let mut merged: Option<Map<String, Value>> = None;
        let mut last = Value::Null;

        for branch in branches {
            match self.compile(branch, depth + 1)? {
                Value::Object(fields) => merged.get_or_insert_with(Map::new).extend(fields),
                other => last = other,
            }
        }

        Ok(merged.map(Value::Object).unwrap_or(last))
    }

    fn compile_kind(&mut self, node: &SchemaNode, kind: PrimitiveKind, depth: usize) -> MockResult<Value> {
        match kind {
            PrimitiveKind::Object => self.compile_object(node, depth),
            PrimitiveKind::Array => self.compile_array(node, depth),
            leaf => Ok(generate_leaf(leaf, node, &mut *self.rng)),
        }
    }

    fn compile_object(&mut self, node: &SchemaNode, depth: usize) -> MockResult<Value> {
        let mut fields = Map::new();
        for (name, property) in &node.properties {
            let include = node.is_required(name)
                || self.rng.gen_bool(self.options.optional_property_probability);
            if include {
                fields.insert(name.clone(), self.compile(property, depth + 1)?);
            }
        }
        Ok(Value::Object(fields))
    }

    fn compile_array(&mut self, node: &SchemaNode, depth: usize) -> MockResult<Value> {
        let elements = match &node.items {
            Some(Items::Tuple(positions)) => positions
                .iter()
                .map(|item| self.compile(item, depth + 1))
                .collect::<MockResult<Vec<_>>>()?,
            Some(Items::Single(item)) => {
                let (min, max) = item_bounds(node);
                let count = self.rng.gen_range(min..=max);
                (0..count)
                    .map(|_| self.compile(item, depth + 1))
                    .collect::<MockResult<Vec<_>>>()?
            }
            None => {
                let count = node.min_items.unwrap_or(0).min(MAX_GENERATED_ITEMS);
                (0..count)
                    .map(|_| Value::String(random_text(6, &mut *self.rng)))
                    .collect()
            }
        };
        Ok(Value::Array(elements))
    }

    /// Best-effort value for a node past the depth bound
    fn partial(&mut self, node: &SchemaNode) -> Value {
        match node.driver() {
            ShapeDriver::Const(value) => value.clone(),
            ShapeDriver::Enum(values) => values[0].clone(),
            ShapeDriver::Typed(PrimitiveKind::Array) => json!([]),
            ShapeDriver::Typed(PrimitiveKind::Object) => json!({}),
            ShapeDriver::Typed(kind) => generate_leaf(kind, node, &mut *self.rng),
            _ => json!({}),
        }
    }
}

/// Inclusive `[minItems, maxItems]` with defaults applied
fn item_bounds(node: &SchemaNode) -> (u64, u64) {
    let min = node
        .min_items
        .unwrap_or_else(|| DEFAULT_MIN_ITEMS.min(node.max_items.unwrap_or(DEFAULT_MIN_ITEMS)))
        .min(MAX_GENERATED_ITEMS);
    let max = node
        .max_items
        .unwrap_or_else(|| min.max(DEFAULT_MAX_ITEMS))
        .clamp(min, MAX_GENERATED_ITEMS.max(min));
    (min, max)
}
