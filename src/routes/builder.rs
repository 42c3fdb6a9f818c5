//! Route table assembly from resource schemas and explicit definitions

use rand::Rng;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use super::pluralize::pluralize;
use super::store::IdKind;
use super::{HttpMethod, MockRequest, ResponseSource, RouteDef, RouteDescriptor, RouteTable};
use crate::config::MockServerConfig;
use crate::error::{MockError, MockResult};
use crate::schema::SchemaDocument;

/// Noun used when a schema has no title and no override is configured
pub const DEFAULT_RESOURCE_NAME: &str = "Resource";

/// Fields stamped by the server on create and replace
const SERVER_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];

/// Builds a [`RouteTable`] from CRUD-derived and explicit routes.
///
/// Registration order is preserved across both modes, so when a derived
/// route and an explicit one share a key the later call owns it.
#[derive(Debug)]
pub struct RouteTableBuilder {
    base_path: String,
    list_min: usize,
    list_max: usize,
    table: RouteTable,
}

impl RouteTableBuilder {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            list_min: 3,
            list_max: 10,
            table: RouteTable::new(),
        }
    }

    pub fn from_config(config: &MockServerConfig) -> Self {
        Self::new(config.server.base_path.clone())
            .list_size(config.generation.list_min, config.generation.list_max)
    }

    /// Item count range for list endpoints
    pub fn list_size(mut self, min: usize, max: usize) -> Self {
        self.list_min = min.min(max);
        self.list_max = max.max(min);
        self
    }

    /// Derive list/get/create/replace/delete routes for one resource schema
    pub fn resource(mut self, document: Arc<SchemaDocument>, name: Option<&str>) -> Self {
        let noun = resource_noun(&document, name);
        let collection = collection_path(&self.base_path, &noun);
        let item = format!("{}/{{id}}", collection);
        let label = noun.to_lowercase();
        let id_kind = IdKind::for_resource(document.resolved_root());
        let body_schema = Arc::new(body_validation_schema(&document));

        info!(
            resource = %noun,
            collection = %collection,
            "Deriving CRUD routes"
        );

        let (list_min, list_max) = (self.list_min, self.list_max);
        let list = {
            let document = Arc::clone(&document);
            let label = label.clone();
            ResponseSource::computed(move |_, ctx| {
                let mut rng = ctx.compiler.child_rng();
                let count = rng.gen_range(list_min..=list_max);
                let items = (0..count)
                    .map(|_| ctx.compiler.compile_with_rng(&document, &document.root, &mut rng))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(json!({
                    "success": true,
                    "data": items,
                    "count": count,
                    "message": format!("Retrieved {} {}", count, pluralize(&label)),
                }))
            })
        };

        let get = {
            let document = Arc::clone(&document);
            let label = label.clone();
            ResponseSource::computed(move |request, ctx| {
                let id = path_id(request);
                let mut item = ctx.compiler.compile(&document)?;
                if let Value::Object(fields) = &mut item {
                    fields.insert("id".to_string(), Value::String(id.clone()));
                }
                Ok(json!({
                    "success": true,
                    "data": item,
                    "message": format!("Retrieved {} {}", label, id),
                }))
            })
        };

        let create = {
            let document = Arc::clone(&document);
            let label = label.clone();
            ResponseSource::computed(move |request, ctx| {
                let mut fields = match &request.body {
                    Some(body) => body_fields(body)?,
                    None => match ctx.compiler.compile(&document)? {
                        Value::Object(fields) => fields,
                        _ => Map::new(),
                    },
                };
                let now = ctx.store.timestamp();
                fields.insert("id".to_string(), ctx.store.next_id(id_kind));
                fields.insert("createdAt".to_string(), Value::String(now.clone()));
                fields.insert("updatedAt".to_string(), Value::String(now));
                ctx.store.record_create();
                Ok(json!({
                    "success": true,
                    "data": fields,
                    "message": format!("Created {}", label),
                }))
            })
        };

        let replace = {
            let label = label.clone();
            ResponseSource::computed(move |request, ctx| {
                let id = path_id(request);
                let mut fields = match &request.body {
                    Some(body) => body_fields(body)?,
                    None => Map::new(),
                };
                fields.insert("id".to_string(), Value::String(id.clone()));
                fields.insert("updatedAt".to_string(), Value::String(ctx.store.timestamp()));
                ctx.store.record_update();
                Ok(json!({
                    "success": true,
                    "data": fields,
                    "message": format!("Updated {} {}", label, id),
                }))
            })
        };

        let delete = ResponseSource::computed(move |request, ctx| {
            let id = path_id(request);
            ctx.store.record_delete();
            Ok(json!({
                "success": true,
                "message": format!("Deleted {} {}", label, id),
            }))
        });

        let routes = [
            RouteDescriptor::new(HttpMethod::Get, &collection, list),
            RouteDescriptor::new(HttpMethod::Get, &item, get),
            RouteDescriptor::new(HttpMethod::Post, &collection, create)
                .with_status(201)
                .with_validation(Arc::clone(&body_schema)),
            RouteDescriptor::new(HttpMethod::Put, &item, replace).with_validation(body_schema),
            RouteDescriptor::new(HttpMethod::Delete, &item, delete).with_status(204),
        ];
        for route in routes {
            self = self.route(route);
        }
        self
    }

    /// Register explicit definitions verbatim, in order
    pub fn routes(mut self, definitions: Vec<RouteDef>) -> MockResult<Self> {
        for definition in definitions {
            self = self.route(definition.into_descriptor()?);
        }
        Ok(self)
    }

    /// Register one descriptor, replacing any earlier one with the same key
    pub fn route(mut self, route: RouteDescriptor) -> Self {
        debug!(method = %route.method, path = %route.path, source = route.source.kind(), "Registering route");
        if self.table.insert(route).is_some() {
            debug!("Route replaced an earlier registration");
        }
        self
    }

    pub fn build(self) -> RouteTable {
        self.table
    }
}

/// Resource noun: explicit override, then schema title, then the default
pub fn resource_noun(document: &SchemaDocument, name: Option<&str>) -> String {
    name.map(str::to_string)
        .or_else(|| document.title.clone())
        .or_else(|| document.resolved_root().title.clone())
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_RESOURCE_NAME.to_string())
}

/// Collection path for a noun: lowercase, kebab-case, last word pluralized
pub fn collection_path(base_path: &str, noun: &str) -> String {
    let mut words: Vec<String> = split_words(noun);
    if let Some(last) = words.last_mut() {
        *last = pluralize(last);
    }
    let slug = words.join("-");
    let base = base_path.trim_end_matches('/');
    format!("{}/{}", base, slug)
}

fn split_words(noun: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in noun.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_numeric();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn path_id(request: &MockRequest) -> String {
    request.param("id").unwrap_or_default().to_string()
}

fn body_fields(body: &Value) -> MockResult<Map<String, Value>> {
    match body {
        Value::Object(fields) => Ok(fields.clone()),
        other => Err(MockError::InvalidBody(format!(
            "expected a JSON object, got {}",
            kind_name(other)
        ))),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Request body schema for create/replace: the resource root without the
/// server-stamped fields in `required`
fn body_validation_schema(document: &SchemaDocument) -> SchemaDocument {
    let mut root = document.resolved_root().clone();
    root.required.retain(|name| !SERVER_FIELDS.contains(&name.as_str()));
    SchemaDocument {
        root,
        definitions: document.definitions.clone(),
        title: document.title.clone(),
    }
}
