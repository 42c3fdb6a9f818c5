//! Route descriptors, the route table, and path-template matching

mod builder;
mod pluralize;
mod store;

pub use builder::*;
pub use pluralize::*;
pub use store::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{MockError, MockResult};
use crate::schema::{SchemaCompiler, SchemaDocument};

/// Methods a route may be registered under
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    pub fn from_http(method: &axum::http::Method) -> MockResult<Self> {
        method.as_str().parse()
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = MockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(MockError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Request as seen by response sources
#[derive(Debug, Clone, Default)]
pub struct MockRequest {
    pub method: HttpMethod,
    pub path: String,
    /// Named path parameters, filled in once a route matches
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
}

impl MockRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Collaborators a computed response may use
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    pub compiler: &'a SchemaCompiler,
    pub store: &'a ResourceStore,
}

/// Function-of-request response body
pub type ComputeFn =
    Arc<dyn Fn(&MockRequest, &HandlerContext<'_>) -> MockResult<Value> + Send + Sync>;

/// Where a route's response body comes from
#[derive(Clone)]
pub enum ResponseSource {
    /// Fixed JSON value
    Literal(Value),
    /// Compiled fresh from a schema on every request
    Generated(Arc<SchemaDocument>),
    /// Computed from the request
    Computed(ComputeFn),
}

impl ResponseSource {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&MockRequest, &HandlerContext<'_>) -> MockResult<Value> + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Literal(_) => "literal",
            Self::Generated(_) => "generated",
            Self::Computed(_) => "computed",
        }
    }
}

impl fmt::Debug for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Generated(doc) => f.debug_tuple("Generated").field(&doc.title).finish(),
            Self::Computed(_) => f.write_str("Computed(<fn>)"),
        }
    }
}

/// One parsed path-template segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        if let Some(name) = raw.strip_prefix(':') {
            return Self::Param(name.to_string());
        }
        match raw.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
            Some(name) => Self::Param(name.to_string()),
            None => Self::Literal(raw.to_string()),
        }
    }
}

/// Single route: method, template, response source and response metadata
#[derive(Debug, Clone)]
pub struct RouteDescriptor {
    pub method: HttpMethod,
    pub path: String,
    pub source: ResponseSource,
    pub status: u16,
    pub delay: Option<Duration>,
    pub headers: BTreeMap<String, String>,
    /// Strict-mode request body schema
    pub validation: Option<Arc<SchemaDocument>>,
    segments: Vec<Segment>,
}

impl RouteDescriptor {
    pub fn new(method: HttpMethod, path: impl AsRef<str>, source: ResponseSource) -> Self {
        let path = normalize_path(path.as_ref());
        let segments = split_path(&path).map(Segment::parse).collect();
        Self {
            method,
            path,
            source,
            status: 200,
            delay: None,
            headers: BTreeMap::new(),
            validation: None,
            segments,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_validation(mut self, schema: Arc<SchemaDocument>) -> Self {
        self.validation = Some(schema);
        self
    }

    /// Table key; `:id` and `{id}` spell the same template
    pub fn key(&self) -> (HttpMethod, String) {
        let template = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Literal(l) => l.clone(),
                Segment::Param(p) => format!("{{{}}}", p),
            })
            .collect::<Vec<_>>()
            .join("/");
        (self.method, format!("/{}", template))
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn param_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Number of literal segments, used to rank overlapping templates
    pub fn specificity(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Extract path parameters if `path` fits this template
    pub fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        let mut params = HashMap::new();
        let mut parts = split_path(path);

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    let value = urlencoding::decode(part)
                        .map(|s| s.into_owned())
                        .unwrap_or_else(|_| part.to_string());
                    params.insert(name.clone(), value);
                }
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }
}

/// Successful lookup: the route plus extracted parameters
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a RouteDescriptor,
    pub params: HashMap<String, String>,
}

/// Insertion-ordered map from (method, template) to descriptor.
///
/// Re-registering a key replaces the earlier descriptor wholesale and keeps
/// its original position.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
    index: HashMap<(HttpMethod, String), usize>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route, returning the descriptor it replaced
    pub fn insert(&mut self, route: RouteDescriptor) -> Option<RouteDescriptor> {
        let key = route.key();
        match self.index.get(&key) {
            Some(&idx) => Some(std::mem::replace(&mut self.routes[idx], route)),
            None => {
                self.index.insert(key, self.routes.len());
                self.routes.push(route);
                None
            }
        }
    }

    /// Exact template lookup
    pub fn get(&self, method: HttpMethod, template: &str) -> Option<&RouteDescriptor> {
        let needle = RouteDescriptor::new(method, template, ResponseSource::Literal(Value::Null));
        self.index.get(&needle.key()).map(|&idx| &self.routes[idx])
    }

    /// Find the route serving `method path`.
    ///
    /// When several templates fit, the one with more literal segments wins;
    /// ties go to the earlier registration.
    pub fn match_route(&self, method: HttpMethod, path: &str) -> Option<RouteMatch<'_>> {
        let path = path.split('?').next().unwrap_or_default();
        let mut best: Option<RouteMatch<'_>> = None;

        for route in self.routes.iter().filter(|r| r.method == method) {
            if let Some(params) = route.match_path(path) {
                let better = best
                    .as_ref()
                    .map_or(true, |b| route.specificity() > b.route.specificity());
                if better {
                    best = Some(RouteMatch { route, params });
                }
            }
        }

        best
    }

    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Explicit route definition as written in a routes file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDef {
    pub path: String,
    #[serde(default = "default_method")]
    pub method: String,
    /// Literal response body
    #[serde(default)]
    pub response: Value,
    #[serde(default, alias = "status_code", alias = "status")]
    pub status_code: Option<u16>,
    /// Fixed delay in milliseconds
    #[serde(default)]
    pub delay: Option<u64>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Generate the body from this schema instead of returning `response`
    #[serde(default)]
    pub schema: Option<Value>,
    /// Strict-mode request body schema
    #[serde(default)]
    pub validation: Option<Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl RouteDef {
    pub fn new(method: impl Into<String>, path: impl Into<String>, response: Value) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            response,
            status_code: None,
            delay: None,
            headers: BTreeMap::new(),
            schema: None,
            validation: None,
        }
    }

    /// Convert to a descriptor; unknown methods are a configuration error
    pub fn into_descriptor(self) -> MockResult<RouteDescriptor> {
        let method: HttpMethod = self.method.parse()?;
        if !self.path.starts_with('/') {
            return Err(MockError::config(
                format!("Route path must start with '/': {}", self.path),
                "routes.path",
            ));
        }

        let source = match self.schema {
            Some(schema) => ResponseSource::Generated(Arc::new(SchemaDocument::from_value(schema)?)),
            None => ResponseSource::Literal(self.response),
        };

        let mut route = RouteDescriptor::new(method, &self.path, source)
            .with_status(self.status_code.unwrap_or(200));
        if let Some(ms) = self.delay {
            route = route.with_delay(Duration::from_millis(ms));
        }
        for (name, value) in self.headers {
            route = route.with_header(name, value);
        }
        if let Some(schema) = self.validation {
            route = route.with_validation(Arc::new(SchemaDocument::from_value(schema)?));
        }
        Ok(route)
    }

    /// Load a list of definitions from a JSON or YAML file
    pub fn load_file<P: AsRef<Path>>(path: P) -> MockResult<Vec<Self>> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MockError::config(format!("Failed to read routes file: {}", e), "routes")
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .map_err(|e| MockError::config(format!("YAML parse error: {}", e), "routes")),
            _ => serde_json::from_str(&content)
                .map_err(|e| MockError::config(format!("JSON parse error: {}", e), "routes")),
        }
    }
}

/// Leading slash, no trailing slash, no empty segments
pub fn normalize_path(path: &str) -> String {
    let joined = split_path(path).collect::<Vec<_>>().join("/");
    format!("/{}", joined)
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn literal(method: HttpMethod, path: &str, body: Value) -> RouteDescriptor {
        RouteDescriptor::new(method, path, ResponseSource::Literal(body))
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("Delete".parse::<HttpMethod>().unwrap(), HttpMethod::Delete);
        assert_matches!("TRACE".parse::<HttpMethod>(), Err(MockError::UnsupportedMethod(_)));
    }

    #[test]
    fn test_path_params_both_syntaxes() {
        let colon = literal(HttpMethod::Get, "/users/:id/posts/:post", json!(null));
        let params = colon.match_path("/users/7/posts/abc").unwrap();
        assert_eq!(params["id"], "7");
        assert_eq!(params["post"], "abc");

        let braces = literal(HttpMethod::Get, "/users/{id}", json!(null));
        assert_eq!(braces.match_path("/users/42/").unwrap()["id"], "42");
        assert!(braces.match_path("/users").is_none());
        assert!(braces.match_path("/users/1/extra").is_none());

        // Parameters are percent-decoded; undecodable input is kept raw
        assert_eq!(braces.match_path("/users/a%20b").unwrap()["id"], "a b");
        assert_eq!(braces.match_path("/users/%FF").unwrap()["id"], "%FF");

        assert_eq!(colon.param_names(), vec!["id", "post"]);
    }

    #[test]
    fn test_last_write_wins_keeps_position() {
        let mut table = RouteTable::new();
        table.insert(literal(HttpMethod::Get, "/a", json!(1)));
        table.insert(literal(HttpMethod::Get, "/b", json!(2)));
        let replaced = table.insert(literal(HttpMethod::Get, "/a/", json!(3)));

        assert!(replaced.is_some());
        assert_eq!(table.len(), 2);
        assert_eq!(table.routes()[0].path, "/a");
        let matched = table.match_route(HttpMethod::Get, "/a").unwrap();
        assert_matches!(&matched.route.source, ResponseSource::Literal(v) if *v == json!(3));
    }

    #[test]
    fn test_colon_and_brace_templates_share_a_key() {
        let mut table = RouteTable::new();
        table.insert(literal(HttpMethod::Get, "/items/:id", json!("first")));
        table.insert(literal(HttpMethod::Get, "/items/{id}", json!("second")));
        assert_eq!(table.len(), 1);
        assert!(table.get(HttpMethod::Get, "/items/:id").is_some());
    }

    #[test]
    fn test_specificity_and_method() {
        let mut table = RouteTable::new();
        table.insert(literal(HttpMethod::Get, "/users/{id}", json!("by-id")));
        table.insert(literal(HttpMethod::Get, "/users/me", json!("me")));
        table.insert(literal(HttpMethod::Post, "/users", json!("create")));

        let matched = table.match_route(HttpMethod::Get, "/users/me").unwrap();
        assert_eq!(matched.route.path, "/users/me");

        let matched = table.match_route(HttpMethod::Get, "/users/9?verbose=1").unwrap();
        assert_eq!(matched.params["id"], "9");

        assert!(table.match_route(HttpMethod::Delete, "/users/9").is_none());
        assert!(table.match_route(HttpMethod::Get, "/users").is_none());
    }

    #[test]
    fn test_route_def_parsing() {
        let defs: Vec<RouteDef> = serde_json::from_value(json!([
            {"path": "/health-check", "response": {"ok": true}},
            {"path": "/orders", "method": "post", "statusCode": 202, "delay": 25,
             "headers": {"x-mock": "1"}, "validation": {"type": "object", "required": ["sku"]}},
            {"path": "/users/:id", "schema": {"type": "object", "properties": {"id": {"type": "string"}}}}
        ]))
        .unwrap();

        let get = defs[0].clone().into_descriptor().unwrap();
        assert_eq!(get.method, HttpMethod::Get);
        assert_eq!(get.status, 200);

        let post = defs[1].clone().into_descriptor().unwrap();
        assert_eq!(post.status, 202);
        assert_eq!(post.delay, Some(Duration::from_millis(25)));
        assert_eq!(post.headers["x-mock"], "1");
        assert!(post.validation.is_some());

        let generated = defs[2].clone().into_descriptor().unwrap();
        assert_eq!(generated.source.kind(), "generated");
    }

    #[test]
    fn test_route_def_rejects_unknown_method() {
        let def = RouteDef::new("BREW", "/coffee", json!({}));
        assert_matches!(def.into_descriptor(), Err(MockError::UnsupportedMethod(_)));

        let def = RouteDef::new("GET", "coffee", json!({}));
        assert_matches!(def.into_descriptor(), Err(MockError::Config { .. }));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("api//users/"), "/api/users");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
    }
}
