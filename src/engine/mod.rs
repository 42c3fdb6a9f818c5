//! Request pipeline
//!
//! The MockEngine turns a [`MockRequest`] into a [`MockResponse`]:
//! - Matching the request against the active route table
//! - Applying the configured scenario (latency, injected errors)
//! - Validating request bodies in strict mode
//! - Computing the response from its literal, schema or function source

mod scenario;
mod state;

pub use scenario::*;
pub use state::*;

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::MockServerConfig;
use crate::error::{MockError, MockResult};
use crate::routes::{HandlerContext, MockRequest, ResourceStore, ResponseSource, RouteDescriptor, RouteTable};
use crate::schema::{RequestValidator, SchemaCompiler};

/// Status, headers and optional JSON body produced for one request
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl MockResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Some(body),
        }
    }

    /// Error envelope for `error`
    pub fn from_error(error: &MockError) -> Self {
        let body = serde_json::to_value(error.to_error_response()).unwrap_or(Value::Null);
        Self::new(error.status_code().as_u16(), body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Per-session request engine
pub struct MockEngine {
    config: MockServerConfig,
    routes: RwLock<Arc<RouteTable>>,
    compiler: Arc<SchemaCompiler>,
    scenario: ScenarioEngine,
    store: ResourceStore,
    stats: RuntimeStats,
    start_time: Instant,
}

impl MockEngine {
    pub fn new(config: MockServerConfig, routes: RouteTable, compiler: Arc<SchemaCompiler>) -> Self {
        let scenario = ScenarioEngine::new(config.scenarios.clone());
        Self {
            config,
            routes: RwLock::new(Arc::new(routes)),
            compiler,
            scenario,
            store: ResourceStore::new(),
            stats: RuntimeStats::new(),
            start_time: Instant::now(),
        }
    }

    pub fn config(&self) -> &MockServerConfig {
        &self.config
    }

    /// Snapshot of the active route table
    pub fn routes(&self) -> Arc<RouteTable> {
        Arc::clone(&self.routes.read())
    }

    /// Swap in a new route table; in-flight requests finish on the old one
    pub fn replace_routes(&self, routes: RouteTable) {
        info!(routes = routes.len(), "Route table replaced");
        *self.routes.write() = Arc::new(routes);
    }

    pub fn compiler(&self) -> &SchemaCompiler {
        &self.compiler
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Run one request through the full pipeline. Never fails: every error
    /// becomes an error envelope with the matching status.
    pub async fn handle(&self, mut request: MockRequest) -> MockResponse {
        let started = Instant::now();
        self.stats.record_request();

        let response = self.dispatch(&mut request).await;

        self.stats.record_latency(started.elapsed());
        debug!(
            method = %request.method,
            path = %request.path,
            status = response.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request handled"
        );
        response
    }

    async fn dispatch(&self, request: &mut MockRequest) -> MockResponse {
        let table = self.routes();
        let Some(matched) = table.match_route(request.method, &request.path) else {
            self.stats.record_not_found();
            return MockResponse::from_error(&MockError::NotFound {
                method: request.method.to_string(),
                path: request.path.clone(),
            });
        };
        request.params = matched.params;
        let route = matched.route;

        if let Some(scenario) = self.config.server.scenario {
            if let Some(delay) = self.scenario.sample_delay(scenario) {
                self.stats.record_injected_delay();
                debug!(%scenario, delay_ms = delay.as_millis() as u64, "Injecting scenario delay");
                tokio::time::sleep(delay).await;
            }
            if let Some(error) = self.scenario.maybe_inject_error(scenario) {
                self.stats.record_injected_error();
                info!(%scenario, status = error.status_code().as_u16(), path = %request.path, "Injecting scenario error");
                return MockResponse::from_error(&error);
            }
        }

        if self.config.server.strict_mode {
            if let Some(schema) = &route.validation {
                if let Err(failure) = RequestValidator::new(schema).validate(request.body.as_ref()) {
                    self.stats.record_validation_rejection();
                    warn!(
                        path = %request.path,
                        field = %failure.path,
                        expected = %failure.expected,
                        "Request body failed validation"
                    );
                    return MockResponse::from_error(&MockError::Validation(failure));
                }
            }
        }

        if let Some(delay) = route.delay {
            tokio::time::sleep(delay).await;
        }

        match self.compute(route, request) {
            Ok(body) => MockResponse {
                status: route.status,
                headers: route.headers.clone(),
                body: Some(body),
            },
            Err(e) => {
                self.stats.record_handler_failure();
                error!(path = %request.path, error = %e, "Route handler failed");
                MockResponse::from_error(&e)
            }
        }
    }

    /// Produce the body for a matched route; panics in generated and computed
    /// sources are contained and reported as handler errors
    fn compute(&self, route: &RouteDescriptor, request: &MockRequest) -> MockResult<Value> {
        catch_unwind(AssertUnwindSafe(|| match &route.source {
            ResponseSource::Literal(value) => Ok(value.clone()),
            ResponseSource::Generated(document) => self.compiler.compile(document),
            ResponseSource::Computed(f) => {
                let ctx = HandlerContext {
                    compiler: &self.compiler,
                    store: &self.store,
                };
                f(request, &ctx)
            }
        }))
        .unwrap_or_else(|panic| Err(MockError::Handler(panic_message(panic.as_ref()))))
    }
}

impl std::fmt::Debug for MockEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEngine")
            .field("routes", &self.routes.read().len())
            .field("scenario", &self.config.server.scenario)
            .field("strict_mode", &self.config.server.strict_mode)
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
