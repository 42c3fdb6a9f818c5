//! HTTP server runtime
//!
//! A [`MockServer`] is one session: it owns the engine, the route table and
//! at most one listener, and moves through
//! `Stopped -> Starting -> Running -> Stopping -> Stopped`.

mod dispatch;
mod handlers;
mod state;
pub mod shutdown;

pub use dispatch::*;
pub use handlers::*;
pub use state::*;
pub use shutdown::*;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::MockServerConfig;
use crate::engine::{MockEngine, StatsSnapshot};
use crate::error::{MockError, MockResult};
use crate::routes::{RouteDef, RouteTable, RouteTableBuilder};
use crate::schema::SchemaCompiler;

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// What a session serves: a resource schema, explicit routes, or both.
/// Schema-derived routes are registered first so explicit routes win on
/// colliding keys.
#[derive(Debug, Clone, Default)]
pub struct ApiDefinition {
    pub schema: Option<Value>,
    pub routes: Vec<RouteDef>,
}

impl ApiDefinition {
    pub fn from_schema(schema: Value) -> Self {
        Self {
            schema: Some(schema),
            routes: Vec::new(),
        }
    }

    pub fn routes_only(routes: Vec<RouteDef>) -> Self {
        Self {
            schema: None,
            routes,
        }
    }

    pub fn with_routes(mut self, routes: Vec<RouteDef>) -> Self {
        self.routes.extend(routes);
        self
    }
}

struct Listener {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<io::Result<()>>,
    drain: Arc<ShutdownState>,
}

/// A mock API session
pub struct MockServer {
    config: MockServerConfig,
    definition: ApiDefinition,
    engine: Arc<MockEngine>,
    phase: Phase,
    listener: Option<Listener>,
}

impl MockServer {
    /// Validate the configuration and build the route table. Fails before any
    /// socket is touched.
    pub fn new(config: MockServerConfig, definition: ApiDefinition) -> MockResult<Self> {
        let engine = build_engine(&config, &definition)?;
        Ok(Self {
            config,
            definition,
            engine,
            phase: Phase::Stopped,
            listener: None,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn config(&self) -> &MockServerConfig {
        &self.config
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().map(|l| l.addr)
    }

    pub fn engine(&self) -> Arc<MockEngine> {
        Arc::clone(&self.engine)
    }

    pub fn route_table(&self) -> Arc<RouteTable> {
        self.engine.routes()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.engine.stats()
    }

    /// Router over this session's engine, for embedding in another app
    pub fn router(&self) -> Router {
        let shutdown = Arc::new(ShutdownState::new(self.config.server.drain_timeout));
        create_router(Arc::clone(&self.engine), shutdown, &self.config)
    }

    /// Bind the configured port and serve. Returns the bound address; calling
    /// it on a running session returns the existing address.
    pub async fn start(&mut self) -> MockResult<SocketAddr> {
        if let Some(listener) = &self.listener {
            return Ok(listener.addr);
        }

        self.phase = Phase::Starting;
        match self.bind().await {
            Ok(listener) => {
                let addr = listener.addr;
                self.listener = Some(listener);
                self.phase = Phase::Running;
                info!(
                    %addr,
                    routes = self.engine.routes().len(),
                    strict = self.config.server.strict_mode,
                    scenario = ?self.config.server.scenario,
                    "Mock server listening"
                );
                Ok(addr)
            }
            Err(e) => {
                self.phase = Phase::Stopped;
                Err(e)
            }
        }
    }

    async fn bind(&self) -> MockResult<Listener> {
        let addr = self.config.server.socket_addr()?;
        let tcp = TcpListener::bind(addr).await.map_err(|e| match e.kind() {
            io::ErrorKind::AddrInUse => MockError::PortInUse { port: addr.port() },
            _ => MockError::Internal(format!("Failed to bind {}: {}", addr, e)),
        })?;
        let local = tcp.local_addr()?;

        let drain = Arc::new(ShutdownState::new(self.config.server.drain_timeout));
        let app = create_router(Arc::clone(&self.engine), Arc::clone(&drain), &self.config);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            axum::serve(tcp, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        Ok(Listener {
            addr: local,
            shutdown_tx,
            handle,
            drain,
        })
    }

    /// Close the listener and drain in-flight requests. No-op when stopped.
    pub async fn stop(&mut self) -> MockResult<()> {
        let Some(listener) = self.listener.take() else {
            return Ok(());
        };

        self.phase = Phase::Stopping;
        listener.drain.start_drain();
        let _ = listener.shutdown_tx.send(());
        let drained = listener.drain.wait_for_drain().await;

        let abort = listener.handle.abort_handle();
        match tokio::time::timeout(listener.drain.drain_timeout(), listener.handle).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => warn!(error = %e, "Listener exited with error"),
            Ok(Err(e)) => warn!(error = %e, "Listener task failed"),
            Err(_) => {
                warn!("Listener did not close in time, aborting");
                abort.abort();
            }
        }

        self.phase = Phase::Stopped;
        info!(addr = %listener.addr, drained, "Mock server stopped");
        Ok(())
    }

    /// Stop, optionally swap configuration, then start again
    pub async fn restart(&mut self, config: Option<MockServerConfig>) -> MockResult<SocketAddr> {
        if let Some(config) = config {
            let engine = build_engine(&config, &self.definition)?;
            self.stop().await?;
            self.config = config;
            self.engine = engine;
        } else {
            self.stop().await?;
        }
        self.start().await
    }

    /// Replace what the session serves without dropping the listener
    pub fn reload(&mut self, definition: ApiDefinition) -> MockResult<()> {
        let table = build_route_table(&self.config, self.engine.compiler(), &definition)?;
        self.engine.replace_routes(table);
        self.definition = definition;
        Ok(())
    }

    /// Start, serve until Ctrl+C or SIGTERM, then stop
    pub async fn run_until_shutdown(&mut self) -> MockResult<()> {
        self.start().await?;
        shutdown_signal().await;
        self.stop().await
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.drain.start_drain();
            let _ = listener.shutdown_tx.send(());
        }
    }
}

impl std::fmt::Debug for MockServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockServer")
            .field("phase", &self.phase)
            .field("addr", &self.local_addr())
            .field("engine", &self.engine)
            .finish()
    }
}

fn build_engine(config: &MockServerConfig, definition: &ApiDefinition) -> MockResult<Arc<MockEngine>> {
    config.validate()?;
    let compiler = Arc::new(SchemaCompiler::with_cache(&config.generation, &config.cache));
    let table = build_route_table(config, &compiler, definition)?;
    Ok(Arc::new(MockEngine::new(config.clone(), table, compiler)))
}

/// CRUD routes from the schema first, then explicit routes
pub fn build_route_table(
    config: &MockServerConfig,
    compiler: &SchemaCompiler,
    definition: &ApiDefinition,
) -> MockResult<RouteTable> {
    let mut builder = RouteTableBuilder::from_config(config);
    if let Some(schema) = &definition.schema {
        let document = compiler.prepare(schema)?;
        builder = builder.resource(document, config.server.resource_name.as_deref());
    }
    let table = builder.routes(definition.routes.clone())?.build();

    for route in table.iter() {
        info!(method = %route.method, path = %route.path, source = route.source.kind(), "Registered route");
    }
    Ok(table)
}

/// Create the router: operational endpoints, the mock fallback and middleware
pub fn create_router(
    engine: Arc<MockEngine>,
    shutdown: Arc<ShutdownState>,
    config: &MockServerConfig,
) -> Router {
    let state = AppState::new(engine, Arc::clone(&shutdown));

    let router = Router::new()
        .route("/health", get(handlers::health_check))
        .fallback(dispatch::dispatch)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn_with_state(shutdown, request_tracking_middleware)),
        )
        .with_state(state);

    if config.server.cors_enabled {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
