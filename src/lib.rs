//! # schema-mock
//!
//! Schema-driven mock HTTP API server for frontend and integration teams
//! that need realistic responses before a backend exists.
//!
//! ## Features
//!
//! - **Schema compilation**: JSON-Schema-like documents (types, constraints,
//!   `$ref`, `oneOf`/`anyOf`/`allOf`) compiled into synthetic values
//! - **CRUD derivation**: list/get/create/replace/delete routes from one
//!   titled resource schema, plus an explicit route DSL
//! - **Scenarios**: `slow`, `error-heavy` and `sad-path` latency and error
//!   injection
//! - **Strict mode**: request body validation against route schemas
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use schema_mock::{ApiDefinition, MockServer, MockServerConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let schema = json!({
//!         "type": "object",
//!         "title": "User",
//!         "properties": {"name": {"type": "string"}},
//!         "required": ["name"]
//!     });
//!     let mut server = MockServer::new(MockServerConfig::default(), ApiDefinition::from_schema(schema))?;
//!     server.run_until_shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod routes;
pub mod schema;
pub mod server;
pub mod telemetry;

pub use config::{MockServerConfig, Scenario};
pub use engine::{MockEngine, MockResponse};
pub use error::{MockError, MockResult};
pub use routes::{RouteDef, RouteDescriptor, RouteTable, RouteTableBuilder};
pub use schema::{RequestValidator, SchemaCache, SchemaCompiler, SchemaDocument, SchemaNode};
pub use server::{ApiDefinition, MockServer, Phase};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default server port
pub const DEFAULT_PORT: u16 = 3000;

/// Identity advertised in the branding header and `_meta` field
pub const GENERATOR_NAME: &str = "schema-mock";
