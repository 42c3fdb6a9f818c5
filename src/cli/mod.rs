//! CLI Module for schema-mock
//!
//! Subcommands:
//! - Serving a mock API from a schema and/or a routes file
//! - Printing synthesized samples for a schema
//! - Listing the derived route table
//! - Inspecting configuration

mod commands;

pub use commands::*;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Scenario;
use crate::VERSION;

/// schema-mock: schema-driven mock HTTP API server
#[derive(Parser, Debug)]
#[command(name = "schema-mock")]
#[command(version = VERSION)]
#[command(about = "Serve a realistic mock HTTP API from a JSON schema")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Global configuration file path (YAML, TOML, or JSON)
    #[arg(short, long, global = true, env = "SCHEMA_MOCK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Global log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "SCHEMA_MOCK_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Enable JSON log output
    #[arg(long, global = true, env = "SCHEMA_MOCK_JSON_LOGS")]
    pub json_logs: bool,

    /// Suppress the banner
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the mock server
    #[command(alias = "s")]
    Serve(ServeCommand),

    /// Print synthesized samples for a schema
    #[command(alias = "gen")]
    Generate(GenerateCommand),

    /// Print the route table a schema and routes file produce
    Routes(RoutesCommand),

    /// Configuration management
    #[command(alias = "cfg")]
    Config(ConfigCommand),

    /// Show version information
    Version,
}

/// Start the mock server
#[derive(Parser, Debug)]
pub struct ServeCommand {
    /// Resource schema (JSON or YAML) to derive CRUD routes from
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    /// Explicit route definitions (JSON or YAML list)
    #[arg(short, long)]
    pub routes: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "SCHEMA_MOCK_PORT")]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "SCHEMA_MOCK_HOST")]
    pub host: Option<String>,

    /// Validate request bodies against route schemas
    #[arg(long)]
    pub strict: bool,

    /// Scenario preset (happy-path, slow, error-heavy, sad-path)
    #[arg(long)]
    pub scenario: Option<Scenario>,

    /// Prefix for derived CRUD routes
    #[arg(long)]
    pub base_path: Option<String>,

    /// Resource noun overriding the schema title
    #[arg(long)]
    pub resource_name: Option<String>,

    /// Disable permissive CORS
    #[arg(long)]
    pub no_cors: bool,

    /// Omit the generator header and `_meta` field
    #[arg(long)]
    pub hide_branding: bool,

    /// Seed for deterministic data
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Print synthesized samples for a schema
#[derive(Parser, Debug)]
pub struct GenerateCommand {
    /// Schema file (JSON or YAML)
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Number of samples
    #[arg(short = 'n', long, default_value = "1")]
    pub count: usize,

    /// Seed for deterministic output
    #[arg(long)]
    pub seed: Option<u64>,

    /// Compact single-line JSON
    #[arg(long)]
    pub compact: bool,
}

/// Print the derived route table
#[derive(Parser, Debug)]
pub struct RoutesCommand {
    /// Resource schema (JSON or YAML)
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    /// Explicit route definitions
    #[arg(short, long)]
    pub routes: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table")]
    pub format: String,
}

/// Configuration management
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Output format (yaml, toml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file to validate
        file: PathBuf,
    },
}
