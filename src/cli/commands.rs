//! CLI Command Implementations

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};

use crate::config::MockServerConfig;
use crate::routes::RouteDef;
use crate::schema::SchemaCompiler;
use crate::server::{build_route_table, ApiDefinition, MockServer};
use crate::telemetry::init_telemetry;
use crate::VERSION;

use super::{
    Cli, Commands, ConfigAction, ConfigCommand, GenerateCommand, RoutesCommand, ServeCommand,
};

/// Execute the CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let mut config = if let Some(path) = &cli.config {
        MockServerConfig::from_file(path)?
    } else {
        MockServerConfig::from_env()?
    };

    config.telemetry.log_level = cli.log_level.clone();
    config.telemetry.json_logs = cli.json_logs;

    match cli.command {
        Commands::Serve(cmd) => execute_serve(cmd, config, cli.quiet).await,
        Commands::Generate(cmd) => execute_generate(cmd, config),
        Commands::Routes(cmd) => execute_routes(cmd, config),
        Commands::Config(cmd) => execute_config(cmd, config),
        Commands::Version => execute_version(),
    }
}

async fn execute_serve(cmd: ServeCommand, mut config: MockServerConfig, quiet: bool) -> Result<()> {
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    if let Some(host) = cmd.host {
        config.server.host = host;
    }
    if let Some(base_path) = cmd.base_path {
        config.server.base_path = base_path;
    }
    if cmd.resource_name.is_some() {
        config.server.resource_name = cmd.resource_name;
    }
    if cmd.scenario.is_some() {
        config.server.scenario = cmd.scenario;
    }
    if cmd.seed.is_some() {
        config.generation.seed = cmd.seed;
    }
    config.server.strict_mode |= cmd.strict;
    config.server.hide_branding |= cmd.hide_branding;
    config.server.cors_enabled &= !cmd.no_cors;

    let definition = load_definition(cmd.schema.as_deref(), cmd.routes.as_deref())?;

    init_telemetry(&config.telemetry)?;
    let mut server = MockServer::new(config, definition).context("Failed to build mock server")?;

    if !quiet {
        print_banner(&server);
    }

    server.run_until_shutdown().await?;
    Ok(())
}

fn execute_generate(cmd: GenerateCommand, mut config: MockServerConfig) -> Result<()> {
    if cmd.seed.is_some() {
        config.generation.seed = cmd.seed;
    }

    let schema = load_document(&cmd.schema)?;
    let compiler = SchemaCompiler::new(&config.generation);
    let document = compiler.prepare(&schema)?;

    let output = if cmd.count == 1 {
        compiler.compile(&document)?
    } else {
        Value::Array(compiler.compile_many(&document, cmd.count)?)
    };

    if cmd.compact {
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}

fn execute_routes(cmd: RoutesCommand, config: MockServerConfig) -> Result<()> {
    let definition = load_definition(cmd.schema.as_deref(), cmd.routes.as_deref())?;
    let compiler = SchemaCompiler::new(&config.generation);
    let table = build_route_table(&config, &compiler, &definition)?;

    match cmd.format.as_str() {
        "json" => {
            let rows: Vec<Value> = table
                .iter()
                .map(|r| {
                    json!({
                        "method": r.method,
                        "path": r.path,
                        "status": r.status,
                        "source": r.source.kind(),
                        "validated": r.validation.is_some(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        _ => {
            println!("{:<8} {:<40} {:<7} {}", "METHOD", "PATH", "STATUS", "SOURCE");
            for route in table.iter() {
                println!(
                    "{:<8} {:<40} {:<7} {}",
                    route.method,
                    route.path,
                    route.status,
                    route.source.kind()
                );
            }
        }
    }
    Ok(())
}

fn execute_config(cmd: ConfigCommand, config: MockServerConfig) -> Result<()> {
    match cmd.action {
        ConfigAction::Show { format } => {
            let output = match format.as_str() {
                "toml" => toml::to_string_pretty(&config)?,
                "json" => serde_json::to_string_pretty(&config)?,
                _ => serde_yaml::to_string(&config)?,
            };
            println!("{}", output);
            Ok(())
        }

        ConfigAction::Validate { file } => {
            let config = MockServerConfig::from_file(&file)?;
            println!("Configuration at {:?} is valid", file);
            println!("  Server:    {}:{}", config.server.host, config.server.port);
            println!("  Strict:    {}", config.server.strict_mode);
            println!(
                "  Scenario:  {}",
                config.server.scenario.map_or("none".to_string(), |s| s.to_string())
            );
            Ok(())
        }
    }
}

fn execute_version() -> Result<()> {
    println!("schema-mock {}", VERSION);
    println!();
    println!("Build Information:");
    println!("  Version:       {}", VERSION);
    println!("  Rust Version:  {}", env!("CARGO_PKG_RUST_VERSION"));
    Ok(())
}

/// Read a schema from JSON or YAML, chosen by extension
pub fn load_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let value = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?,
        _ => serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?,
    };
    Ok(value)
}

fn load_definition(schema: Option<&Path>, routes: Option<&Path>) -> Result<ApiDefinition> {
    if schema.is_none() && routes.is_none() {
        bail!("Nothing to serve: pass --schema and/or --routes");
    }

    let mut definition = ApiDefinition::default();
    if let Some(path) = schema {
        definition.schema = Some(load_document(path)?);
    }
    if let Some(path) = routes {
        definition.routes = RouteDef::load_file(path)?;
    }
    Ok(definition)
}

fn print_banner(server: &MockServer) {
    let config = server.config();
    let host = &config.server.host;
    let port = config.server.port;

    println!("schema-mock v{}", VERSION);
    println!();
    println!("Configuration:");
    println!("  • Server:    {}:{}", host, port);
    println!("  • Strict:    {}", if config.server.strict_mode { "enabled" } else { "disabled" });
    println!(
        "  • Scenario:  {}",
        config.server.scenario.map_or("none".to_string(), |s| s.to_string())
    );
    println!(
        "  • Seed:      {}",
        config.generation.seed.map_or("random".to_string(), |s| s.to_string())
    );
    println!();
    println!("Routes:");
    for route in server.route_table().iter() {
        println!("  • {:<7} http://{}:{}{}", route.method.as_str(), host, port, route.path);
    }
    println!("  • {:<7} http://{}:{}/health", "GET", host, port);
    println!();
}
