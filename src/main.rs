//! schema-mock CLI
//!
//! Serve a mock HTTP API from a JSON schema.

use clap::Parser;

use schema_mock::cli::{execute, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    execute(cli).await
}
