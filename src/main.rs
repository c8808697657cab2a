//! MCP server binary entry point.

use anyhow::Result;
use firebird_expert_mcp::{
    config::ServerConfig,
    database,
    i18n::Catalog,
    protocol::{McpServerBuilder, StopReason},
    server::{McpHandler, ServerStateBuilder},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    let config = ServerConfig::from_env()?;
    info!("Starting {} v{}", config.name, config.version);
    info!(dsn = %config.firebird.dsn(), user = %config.firebird.user, "Firebird target");

    let strings = Arc::new(Catalog::load(
        config.language.clone(),
        config.i18n_dir.as_deref(),
    ));
    info!(language = strings.language(), "String resources loaded");

    let client = database::create_client(&config.firebird);
    let preconditions = client.preconditions();
    if !preconditions.satisfied() {
        warn!(
            driver = preconditions.driver_available,
            library = ?preconditions.client_library,
            "Firebird client not ready; database tools will report diagnostics"
        );
    }

    let name = config.name.to_string();
    let version = config.version.to_string();
    let state = Arc::new(
        ServerStateBuilder::new()
            .config(config)
            .client(client)
            .strings(strings)
            .build()
            .map_err(|e| anyhow::anyhow!(e))?,
    );

    info!(tools = state.tools.len(), "Server state initialized");

    let server = McpServerBuilder::new()
        .handler(McpHandler::new(state))
        .name(name)
        .version(version)
        .build()?;

    match server.run().await? {
        StopReason::EndOfInput => info!("Input closed"),
        StopReason::Interrupted => info!("Interrupted"),
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("firebird_expert_mcp=info,warn"));

    // stdout carries the protocol; logs go to stderr
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .json()
        .init();
}
