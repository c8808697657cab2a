//! MCP server exposing a Firebird database to AI clients.
//!
//! Tools run SQL with statement analysis, list tables and report connection
//! diagnostics. Prompts provide expert personas and per-table schema
//! documents. All text is localized.
//!
//! # Example
//!
//! ```no_run
//! use firebird_expert_mcp::{
//!     config::ServerConfig,
//!     protocol::McpServerBuilder,
//!     server::{McpHandler, ServerStateBuilder},
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!
//!     // Picks the Firebird client for this build and loads the strings
//!     // for the configured language.
//!     let state = Arc::new(
//!         ServerStateBuilder::new()
//!             .config(config)
//!             .build()
//!             .map_err(|e| anyhow::anyhow!(e))?,
//!     );
//!
//!     let server = McpServerBuilder::new()
//!         .handler(McpHandler::new(state))
//!         .build()?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod database;
pub mod error;
pub mod guidance;
pub mod i18n;
pub mod prompts;
pub mod protocol;
pub mod server;
pub mod tools;

pub use config::{FirebirdConfig, GuidanceConfig, ServerConfig};
pub use database::{DatabaseClient, create_client};
pub use error::{McpError, Result};
pub use protocol::{McpServer, McpServerBuilder};
pub use server::{McpHandler, ServerState, ServerStateBuilder};
