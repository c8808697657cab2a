//! MCP server implementation.

pub mod context;
pub mod handler;
pub mod state;

pub use context::ServerContext;
pub use handler::McpHandler;
pub use state::{ServerState, ServerStateBuilder};
