//! MCP tool definitions and registry.

pub mod connection;
pub mod query;
pub mod registry;
pub mod schema;
pub mod status;

pub use connection::TestConnectionTool;
pub use query::ExecuteQueryTool;
pub use registry::{ToolHandler, ToolRegistry};
pub use schema::ListTablesTool;
pub use status::ServerStatusTool;

use crate::protocol::ServerInfo;
use crate::server::ServerContext;
use std::sync::Arc;

/// Create and register all tools in listing order.
pub fn create_registry(ctx: Arc<ServerContext>, info: ServerInfo) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(TestConnectionTool::new(Arc::clone(&ctx)));
    registry.register(ExecuteQueryTool::new(Arc::clone(&ctx)));
    registry.register(ListTablesTool::new(Arc::clone(&ctx)));
    registry.register(ServerStatusTool::new(ctx, info));

    registry
}
