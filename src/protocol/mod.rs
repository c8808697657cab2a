//! MCP protocol implementation over JSON-RPC 2.0.

pub mod handler;
pub mod server;
pub mod transport;
pub mod types;

pub use handler::{Dispatcher, Handler};
pub use server::{McpServer, McpServerBuilder, StopReason};
pub use transport::{Incoming, LineTransport, StdioTransport, decode_line};
pub use types::*;
