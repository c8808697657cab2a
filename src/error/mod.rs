//! Error types for the Firebird MCP server.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` conversions.

use std::borrow::Cow;
use thiserror::Error;

/// Main error type for the server.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: Cow<'static, str> },
}

/// JSON-RPC 2.0 and MCP protocol errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Parse error: invalid JSON")]
    ParseError,

    #[error("Invalid request: {0}")]
    InvalidRequest(Cow<'static, str>),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(Cow<'static, str>),

    #[error("Internal error: {0}")]
    InternalError(Cow<'static, str>),
}

impl ProtocolError {
    /// Returns the JSON-RPC 2.0 error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest(_) => -32600,
            Self::MethodNotFound(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::InternalError(_) => -32603,
        }
    }
}

/// Failures reported by the database client.
///
/// Driver failures are flattened to their message text so that the
/// diagnostic classifier only ever sees plain strings.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Firebird driver not available")]
    DriverUnavailable,

    #[error("Firebird client libraries not available")]
    ClientLibraryUnavailable,

    #[error("{0}")]
    Connection(String),

    #[error("{0}")]
    Query(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(Cow<'static, str>),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: Cow<'static, str>,
        message: Cow<'static, str>,
    },
}

/// Tool execution errors.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Missing required argument: {0}")]
    MissingArgument(Cow<'static, str>),
}

/// Result type alias for McpError.
pub type Result<T> = std::result::Result<T, McpError>;

/// Result type alias for DatabaseError.
pub type DbResult<T> = std::result::Result<T, DatabaseError>;

/// Result type alias for ProtocolError.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;
