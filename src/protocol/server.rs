//! MCP server loop with lifecycle management.

use crate::error::{McpError, Result};
use crate::protocol::handler::{Dispatcher, Handler};
use crate::protocol::transport::{Incoming, LineTransport, StdioTransport};
use crate::protocol::types::*;
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, error, info, instrument, warn};

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfInput,
    Interrupted,
}

/// MCP Server.
///
/// Requests are handled one at a time: a response is written before the
/// next line is read.
pub struct McpServer<H: Handler> {
    info: ServerInfo,
    handler: Arc<H>,
}

impl<H: Handler> McpServer<H> {
    pub fn new(handler: H, info: ServerInfo) -> Self {
        Self {
            info,
            handler: Arc::new(handler),
        }
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Run on stdin/stdout until end of input or Ctrl-C.
    #[instrument(skip(self), fields(server = %self.info.name))]
    pub async fn run(self) -> Result<StopReason> {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for interrupt: {}", e);
                std::future::pending::<()>().await;
            }
        };
        self.serve(StdioTransport::stdio(), shutdown).await
    }

    /// Run over `transport` until end of input or until `shutdown` resolves.
    pub async fn serve<R, W, S>(
        self,
        mut transport: LineTransport<R, W>,
        shutdown: S,
    ) -> Result<StopReason>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        info!(
            "Starting MCP server: {} v{}",
            self.info.name, self.info.version
        );

        let dispatcher = Dispatcher::new(Arc::clone(&self.handler));
        tokio::pin!(shutdown);

        let reason = loop {
            let incoming = tokio::select! {
                incoming = transport.read_message() => incoming,
                _ = &mut shutdown => break StopReason::Interrupted,
            };

            let incoming = match incoming {
                Ok(Some(incoming)) => incoming,
                Ok(None) => break StopReason::EndOfInput,
                Err(McpError::Io(e)) => {
                    error!("Input error: {}", e);
                    break StopReason::EndOfInput;
                }
                Err(e) => {
                    error!("Transport error: {}", e);
                    continue;
                }
            };

            let response = match incoming {
                Incoming::Request(request) => {
                    let is_notification = request.is_notification();
                    let response = dispatcher.dispatch(request).await;
                    if is_notification {
                        debug!("Notification handled, no reply");
                        continue;
                    }
                    response
                }
                Incoming::Invalid { id, reason } => {
                    warn!(reason = %reason, "Invalid request");
                    JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_request(format!("Invalid request: {}", reason)),
                    )
                }
                Incoming::Malformed { reason } => {
                    error!(reason = %reason, "Failed to parse message");
                    continue;
                }
            };

            if let Err(e) = transport.write_response(&response).await {
                error!("Failed to send response: {}", e);
                break StopReason::EndOfInput;
            }
        };

        info!(reason = ?reason, "Server shutdown");
        Ok(reason)
    }
}

/// Builder for MCP Server.
pub struct McpServerBuilder<H: Handler> {
    handler: Option<H>,
    name: String,
    version: String,
}

impl<H: Handler> McpServerBuilder<H> {
    pub fn new() -> Self {
        Self {
            handler: None,
            name: env!("CARGO_PKG_NAME").into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }

    pub fn handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn build(self) -> Result<McpServer<H>> {
        let handler = self.handler.ok_or_else(|| McpError::Internal {
            message: "Handler is required".into(),
        })?;

        Ok(McpServer::new(
            handler,
            ServerInfo {
                name: self.name,
                version: self.version,
            },
        ))
    }
}

impl<H: Handler> Default for McpServerBuilder<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolResult;
    use async_trait::async_trait;

    struct TestHandler;

    #[async_trait]
    impl Handler for TestHandler {
        async fn initialize(&self, _params: InitializeParams) -> ProtocolResult<InitializeResult> {
            Ok(InitializeResult {
                protocol_version: MCP_VERSION.into(),
                capabilities: ServerCapabilities::default(),
                server_info: ServerInfo {
                    name: "test".into(),
                    version: "1.0".into(),
                },
                instructions: None,
            })
        }

        async fn list_tools(&self) -> ProtocolResult<ListToolsResult> {
            Ok(ListToolsResult { tools: vec![] })
        }

        async fn call_tool(&self, _params: CallToolParams) -> ProtocolResult<CallToolResult> {
            Ok(CallToolResult::text("test"))
        }

        async fn list_prompts(&self) -> ProtocolResult<ListPromptsResult> {
            Ok(ListPromptsResult { prompts: vec![] })
        }

        async fn get_prompt(&self, _params: GetPromptParams) -> ProtocolResult<GetPromptResult> {
            Ok(GetPromptResult::error("Unknown prompt"))
        }
    }

    fn server() -> McpServer<TestHandler> {
        McpServerBuilder::new()
            .handler(TestHandler)
            .name("test-server")
            .version("0.1.0")
            .build()
            .unwrap()
    }

    async fn run(input: &str) -> (StopReason, Vec<serde_json::Value>) {
        let mut output = Vec::new();
        let transport = LineTransport::new(input.as_bytes(), &mut output);
        let reason = server()
            .serve(transport, std::future::pending())
            .await
            .unwrap();
        let lines = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (reason, lines)
    }

    #[test]
    fn test_server_builder() {
        let server = server();
        assert_eq!(server.info().name, "test-server");
        assert_eq!(server.info().version, "0.1.0");
    }

    #[tokio::test]
    async fn test_one_reply_per_request() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            "not json\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"nope"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":3}"#,
            "\n",
        );
        let (reason, lines) = run(input).await;

        assert_eq!(reason, StopReason::EndOfInput);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["error"]["code"], -32601);
        assert_eq!(lines[2]["id"], 3);
        assert_eq!(lines[2]["error"]["code"], -32600);
    }

    #[derive(Clone, Default)]
    struct Logs(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for Logs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_non_utf8_line_does_not_stop_loop() {
        let logs = Logs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut input = b"\xff\xfe garbage\n".to_vec();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
        input.push(b'\n');

        let mut output = Vec::new();
        let transport = LineTransport::new(input.as_slice(), &mut output);
        let reason = server()
            .serve(transport, std::future::pending())
            .await
            .unwrap();

        assert_eq!(reason, StopReason::EndOfInput);
        let replies: Vec<serde_json::Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["id"], 1);

        let logs = String::from_utf8_lossy(&logs.0.lock()).into_owned();
        let errors: Vec<&str> = logs.lines().filter(|l| l.contains("ERROR")).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Failed to parse message"));
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_loop() {
        let (reader, writer) = tokio::io::duplex(64);
        let transport = LineTransport::new(tokio::io::BufReader::new(reader), Vec::new());
        let reason = server().serve(transport, async {}).await.unwrap();
        assert_eq!(reason, StopReason::Interrupted);
        drop(writer);
    }
}
