//! Request handler and method dispatcher.

use crate::error::{ProtocolError, ProtocolResult};
use crate::protocol::types::*;
use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Handler trait for processing MCP requests.
///
/// Business failures (unknown tool, bad SQL, missing argument) belong in the
/// returned result payload; `Err` is reserved for protocol faults.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handle initialize request.
    async fn initialize(&self, params: InitializeParams) -> ProtocolResult<InitializeResult>;

    /// Handle initialized notification.
    async fn initialized(&self) -> ProtocolResult<()> {
        Ok(())
    }

    /// List available tools.
    async fn list_tools(&self) -> ProtocolResult<ListToolsResult>;

    /// Call a tool.
    async fn call_tool(&self, params: CallToolParams) -> ProtocolResult<CallToolResult>;

    /// List available resources.
    async fn list_resources(&self) -> ProtocolResult<ListResourcesResult> {
        Ok(ListResourcesResult::default())
    }

    /// List available prompts.
    async fn list_prompts(&self) -> ProtocolResult<ListPromptsResult>;

    /// Render a prompt.
    async fn get_prompt(&self, params: GetPromptParams) -> ProtocolResult<GetPromptResult>;

    /// Handle ping request.
    async fn ping(&self) -> ProtocolResult<Value> {
        Ok(serde_json::json!({}))
    }
}

/// Method dispatcher that routes requests to appropriate handlers.
pub struct Dispatcher<H: Handler> {
    handler: Arc<H>,
}

impl<H: Handler> Dispatcher<H> {
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    /// Dispatch a request to the appropriate handler method.
    ///
    /// A panic inside a handler becomes an internal error response.
    #[instrument(skip(self, request), fields(method = %request.method))]
    pub async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!("Dispatching request");

        let routed = AssertUnwindSafe(self.route(&request.method, request.params))
            .catch_unwind()
            .await;

        let result = match routed {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(panic = %message, "Handler panicked");
                Err(ProtocolError::InternalError(message.into()))
            }
        };

        match result {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(e) => {
                error!("Request failed: {}", e);
                JsonRpcResponse::error(request.id, JsonRpcError::new(e.code(), e.to_string()))
            }
        }
    }

    async fn route(&self, method: &str, params: Option<Value>) -> ProtocolResult<Value> {
        match method {
            "initialize" => {
                let params = match params {
                    Some(params) => decode(params)?,
                    None => InitializeParams::default(),
                };
                encode(self.handler.initialize(params).await?)
            }
            "notifications/initialized" | "initialized" => {
                self.handler.initialized().await?;
                Ok(Value::Null)
            }
            "ping" => self.handler.ping().await,
            "tools/list" => encode(self.handler.list_tools().await?),
            "tools/call" => match params.map(serde_json::from_value::<CallToolParams>) {
                Some(Ok(params)) => encode(self.handler.call_tool(params).await?),
                Some(Err(e)) => encode(CallToolResult::error(format!("Invalid tool call: {}", e))),
                None => encode(CallToolResult::error("Invalid tool call: missing params")),
            },
            "resources/list" => encode(self.handler.list_resources().await?),
            "prompts/list" => encode(self.handler.list_prompts().await?),
            "prompts/get" => match params.map(serde_json::from_value::<GetPromptParams>) {
                Some(Ok(params)) => encode(self.handler.get_prompt(params).await?),
                Some(Err(e)) => encode(GetPromptResult::error(format!("Invalid prompt request: {}", e))),
                None => encode(GetPromptResult::error("Invalid prompt request: missing params")),
            },
            method => {
                warn!("Unknown method: {}", method);
                Err(ProtocolError::MethodNotFound(method.to_string()))
            }
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(params: Value) -> ProtocolResult<T> {
    serde_json::from_value(params).map_err(|e| ProtocolError::InvalidParams(e.to_string().into()))
}

fn encode<T: Serialize>(result: T) -> ProtocolResult<Value> {
    serde_json::to_value(result).map_err(|e| ProtocolError::InternalError(e.to_string().into()))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
