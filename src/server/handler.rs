//! MCP request handler implementation.

use crate::error::{McpError, ProtocolResult};
use crate::guidance::GuidanceOverrides;
use crate::protocol::{
    CallToolParams, CallToolResult, GetPromptParams, GetPromptResult, Handler, InitializeParams,
    InitializeResult, ListChangedCapability, ListPromptsResult, ListToolsResult, MCP_VERSION,
    ResourcesCapability, ServerCapabilities,
};
use crate::server::state::ServerState;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// MCP request handler that processes protocol messages.
pub struct McpHandler {
    state: Arc<ServerState>,
}

impl McpHandler {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }
}

#[async_trait]
impl Handler for McpHandler {
    async fn initialize(&self, params: InitializeParams) -> ProtocolResult<InitializeResult> {
        match &params.client_info {
            Some(client) => info!("Initialize request from {} v{}", client.name, client.version),
            None => info!("Initialize request from unnamed client"),
        }
        debug!("Client capabilities: {:?}", params.capabilities);

        self.state.set_initialized(params.client_info);

        let capabilities = ServerCapabilities {
            tools: Some(ListChangedCapability {
                list_changed: false,
            }),
            resources: Some(ResourcesCapability {
                subscribe: false,
                list_changed: false,
            }),
            prompts: Some(ListChangedCapability {
                list_changed: false,
            }),
        };

        Ok(InitializeResult {
            protocol_version: MCP_VERSION.into(),
            capabilities,
            server_info: self.state.server_info(),
            instructions: None,
        })
    }

    async fn initialized(&self) -> ProtocolResult<()> {
        info!("Server initialized successfully");
        Ok(())
    }

    async fn list_tools(&self) -> ProtocolResult<ListToolsResult> {
        let guidance = self.state.guidance();
        let tools = self
            .state
            .tools
            .list()
            .into_iter()
            .map(|mut tool| {
                tool.description = tool.description.map(|description| {
                    self.state
                        .composer
                        .describe_tool(&tool.name, description, &guidance)
                });
                tool
            })
            .collect::<Vec<_>>();
        debug!("Listing {} tools", tools.len());

        Ok(ListToolsResult { tools })
    }

    async fn call_tool(&self, params: CallToolParams) -> ProtocolResult<CallToolResult> {
        debug!("Tool call: {}", params.name);
        let name = params.name.clone();
        let overrides = GuidanceOverrides::from_arguments(&params.arguments);

        let mut result = match self.state.tools.execute(params).await {
            Ok(result) => result,
            Err(McpError::Tool(e)) => {
                warn!(tool = %name, "Tool call rejected: {}", e);
                return Ok(self.state.context.failure(&name, e));
            }
            Err(e) => {
                error!("Tool execution error: {}", e);
                return Ok(self.state.context.failure(&name, e));
            }
        };

        if !result.is_error
            && let Some(block) = result.content.first_mut()
        {
            let guidance = self.state.guidance();
            let env = self.state.environment();
            let text = std::mem::take(&mut block.text);
            block.text = self
                .state
                .composer
                .apply(text, &name, &guidance, &env, &overrides);
        }

        Ok(result)
    }

    async fn list_prompts(&self) -> ProtocolResult<ListPromptsResult> {
        let prompts = self.state.prompts.list();
        debug!("Listing {} prompts", prompts.len());
        Ok(ListPromptsResult { prompts })
    }

    async fn get_prompt(&self, params: GetPromptParams) -> ProtocolResult<GetPromptResult> {
        debug!("Prompt request: {}", params.name);
        Ok(self.state.prompts.get(&params))
    }
}
