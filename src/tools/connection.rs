//! Connection test tool.

use crate::error::Result;
use crate::protocol::{CallToolResult, Tool};
use crate::server::ServerContext;
use crate::tools::registry::{ToolHandler, disable_expert_mode_property};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

/// Connects, reads the engine version and reports a diagnostic either way.
///
/// A failed connection is still a successful tool call; the payload carries
/// `connected: false` and the classified cause.
pub struct TestConnectionTool {
    ctx: Arc<ServerContext>,
}

impl TestConnectionTool {
    pub fn new(ctx: Arc<ServerContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ToolHandler for TestConnectionTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "test_connection".into(),
            description: Some(self.ctx.t("tools.test_connection.description")),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "disable_expert_mode": disable_expert_mode_property(self.ctx.t("tools.disable_expert_mode"))
                },
                "required": []
            }),
        }
    }

    #[instrument(skip(self, _arguments), fields(tool = "test_connection"))]
    async fn execute(&self, _arguments: Value) -> Result<CallToolResult> {
        let result = self.ctx.probe_connection();
        info!(connected = result.connected, category = ?result.error_category, "Connection test finished");

        Ok(CallToolResult::text(self.ctx.render(
            "🔌",
            &self.ctx.t("connection.test_results"),
            &result,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FirebirdConfig, GuidanceConfig};
    use crate::database::UnavailableClient;
    use crate::database::testing::ScriptedClient;
    use crate::i18n::Catalog;

    fn tool(client: impl crate::database::DatabaseClient + 'static) -> TestConnectionTool {
        TestConnectionTool::new(Arc::new(ServerContext::new(
            Arc::new(client),
            FirebirdConfig::default(),
            Arc::new(Catalog::embedded("en_US")),
            GuidanceConfig::default(),
        )))
    }

    #[tokio::test]
    async fn test_failed_connection_is_not_tool_error() {
        let result = tool(UnavailableClient).execute(Value::Null).await.unwrap();
        assert!(!result.is_error);
        let text = result.first_text().unwrap();
        assert!(text.starts_with("🔌 Connection Test Results:"));
        assert!(text.contains("\"connected\": false"));
        assert!(text.contains("fdb_library_error"));
    }

    #[tokio::test]
    async fn test_successful_connection() {
        let client = ScriptedClient::new().respond(
            "ENGINE_VERSION",
            vec![[("VERSION", "4.0.4")].into_iter().collect()],
        );
        let result = tool(client).execute(Value::Null).await.unwrap();
        let text = result.first_text().unwrap();
        assert!(text.contains("\"connected\": true"));
        assert!(text.contains("4.0.4"));
        assert!(!text.contains("masterkey"));
    }

    #[test]
    fn test_definition() {
        let definition = tool(UnavailableClient).definition();
        assert_eq!(definition.name, "test_connection");
        assert_eq!(
            definition.input_schema["properties"]["disable_expert_mode"]["type"],
            "boolean"
        );
    }
}
