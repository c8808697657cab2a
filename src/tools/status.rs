//! Server status report.

use crate::error::Result;
use crate::protocol::{CallToolResult, ServerInfo, Tool};
use crate::server::ServerContext;
use crate::tools::registry::ToolHandler;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::instrument;

const REPORTED_ENV: [&str; 2] = ["LD_LIBRARY_PATH", "FIREBIRD_HOME"];
const PROMPT_TABLE_PREVIEW: usize = 10;

/// Reports configuration, driver and library state, and a live connection
/// check. Never receives guidance.
pub struct ServerStatusTool {
    ctx: Arc<ServerContext>,
    info: ServerInfo,
}

impl ServerStatusTool {
    pub fn new(ctx: Arc<ServerContext>, info: ServerInfo) -> Self {
        Self { ctx, info }
    }

    fn internationalization(&self) -> Value {
        let strings = &self.ctx.strings;
        json!({
            "current_language": strings.language(),
            "fallback_language": strings.fallback_language(),
            "available_languages": strings.available_languages(),
            "completeness": strings.completeness(),
            "missing_keys_count": strings.missing_key_count(),
            "has_fallback_loaded": strings.has_fallback(),
        })
    }

    fn guidance(&self) -> Value {
        let guidance = self.ctx.guidance.read();
        json!({
            "enabled": guidance.enabled,
            "auto_apply": guidance.auto_apply,
            "prompt_name": guidance.prompt_name,
            "operation_type": guidance.operation_type,
            "complexity_level": guidance.complexity_level,
            "target_tools": guidance.target_tools,
            "mode": "compact",
            "language": self.ctx.strings.language(),
            "database_context": {
                "host": self.ctx.target.host,
                "database": self.ctx.target.database,
            },
        })
    }

    fn recommendations(&self, driver: bool, library: bool, connected: bool) -> Vec<&'static str> {
        let mut items = Vec::new();
        if !driver {
            items.push("Rebuild the server with the `firebird` feature to enable the driver");
        }
        if !library {
            items.push("Install the Firebird client library or set FIREBIRD_CLIENT_LIBRARY");
        }
        if driver && library && !connected {
            items.push("Run test_connection for a detailed connection diagnostic");
        }
        if items.is_empty() {
            items.push("Everything looks healthy");
        }
        items
    }
}

#[async_trait]
impl ToolHandler for ServerStatusTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "server_status".into(),
            description: Some(self.ctx.t("tools.server_status.description")),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    #[instrument(skip(self, _arguments), fields(tool = "server_status"))]
    async fn execute(&self, _arguments: Value) -> Result<CallToolResult> {
        let preconditions = self.ctx.preconditions();
        let library = preconditions.client_library.as_ref();
        let library_status = if library.is_some() { "✅ Found" } else { "❌ Not found" };

        let connection_test = preconditions
            .satisfied()
            .then(|| self.ctx.probe_connection());
        let connected = connection_test.as_ref().is_some_and(|r| r.connected);

        let tables = if connected {
            self.ctx.catalog.list_tables().unwrap_or_default()
        } else {
            Vec::new()
        };
        let preview: Vec<&str> = tables
            .iter()
            .take(PROMPT_TABLE_PREVIEW)
            .map(|t| t.name.as_str())
            .collect();

        let environment: serde_json::Map<String, Value> = REPORTED_ENV
            .iter()
            .map(|name| {
                let value = std::env::var(name).unwrap_or_else(|_| "not set".into());
                (name.to_string(), Value::String(value))
            })
            .collect();

        let status = json!({
            "server_info": self.info,
            "internationalization": self.internationalization(),
            "default_prompt_system": self.guidance(),
            "firebird_driver": {
                "name": self.ctx.client.name(),
                "available": preconditions.driver_available,
            },
            "firebird_client_libraries": {
                "available": library.is_some(),
                "path": library,
                "search_path": preconditions.search_path,
                "status": library_status,
            },
            "database_config": {
                "dsn": self.ctx.target.dsn(),
                "user": self.ctx.target.user,
                "charset": self.ctx.target.charset,
            },
            "connection_test": connection_test,
            "environment": environment,
            "features": {
                "sql_analysis": true,
                "connection_diagnostics": true,
                "dynamic_schema_prompts": connected,
                "expert_guidance": self.ctx.guidance.read().enabled,
            },
            "recommendations": self.recommendations(
                preconditions.driver_available,
                library.is_some(),
                connected,
            ),
            "dynamic_prompts": {
                "available_table_schemas": tables.len(),
                "tables": preview,
            },
        });

        Ok(CallToolResult::text(self.ctx.render(
            "🔍",
            &self.ctx.t("tools.server_status_title"),
            &status,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FirebirdConfig, GuidanceConfig};
    use crate::database::testing::ScriptedClient;
    use crate::database::{DatabaseClient, Row, UnavailableClient};
    use crate::i18n::Catalog;

    fn tool(client: impl DatabaseClient + 'static) -> ServerStatusTool {
        ServerStatusTool::new(
            Arc::new(ServerContext::new(
                Arc::new(client),
                FirebirdConfig::default(),
                Arc::new(Catalog::embedded("en_US")),
                GuidanceConfig::default(),
            )),
            ServerInfo {
                name: "firebird-expert-mcp".into(),
                version: "0.1.0".into(),
            },
        )
    }

    fn payload(result: &CallToolResult) -> Value {
        let text = result.first_text().unwrap();
        let start = text.find("```json\n").unwrap() + 8;
        let end = text.rfind("\n```").unwrap();
        serde_json::from_str(&text[start..end]).unwrap()
    }

    #[tokio::test]
    async fn test_status_without_driver_skips_connection() {
        let result = tool(UnavailableClient).execute(Value::Null).await.unwrap();
        assert!(result.first_text().unwrap().starts_with("🔍 Server Status:"));

        let json = payload(&result);
        assert_eq!(json["server_info"]["name"], "firebird-expert-mcp");
        assert_eq!(json["firebird_driver"]["available"], false);
        assert!(json["connection_test"].is_null());
        assert_eq!(json["internationalization"]["current_language"], "en_US");
        assert_eq!(json["default_prompt_system"]["mode"], "compact");
        assert_eq!(json["dynamic_prompts"]["available_table_schemas"], 0);
        assert!(
            json["recommendations"][0]
                .as_str()
                .unwrap()
                .contains("firebird")
        );
    }

    #[tokio::test]
    async fn test_status_previews_tables() {
        let rows: Vec<Row> = (0..12)
            .map(|i| [("TABLE_NAME", format!("T{:02}", i))].into_iter().collect())
            .collect();
        let client = ScriptedClient::new()
            .respond(
                "ENGINE_VERSION",
                vec![[("VERSION", "4.0.4")].into_iter().collect()],
            )
            .respond("RDB$RELATIONS", rows);

        let json = payload(&tool(client).execute(Value::Null).await.unwrap());
        assert_eq!(json["connection_test"]["connected"], true);
        assert_eq!(json["firebird_client_libraries"]["status"], "✅ Found");
        assert_eq!(json["dynamic_prompts"]["available_table_schemas"], 12);
        assert_eq!(json["dynamic_prompts"]["tables"].as_array().unwrap().len(), 10);
        assert_eq!(json["recommendations"][0], "Everything looks healthy");
    }
}
