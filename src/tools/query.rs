//! SQL execution tool with statement analysis.

use crate::analysis::sql::{self, Classification};
use crate::database::QueryResult;
use crate::error::{Result, ToolError};
use crate::protocol::{CallToolResult, Tool};
use crate::server::ServerContext;
use crate::tools::registry::{ToolHandler, disable_expert_mode_property};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const EXPERT_OPERATIONS: [&str; 6] = ["select", "insert", "update", "delete", "ddl", "admin"];

#[derive(Debug, Deserialize)]
pub struct ExecuteQueryArgs {
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub params: Option<Vec<Value>>,
}

pub struct ExecuteQueryTool {
    ctx: Arc<ServerContext>,
}

impl ExecuteQueryTool {
    pub fn new(ctx: Arc<ServerContext>) -> Self {
        Self { ctx }
    }

    fn run(&self, sql: &str, params: &[Value]) -> std::result::Result<QueryResult, Failure> {
        if let Some(diagnostic) = self.ctx.preflight() {
            return Err(Failure::Connection(serde_json::to_value(diagnostic)?));
        }

        let mut conn = match self.ctx.client.connect(&self.ctx.target) {
            Ok(conn) => conn,
            Err(e) => {
                return Err(Failure::Connection(serde_json::to_value(self.ctx.diagnose(&e))?));
            }
        };

        conn.execute(sql, params)
            .map_err(|e| Failure::Query(e.to_string()))
    }
}

enum Failure {
    Connection(Value),
    Query(String),
}

impl From<serde_json::Error> for Failure {
    fn from(e: serde_json::Error) -> Self {
        Self::Query(e.to_string())
    }
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    success: bool,
    #[serde(flatten)]
    result: Option<QueryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostic: Option<Value>,
    sql: &'a str,
    #[serde(skip_serializing_if = "<[Value]>::is_empty")]
    params: &'a [Value],
    analysis: Classification,
    #[serde(rename = "optimizationSuggestions")]
    optimization_suggestions: Vec<String>,
}

#[async_trait]
impl ToolHandler for ExecuteQueryTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "execute_query".into(),
            description: Some(self.ctx.t("tools.execute_query.description")),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "sql": {
                        "type": "string",
                        "description": self.ctx.t("tools.execute_query.sql_description")
                    },
                    "params": {
                        "type": "array",
                        "description": self.ctx.t("tools.execute_query.params_description")
                    },
                    "disable_expert_mode": disable_expert_mode_property(self.ctx.t("tools.disable_expert_mode")),
                    "expert_operation": {
                        "type": "string",
                        "description": self.ctx.t("tools.expert_operation"),
                        "enum": EXPERT_OPERATIONS
                    }
                },
                "required": ["sql"]
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "execute_query"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: ExecuteQueryArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let sql = args
            .sql
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ToolError::MissingArgument("sql".into()))?;
        let params = args.params.unwrap_or_default();

        let analysis = sql::classify(&sql);
        debug!(
            statement = ?analysis.statement_type,
            complexity = ?analysis.complexity,
            "Executing statement"
        );

        let mut output = QueryOutput {
            success: false,
            result: None,
            error: None,
            diagnostic: None,
            sql: &sql,
            params: &params,
            analysis,
            optimization_suggestions: sql::optimization_suggestions(&sql),
        };

        match self.run(&sql, &params) {
            Ok(result) => {
                output.success = true;
                output.result = Some(result);
                Ok(CallToolResult::text(self.ctx.render(
                    "📊",
                    &self.ctx.t("tools.query_results"),
                    &output,
                )))
            }
            Err(Failure::Connection(diagnostic)) => {
                output.diagnostic = Some(diagnostic);
                Ok(self.ctx.failure_payload("execute_query", &output))
            }
            Err(Failure::Query(error)) => {
                warn!(error = %error, "Statement failed");
                output.error = Some(error);
                Ok(self.ctx.failure_payload("execute_query", &output))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FirebirdConfig, GuidanceConfig};
    use crate::database::testing::ScriptedClient;
    use crate::database::{DatabaseClient, UnavailableClient};
    use crate::error::McpError;
    use crate::i18n::Catalog;

    fn tool(client: impl DatabaseClient + 'static) -> ExecuteQueryTool {
        ExecuteQueryTool::new(Arc::new(ServerContext::new(
            Arc::new(client),
            FirebirdConfig::default(),
            Arc::new(Catalog::embedded("en_US")),
            GuidanceConfig::default(),
        )))
    }

    fn payload(result: &CallToolResult) -> Value {
        let text = result.first_text().unwrap();
        let start = text.find("```json\n").unwrap() + 8;
        let end = text.rfind("\n```").unwrap();
        serde_json::from_str(&text[start..end]).unwrap()
    }

    #[tokio::test]
    async fn test_missing_sql_names_field() {
        let err = tool(UnavailableClient)
            .execute(serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Tool(ToolError::MissingArgument(_))));
        assert!(err.to_string().contains("sql"));
    }

    #[tokio::test]
    async fn test_select_rows_with_analysis() {
        let client = ScriptedClient::new().respond(
            "FROM users",
            vec![[("NAME", "ana")].into_iter().collect()],
        );
        let result = tool(client)
            .execute(serde_json::json!({"sql": "SELECT name FROM users WHERE active = 1"}))
            .await
            .unwrap();

        assert!(!result.is_error);
        assert!(result.first_text().unwrap().starts_with("📊 Query Results:"));
        let json = payload(&result);
        assert_eq!(json["success"], true);
        assert_eq!(json["row_count"], 1);
        assert_eq!(json["rows"][0]["NAME"], "ana");
        assert_eq!(json["analysis"]["type"], "select");
        assert_eq!(json["analysis"]["complexity"], "simple");
        assert_eq!(
            json["optimizationSuggestions"][0],
            "Use FIRST/SKIP for pagination instead of LIMIT/OFFSET"
        );
    }

    #[tokio::test]
    async fn test_dangerous_delete_still_runs_with_warning() {
        let client = ScriptedClient::new();
        let result = tool(client.clone())
            .execute(serde_json::json!({"sql": "DELETE FROM temp_data"}))
            .await
            .unwrap();

        let json = payload(&result);
        assert_eq!(json["affected_rows"], 1);
        assert_eq!(json["analysis"]["complexity"], "dangerous");
        assert!(
            json["analysis"]["suggestions"][0]
                .as_str()
                .unwrap()
                .starts_with(sql::CRITICAL_MARKER)
        );
        assert_eq!(client.executed(), vec!["DELETE FROM temp_data"]);
    }

    #[tokio::test]
    async fn test_query_failure_is_tool_error() {
        let client = ScriptedClient::new().fail("missing_table", "Table unknown MISSING_TABLE");
        let result = tool(client)
            .execute(serde_json::json!({"sql": "SELECT * FROM missing_table", "params": [1]}))
            .await
            .unwrap();

        assert!(result.is_error);
        assert!(
            result
                .first_text()
                .unwrap()
                .starts_with("❌ Error executing execute_query:")
        );
        let json = payload(&result);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Table unknown MISSING_TABLE");
        assert_eq!(json["params"], serde_json::json!([1]));
    }

    #[tokio::test]
    async fn test_connection_failure_carries_diagnostic() {
        let client = ScriptedClient::new().refuse("Connection refused");
        let result = tool(client)
            .execute(serde_json::json!({"sql": "SELECT 1 FROM RDB$DATABASE"}))
            .await
            .unwrap();

        assert!(result.is_error);
        let json = payload(&result);
        assert_eq!(json["diagnostic"]["type"], "network_error");
        assert_eq!(json["diagnostic"]["connected"], false);
    }

    #[tokio::test]
    async fn test_invalid_params_type() {
        let err = tool(UnavailableClient)
            .execute(serde_json::json!({"sql": "SELECT 1 FROM RDB$DATABASE", "params": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Tool(ToolError::InvalidArguments(_))));
    }
}
