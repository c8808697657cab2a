//! Table listing tool.

use crate::error::{DatabaseError, Result};
use crate::protocol::{CallToolResult, Tool};
use crate::server::ServerContext;
use crate::tools::registry::{ToolHandler, disable_expert_mode_property};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, instrument};

pub struct ListTablesTool {
    ctx: Arc<ServerContext>,
}

impl ListTablesTool {
    pub fn new(ctx: Arc<ServerContext>) -> Self {
        Self { ctx }
    }

    fn failure(&self, error: DatabaseError) -> CallToolResult {
        let database = &self.ctx.target.database;
        let payload = match error {
            DatabaseError::Connection(_)
            | DatabaseError::DriverUnavailable
            | DatabaseError::ClientLibraryUnavailable => json!({
                "success": false,
                "database": database,
                "diagnostic": self.ctx.diagnose(&error),
            }),
            other => json!({
                "success": false,
                "error": other.to_string(),
                "database": database,
            }),
        };
        self.ctx.failure_payload("list_tables", &payload)
    }
}

#[async_trait]
impl ToolHandler for ListTablesTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "list_tables".into(),
            description: Some(self.ctx.t("tools.list_tables.description")),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "disable_expert_mode": disable_expert_mode_property(self.ctx.t("tools.disable_expert_mode"))
                },
                "required": []
            }),
        }
    }

    #[instrument(skip(self, _arguments), fields(tool = "list_tables"))]
    async fn execute(&self, _arguments: Value) -> Result<CallToolResult> {
        if let Some(diagnostic) = self.ctx.preflight() {
            return Ok(self.ctx.failure_payload(
                "list_tables",
                &json!({
                    "success": false,
                    "database": self.ctx.target.database,
                    "diagnostic": diagnostic,
                }),
            ));
        }

        let tables = match self.ctx.catalog.list_tables() {
            Ok(tables) => tables,
            Err(e) => return Ok(self.failure(e)),
        };
        info!(count = tables.len(), "Listed tables");

        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        let payload = json!({
            "success": true,
            "tables": names,
            "tables_detailed": tables,
            "count": tables.len(),
            "database": self.ctx.target.database,
        });

        Ok(CallToolResult::text(self.ctx.render(
            "📋",
            &self.ctx.t("tools.database_tables"),
            &payload,
        )))
    }
}
