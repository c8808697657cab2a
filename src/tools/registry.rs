//! Tool registry. Registration order is the order `tools/list` reports.

use crate::error::{Result, ToolError};
use crate::protocol::{CallToolParams, CallToolResult, Tool};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> Tool;
    async fn execute(&self, arguments: Value) -> Result<CallToolResult>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: ToolHandler + 'static>(&mut self, tool: T) {
        let name = tool.definition().name;
        debug!("Registering tool: {}", name);
        self.tools.retain(|t| t.definition().name != name);
        self.tools.push(Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools
            .iter()
            .find(|t| t.definition().name == name)
            .cloned()
    }

    pub fn list(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub async fn execute(&self, params: CallToolParams) -> Result<CallToolResult> {
        let tool = self
            .get(&params.name)
            .ok_or_else(|| ToolError::NotFound(params.name.clone()))?;

        tool.execute(params.arguments).await
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// JSON schema property shared by the guided tools.
pub fn disable_expert_mode_property(description: String) -> Value {
    serde_json::json!({
        "type": "boolean",
        "description": description,
        "default": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::McpError;

    struct TestTool(&'static str);

    #[async_trait]
    impl ToolHandler for TestTool {
        fn definition(&self) -> Tool {
            Tool {
                name: self.0.into(),
                description: Some("A test tool".into()),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {}
                }),
            }
        }

        async fn execute(&self, _arguments: Value) -> Result<CallToolResult> {
            Ok(CallToolResult::text("test result"))
        }
    }

    #[test]
    fn test_registry_keeps_order() {
        let mut registry = ToolRegistry::new();
        registry.register(TestTool("b_tool"));
        registry.register(TestTool("a_tool"));

        assert_eq!(registry.len(), 2);
        assert!(registry.get("a_tool").is_some());
        assert!(registry.get("unknown").is_none());

        let names: Vec<_> = registry.list().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["b_tool", "a_tool"]);
    }

    #[tokio::test]
    async fn test_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(TestTool("test_tool"));

        let params = CallToolParams {
            name: "test_tool".into(),
            arguments: serde_json::json!({}),
        };
        let result = registry.execute(params).await.unwrap();
        assert!(!result.is_error);

        let params = CallToolParams {
            name: "missing".into(),
            arguments: Value::Null,
        };
        let err = registry.execute(params).await.unwrap_err();
        assert!(matches!(err, McpError::Tool(ToolError::NotFound(_))));
    }
}
