//! Expert guidance block prepended to tool output.
//!
//! The composer never writes to [`GuidanceConfig`]; per-call overrides only
//! shape the block being composed.

use crate::config::{FirebirdConfig, GuidanceConfig};
use crate::i18n::StringStore;
use serde_json::Value;
use std::sync::Arc;

/// Tools whose description advertises the automatic expert context.
const DESCRIBED_TOOLS: [&str; 2] = ["execute_query", "test_connection"];

/// Connection target as shown in the guidance header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSnapshot {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
}

impl From<&FirebirdConfig> for EnvironmentSnapshot {
    fn from(config: &FirebirdConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            database: config.database.clone(),
            user: config.user.clone(),
        }
    }
}

/// Per-call guidance flags taken from tool arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuidanceOverrides {
    pub disabled: bool,
    pub operation: Option<String>,
}

impl GuidanceOverrides {
    /// Read the override flags from tool arguments, ignoring anything malformed.
    pub fn from_arguments(arguments: &Value) -> Self {
        Self {
            disabled: arguments
                .get("disable_expert_mode")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            operation: arguments
                .get("expert_operation")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}

pub struct GuidanceComposer {
    strings: Arc<dyn StringStore>,
}

impl GuidanceComposer {
    pub fn new(strings: Arc<dyn StringStore>) -> Self {
        Self { strings }
    }

    /// Compose the guidance block, or `None` when guidance does not apply.
    pub fn compose(
        &self,
        config: &GuidanceConfig,
        env: &EnvironmentSnapshot,
        overrides: &GuidanceOverrides,
    ) -> Option<String> {
        if !config.enabled || !config.auto_apply || overrides.disabled {
            return None;
        }

        let operation = overrides
            .operation
            .as_deref()
            .unwrap_or(&config.operation_type);
        let host_port = format!("{}:{}", env.host, env.port);

        let header = self.strings.get(
            "prompts.manager.expert_mode_active",
            &[("persona", config.prompt_name.as_str())],
        );
        let environment = self.strings.get(
            "prompts.manager.environment",
            &[
                ("env", host_port.as_str()),
                ("database", env.database.as_str()),
                ("user", env.user.as_str()),
            ],
        );
        let operation_line = self.strings.get(
            "prompts.manager.operation",
            &[("operation", operation), ("level", config.complexity_level.as_str())],
        );
        let guidelines = self.strings.get("prompts.manager.guidelines", &[]);
        let separator = self.strings.get("prompts.manager.separator", &[]);

        Some(format!(
            "{header}\n\n{environment}\n{operation_line}\n{guidelines}\n\n{separator}\n\n"
        ))
    }

    /// Prepend the guidance block to `content` when `tool` is a guidance target.
    pub fn apply(
        &self,
        content: String,
        tool: &str,
        config: &GuidanceConfig,
        env: &EnvironmentSnapshot,
        overrides: &GuidanceOverrides,
    ) -> String {
        if !config.targets(tool) {
            return content;
        }
        match self.compose(config, env, overrides) {
            Some(block) => block + &content,
            None => content,
        }
    }

    /// Tool description, with the expert-mode note when guidance is enabled.
    pub fn describe_tool(&self, tool: &str, description: String, config: &GuidanceConfig) -> String {
        if !config.enabled || !DESCRIBED_TOOLS.contains(&tool) {
            return description;
        }
        format!(
            "{}\n\n🎯 {}",
            description,
            self.strings.get("prompts.manager.auto_expert_mode", &[])
        )
    }
}
