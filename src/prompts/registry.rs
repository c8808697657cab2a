//! Prompt registry: fixed expert prompts plus one schema prompt per table.

use crate::i18n::StringStore;
use crate::prompts::generator::{PromptGenerator, SCHEMA_SUFFIX, STATIC_PROMPTS};
use crate::protocol::{GetPromptParams, GetPromptResult, Prompt, PromptArgument};
use crate::server::ServerContext;
use std::sync::Arc;
use tracing::{debug, warn};

/// Argument names of each static prompt, in declaration order.
fn argument_names(prompt: &str) -> &'static [&'static str] {
    match prompt {
        "firebird_expert" => &["operation_type", "table_context", "complexity_level"],
        "firebird_performance" => &["query_type", "focus_area"],
        "firebird_architecture" => &["topic", "version_focus"],
        _ => &[],
    }
}

pub struct PromptRegistry {
    ctx: Arc<ServerContext>,
    generator: PromptGenerator,
}

impl PromptRegistry {
    pub fn new(ctx: Arc<ServerContext>) -> Self {
        Self {
            generator: PromptGenerator::new(Arc::clone(&ctx)),
            ctx,
        }
    }

    fn describe(&self, name: &str) -> Prompt {
        let arguments = argument_names(name)
            .iter()
            .map(|arg| PromptArgument {
                name: arg.to_string(),
                description: Some(self.ctx.t(&format!("prompts.{}.{}", name, arg))),
                required: false,
            })
            .collect();

        Prompt {
            name: name.to_string(),
            description: Some(self.ctx.t(&format!("prompts.{}.description", name))),
            arguments,
        }
    }

    fn table_description(&self, table: &str) -> String {
        self.ctx
            .strings
            .get("table_schema.description", &[("table_name", table)])
    }

    /// Static prompts first, then a schema prompt for every reachable table.
    pub fn list(&self) -> Vec<Prompt> {
        let mut prompts: Vec<Prompt> = STATIC_PROMPTS.iter().map(|n| self.describe(n)).collect();

        let tables = self.generator.reachable_tables();
        debug!(tables = tables.len(), "Listing schema prompts");
        prompts.extend(tables.iter().map(|table| Prompt {
            name: format!("{}{}", table.name, SCHEMA_SUFFIX),
            description: Some(self.table_description(&table.name)),
            arguments: Vec::new(),
        }));

        prompts
    }

    pub fn get(&self, params: &GetPromptParams) -> GetPromptResult {
        if let Some(text) = self.generator.generate(params) {
            let description = self.ctx.t(&format!("prompts.{}.description", params.name));
            return GetPromptResult::user(description, text);
        }

        match params.name.strip_suffix(SCHEMA_SUFFIX) {
            Some(table) if !table.is_empty() => GetPromptResult::user(
                self.table_description(table),
                self.generator.table_schema(table),
            ),
            _ => {
                warn!(prompt = %params.name, "Unknown prompt requested");
                GetPromptResult::error(format!(
                    "{}: {}",
                    self.ctx.t("prompts.unknown_prompt"),
                    params.name
                ))
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
    use crate::i18n::Catalog;
    use serde_json::json;

    fn registry(client: impl DatabaseClient + 'static, language: &str) -> PromptRegistry {
        PromptRegistry::new(Arc::new(ServerContext::new(
            Arc::new(client),
            FirebirdConfig::default(),
            Arc::new(Catalog::embedded(language)),
            GuidanceConfig::default(),
        )))
    }

    fn params(name: &str) -> GetPromptParams {
        serde_json::from_value(json!({"name": name})).unwrap()
    }

    #[test]
    fn test_static_prompts_without_database() {
        let prompts = registry(UnavailableClient, "en_US").list();
        let names: Vec<_> = prompts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, STATIC_PROMPTS);
        assert_eq!(prompts[0].arguments.len(), 3);
        assert_eq!(prompts[0].arguments[1].name, "table_context");
        assert!(!prompts[0].arguments[1].required);
    }

    #[test]
    fn test_schema_prompts_follow_static_ones() {
        let client = ScriptedClient::new().respond(
            "RDB$RELATIONS",
            vec![[("TABLE_NAME", "CUSTOMERS")].into_iter().collect()],
        );
        let prompts = registry(client, "en_US").list();
        assert_eq!(prompts.len(), 4);
        assert_eq!(prompts[3].name, "CUSTOMERS_schema");
        assert_eq!(
            prompts[3].description.as_deref(),
            Some("Schema information for table: CUSTOMERS")
        );
    }

    #[test]
    fn test_localized_descriptions() {
        let prompts = registry(UnavailableClient, "pt_BR").list();
        let english = registry(UnavailableClient, "en_US").list();
        assert_ne!(prompts[0].description, english[0].description);
    }

    #[test]
    fn test_get_static_prompt() {
        let result = registry(UnavailableClient, "en_US").get(&params("firebird_architecture"));
        assert!(!result.is_error);
        assert_eq!(
            result.description.as_deref(),
            Some("Architecture and administration specialist")
        );
    }

    #[test]
    fn test_get_schema_prompt_reports_failure_as_text() {
        let result = registry(UnavailableClient, "en_US").get(&params("ORDERS_schema"));
        assert!(!result.is_error);
        let text = &result.messages[0].content.text;
        assert!(text.starts_with("Error retrieving schema for table ORDERS:"));
    }

    #[test]
    fn test_unknown_prompt_is_error() {
        let result = registry(UnavailableClient, "en_US").get(&params("nope"));
        assert!(result.is_error);
        assert_eq!(result.messages[0].content.text, "Unknown prompt: nope");

        assert!(registry(UnavailableClient, "en_US").get(&params("_schema")).is_error);
    }
}
