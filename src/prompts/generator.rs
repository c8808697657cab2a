//! Prompt text rendering from string resources.

use crate::database::{TableInfo, TableSchema};
use crate::error::{DatabaseError, DbResult};
use crate::i18n::StringStore;
use crate::protocol::GetPromptParams;
use crate::server::ServerContext;
use std::fmt::Write;
use std::sync::Arc;
use tracing::debug;

/// Names of the prompts that exist regardless of the database.
pub const STATIC_PROMPTS: [&str; 3] = [
    "firebird_expert",
    "firebird_performance",
    "firebird_architecture",
];

/// Suffix of the per-table schema prompts.
pub const SCHEMA_SUFFIX: &str = "_schema";

const TABLE_SAMPLE: usize = 10;
const TABLE_MENTION: usize = 5;

pub struct PromptGenerator {
    ctx: Arc<ServerContext>,
}

impl PromptGenerator {
    pub fn new(ctx: Arc<ServerContext>) -> Self {
        Self { ctx }
    }

    fn s(&self, key: &str, params: &[(&str, &str)]) -> String {
        self.ctx.strings.get(key, params)
    }

    /// Render a static prompt, or `None` if `params.name` is not one.
    pub fn generate(&self, params: &GetPromptParams) -> Option<String> {
        match params.name.as_str() {
            "firebird_expert" => Some(self.expert(params)),
            "firebird_performance" => Some(self.performance(params)),
            "firebird_architecture" => Some(self.architecture(params)),
            _ => None,
        }
    }

    /// User tables when the database is reachable, empty otherwise.
    pub fn reachable_tables(&self) -> Vec<TableInfo> {
        if !self.ctx.preconditions().satisfied() {
            return Vec::new();
        }
        self.ctx.catalog.list_tables().unwrap_or_else(|e| {
            debug!(error = %e, "Table list unavailable for prompts");
            Vec::new()
        })
    }

    fn expert(&self, params: &GetPromptParams) -> String {
        let operation = params.argument("operation_type").unwrap_or("query");
        let level = params.argument("complexity_level").unwrap_or("intermediate");
        let table_context = params.argument("table_context");
        let target = &self.ctx.target;
        let port = target.port.to_string();

        let mut tables_line = String::new();
        if table_context.is_none() {
            let tables = self.reachable_tables();
            let names: Vec<&str> = tables
                .iter()
                .take(TABLE_SAMPLE)
                .map(|t| t.name.as_str())
                .collect();
            if !names.is_empty() {
                let mentioned = names[..names.len().min(TABLE_MENTION)].join(", ");
                tables_line = format!(
                    " | {}",
                    self.s(
                        "prompt_templates.firebird_expert.available_tables",
                        &[("tables", mentioned.as_str())],
                    )
                );
                if names.len() > TABLE_MENTION {
                    tables_line.push_str("...");
                }
            }
        }

        let guidance_key = format!("operation_guidance.{}", operation);
        let mut guidance = self.s(&guidance_key, &[]);
        if guidance == guidance_key {
            guidance = self.s("operation_guidance.query", &[]);
        }

        let t = "prompt_templates.firebird_expert";
        format!(
            "{}\n\n{}\n\n{}{}\n\n{}\n{}\n\n{}\n{}\n\n{}\n",
            self.s(&format!("{t}.title"), &[]),
            self.s(&format!("{t}.intro"), &[]),
            self.s(
                &format!("{t}.environment_config"),
                &[
                    ("host", target.host.as_str()),
                    ("port", port.as_str()),
                    ("database", target.database.as_str()),
                    ("user", target.user.as_str()),
                ],
            ),
            tables_line,
            self.s(
                &format!("{t}.operation"),
                &[("operation", operation), ("level", level)],
            ),
            self.s(&format!("{t}.guidance"), &[("guidance", guidance.as_str())]),
            self.s(&format!("{t}.firebird_expertise"), &[]),
            self.s(&format!("{t}.advanced_features"), &[]),
            self.s(&format!("{t}.response_approach"), &[]),
        )
    }

    fn performance(&self, params: &GetPromptParams) -> String {
        let query_type = params.argument("query_type").unwrap_or("general");
        let focus = params.argument("focus_area").unwrap_or("indexes");

        let t = "prompt_templates.firebird_performance";
        format!(
            "{}\n\n{}\n\n{}\n{}\n\n{}\n**Metrics**: {}\n\n{}\n",
            self.s(&format!("{t}.title"), &[]),
            self.s(&format!("{t}.intro"), &[]),
            self.s(&format!("{t}.focus_queries"), &[("query_type", query_type)]),
            self.s(&format!("{t}.methodology"), &[]),
            self.s(&format!("{t}.focus"), &[("focus", focus)]),
            self.s(&format!("{t}.key_metrics"), &[]),
            self.environment(t),
        )
    }

    fn architecture(&self, params: &GetPromptParams) -> String {
        let topic = params.argument("topic").unwrap_or("general");
        let version = params.argument("version_focus").unwrap_or("current");

        let t = "prompt_templates.firebird_architecture";
        format!(
            "{}\n\n{}\n\n{} | {}\n\n**Architectures**: {}\n**Practices**: {}\n\n{}\n",
            self.s(&format!("{t}.title"), &[]),
            self.s(&format!("{t}.intro"), &[]),
            self.s(&format!("{t}.focus_topic"), &[("topic", topic)]),
            self.s(&format!("{t}.version"), &[("version", version)]),
            self.s(&format!("{t}.architectures"), &[]),
            self.s(&format!("{t}.practices"), &[]),
            self.environment(t),
        )
    }

    fn environment(&self, template: &str) -> String {
        let target = &self.ctx.target;
        let port = target.port.to_string();
        self.s(
            &format!("{template}.environment"),
            &[
                ("host", target.host.as_str()),
                ("port", port.as_str()),
                ("database", target.database.as_str()),
            ],
        )
    }

    /// Markdown schema document for `table`, or the localized error text.
    pub fn table_schema(&self, table: &str) -> String {
        match self.load_schema(table) {
            Ok(schema) => self.render_schema(&schema),
            Err(e) => self.s(
                "table_schema.error",
                &[("table_name", table), ("error", e.to_string().as_str())],
            ),
        }
    }

    fn load_schema(&self, table: &str) -> DbResult<TableSchema> {
        if let Some(diagnostic) = self.ctx.preflight() {
            return Err(DatabaseError::Connection(diagnostic.message.unwrap_or_default()));
        }
        let schema = self.ctx.catalog.table_schema(table)?;
        if schema.columns.is_empty() {
            return Err(DatabaseError::Query(format!("table {} not found", schema.name)));
        }
        Ok(schema)
    }

    fn render_schema(&self, schema: &TableSchema) -> String {
        let name = schema.name.as_str();
        let count = schema.columns.len().to_string();
        let none = self.s("table_schema.none", &[]);
        let mut out = String::new();

        let _ = writeln!(out, "{}\n", self.s("table_schema.header", &[("table_name", name)]));
        let _ = writeln!(out, "{}", self.s("table_schema.table_info", &[]));
        let _ = writeln!(out, "- {}", self.s("table_schema.name", &[("table_name", name)]));
        let _ = writeln!(
            out,
            "- {}\n",
            self.s("table_schema.column_count", &[("count", count.as_str())])
        );

        let _ = writeln!(out, "{}", self.s("table_schema.columns_header", &[]));
        for column in &schema.columns {
            let _ = write!(out, "- **{}**: {}", column.name, column.data_type);
            if !column.nullable {
                out.push_str(" NOT NULL");
            }
            if let Some(default) = &column.default_value {
                let _ = write!(out, " DEFAULT {}", default);
            }
            out.push('\n');
        }

        let _ = writeln!(out, "\n{}", self.s("table_schema.primary_keys", &[]));
        if schema.primary_keys.is_empty() {
            let _ = writeln!(out, "{}", none);
        } else {
            let _ = writeln!(out, "{}", schema.primary_keys.join(", "));
        }

        let _ = writeln!(out, "\n{}", self.s("table_schema.foreign_keys", &[]));
        if schema.foreign_keys.is_empty() {
            let _ = writeln!(out, "{}", none);
        }
        for fk in &schema.foreign_keys {
            let _ = writeln!(
                out,
                "- {} → {}.{} ({})",
                fk.column, fk.referenced_table, fk.referenced_column, fk.constraint_name
            );
        }

        let _ = writeln!(out, "\n{}", self.s("table_schema.indexes", &[]));
        if schema.indexes.is_empty() {
            let _ = writeln!(out, "{}", none);
        }
        for index in &schema.indexes {
            let unique = if index.is_unique { " UNIQUE" } else { "" };
            let _ = writeln!(out, "- {} ({}){}", index.name, index.columns.join(", "), unique);
        }

        let _ = writeln!(out, "\n{}", self.s("table_schema.usage_guidance", &[]));
        out.push_str(&self.s("table_schema.usage_text", &[("table_name", name)]));
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FirebirdConfig, GuidanceConfig};
    use crate::database::testing::ScriptedClient;
    use crate::database::{DatabaseClient, Row, UnavailableClient};
    use crate::i18n::Catalog;
    use serde_json::json;

    fn generator(client: impl DatabaseClient + 'static) -> PromptGenerator {
        PromptGenerator::new(Arc::new(ServerContext::new(
            Arc::new(client),
            FirebirdConfig::default(),
            Arc::new(Catalog::embedded("en_US")),
            GuidanceConfig::default(),
        )))
    }

    fn params(name: &str, arguments: serde_json::Value) -> GetPromptParams {
        serde_json::from_value(json!({"name": name, "arguments": arguments})).unwrap()
    }

    fn tables(names: &[&str]) -> Vec<Row> {
        names
            .iter()
            .map(|n| [("TABLE_NAME", *n)].into_iter().collect())
            .collect()
    }

    #[test]
    fn test_expert_prompt_mentions_five_tables() {
        let client = ScriptedClient::new().respond(
            "RDB$RELATIONS",
            tables(&["A", "B", "C", "D", "E", "F", "G"]),
        );
        let text = generator(client)
            .generate(&params("firebird_expert", json!({"operation_type": "select"})))
            .unwrap();

        assert!(text.starts_with("# Firebird Database Expert"));
        assert!(text.contains(" | Tables: A, B, C, D, E..."));
        assert!(!text.contains("F, G"));
        assert!(text.contains("**Operation**: select (intermediate)"));
        assert!(text.contains("Check PLAN and index usage"));
    }

    #[test]
    fn test_expert_prompt_with_table_context_skips_tables() {
        let client = ScriptedClient::new().respond("RDB$RELATIONS", tables(&["A"]));
        let text = generator(client.clone())
            .generate(&params("firebird_expert", json!({"table_context": "ORDERS"})))
            .unwrap();

        assert!(!text.contains("Tables:"));
        assert!(client.executed().is_empty());
    }

    #[test]
    fn test_unknown_operation_falls_back() {
        let text = generator(UnavailableClient)
            .generate(&params("firebird_expert", json!({"operation_type": "vacuum"})))
            .unwrap();
        assert!(text.contains("**Guidance**: Optimize and validate"));
    }

    #[test]
    fn test_performance_and_architecture() {
        let generator = generator(UnavailableClient);
        let text = generator
            .generate(&params("firebird_performance", json!({"focus_area": "io"})))
            .unwrap();
        assert!(text.contains("Focus on general queries."));
        assert!(text.contains("**Focus**: io"));
        assert!(text.contains("Env: localhost:3050"));

        let text = generator
            .generate(&params("firebird_architecture", json!({"topic": "backup"})))
            .unwrap();
        assert!(text.contains("Topic: backup | Version: current"));

        assert!(generator.generate(&params("nope", json!({}))).is_none());
    }

    #[test]
    fn test_table_schema_markdown() {
        let mut column = Row::new();
        column.insert("COLUMN_NAME", "ID");
        column.insert("FIELD_TYPE", 8);
        column.insert("NULL_FLAG", 1);

        let mut index = Row::new();
        index.insert("INDEX_NAME", "PK_ORDERS");
        index.insert("COLUMN_NAME", "ID");
        index.insert("UNIQUE_FLAG", 1);

        let client = ScriptedClient::new()
            .respond("RDB$RELATION_FIELDS", vec![column])
            .respond("RDB$INDICES", vec![index]);
        let text = generator(client).table_schema("orders");

        assert!(text.starts_with("# Table Schema: ORDERS"));
        assert!(text.contains("- Columns: 1"));
        assert!(text.contains("- **ID**: INTEGER NOT NULL"));
        assert!(text.contains("- PK_ORDERS (ID) UNIQUE"));
        assert!(text.contains("## Usage Guidance"));
    }

    #[test]
    fn test_table_schema_error_text() {
        let text = generator(ScriptedClient::new()).table_schema("ghost");
        assert!(text.starts_with("Error retrieving schema for table ghost:"));
        assert!(text.contains("not found"));
    }
}
