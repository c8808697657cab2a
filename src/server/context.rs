//! Collaborators shared by tools and prompts.

use crate::analysis::diagnostics::{self, ConnectionContext, DiagnosticResult};
use crate::config::{FirebirdConfig, GuidanceConfig};
use crate::database::{CellValue, DatabaseClient, Preconditions, SchemaCatalog};
use crate::error::DatabaseError;
use crate::i18n::{Catalog, StringStore};
use crate::protocol::CallToolResult;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

const VERSION_SQL: &str =
    "SELECT rdb$get_context('SYSTEM', 'ENGINE_VERSION') AS VERSION FROM rdb$database";

/// Database client, connection target, strings and guidance settings.
pub struct ServerContext {
    pub client: Arc<dyn DatabaseClient>,
    pub target: FirebirdConfig,
    pub catalog: SchemaCatalog,
    pub strings: Arc<Catalog>,
    pub guidance: RwLock<GuidanceConfig>,
}

impl ServerContext {
    pub fn new(
        client: Arc<dyn DatabaseClient>,
        target: FirebirdConfig,
        strings: Arc<Catalog>,
        guidance: GuidanceConfig,
    ) -> Self {
        Self {
            catalog: SchemaCatalog::new(Arc::clone(&client), target.clone()),
            client,
            target,
            strings,
            guidance: RwLock::new(guidance),
        }
    }

    pub fn t(&self, key: &str) -> String {
        self.strings.get(key, &[])
    }

    pub fn preconditions(&self) -> Preconditions {
        self.client.preconditions()
    }

    pub fn connection_context(&self) -> ConnectionContext {
        ConnectionContext::from_config(&self.target)
    }

    /// Diagnostic for a failed precondition, if any.
    pub fn preflight(&self) -> Option<DiagnosticResult> {
        diagnostics::check_preconditions(&self.preconditions(), &self.connection_context())
    }

    /// Classify a connection failure.
    pub fn diagnose(&self, error: &DatabaseError) -> DiagnosticResult {
        warn!(error = %error, "Connection failed");
        diagnostics::classify(
            &error.to_string(),
            &self.preconditions(),
            &self.connection_context(),
        )
    }

    /// Connect and read the engine version.
    pub fn probe_connection(&self) -> DiagnosticResult {
        if let Some(failed) = self.preflight() {
            return failed;
        }

        let version = self
            .client
            .connect(&self.target)
            .and_then(|mut conn| conn.execute(VERSION_SQL, &[]));

        match version {
            Ok(result) => {
                let version = result
                    .scalar()
                    .map(CellValue::to_text)
                    .unwrap_or_else(|| "unknown".into());
                debug!(version = %version, "Connection test succeeded");
                DiagnosticResult::connected(version, self.connection_context())
            }
            Err(e) => self.diagnose(&e),
        }
    }

    /// A localized title line followed by a fenced JSON block.
    pub fn render<T: Serialize>(&self, icon: &str, title: &str, data: &T) -> String {
        let json = serde_json::to_string_pretty(data).unwrap_or_else(|e| e.to_string());
        format!("{} {}:\n```json\n{}\n```", icon, title, json)
    }

    /// Error result for a failed tool call.
    pub fn failure(&self, tool: &str, message: impl std::fmt::Display) -> CallToolResult {
        CallToolResult::error(format!(
            "❌ {} {}: {}",
            self.t("tools.error_executing"),
            tool,
            message
        ))
    }

    /// Error result carrying a structured payload.
    pub fn failure_payload<T: Serialize>(&self, tool: &str, data: &T) -> CallToolResult {
        let title = format!("{} {}", self.t("tools.error_executing"), tool);
        CallToolResult::error(self.render("❌", &title, data))
    }
}
