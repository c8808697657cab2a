//! Server state management.

use crate::config::{GuidanceConfig, GuidanceUpdate, ServerConfig};
use crate::database::{self, DatabaseClient};
use crate::guidance::{EnvironmentSnapshot, GuidanceComposer};
use crate::i18n::Catalog;
use crate::prompts::PromptRegistry;
use crate::protocol::{ClientInfo, ServerInfo};
use crate::server::context::ServerContext;
use crate::tools::ToolRegistry;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct ServerState {
    pub config: ServerConfig,
    pub context: Arc<ServerContext>,
    pub tools: ToolRegistry,
    pub prompts: PromptRegistry,
    pub composer: GuidanceComposer,
    initialized: AtomicBool,
    client_info: RwLock<Option<ClientInfo>>,
}

impl ServerState {
    pub fn new(config: ServerConfig, context: Arc<ServerContext>) -> Self {
        let info = ServerInfo {
            name: config.name.to_string(),
            version: config.version.to_string(),
        };
        Self {
            tools: crate::tools::create_registry(Arc::clone(&context), info),
            prompts: PromptRegistry::new(Arc::clone(&context)),
            composer: GuidanceComposer::new(context.strings.clone()),
            config,
            context,
            initialized: AtomicBool::new(false),
            client_info: RwLock::new(None),
        }
    }

    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            name: self.config.name.to_string(),
            version: self.config.version.to_string(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn set_initialized(&self, client_info: Option<ClientInfo>) {
        *self.client_info.write() = client_info;
        self.initialized.store(true, Ordering::SeqCst);
    }

    pub fn client_info(&self) -> Option<ClientInfo> {
        self.client_info.read().clone()
    }

    /// Snapshot of the current guidance settings.
    pub fn guidance(&self) -> GuidanceConfig {
        self.context.guidance.read().clone()
    }

    /// Change guidance settings, returning the fields that changed.
    pub fn update_guidance(&self, update: GuidanceUpdate) -> Vec<&'static str> {
        self.context.guidance.write().apply(update)
    }

    pub fn environment(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot::from(&self.context.target)
    }
}

pub struct ServerStateBuilder {
    config: Option<ServerConfig>,
    client: Option<Arc<dyn DatabaseClient>>,
    strings: Option<Arc<Catalog>>,
}

impl ServerStateBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            client: None,
            strings: None,
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn client(mut self, client: Arc<dyn DatabaseClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn strings(mut self, strings: Arc<Catalog>) -> Self {
        self.strings = Some(strings);
        self
    }

    pub fn build(self) -> Result<ServerState, &'static str> {
        let config = self.config.ok_or("Config is required")?;
        let client = self
            .client
            .unwrap_or_else(|| database::create_client(&config.firebird));
        let strings = self.strings.unwrap_or_else(|| {
            Arc::new(Catalog::load(
                config.language.clone(),
                config.i18n_dir.as_deref(),
            ))
        });

        let context = Arc::new(ServerContext::new(
            client,
            config.firebird.clone(),
            strings,
            config.guidance.clone(),
        ));

        Ok(ServerState::new(config, context))
    }
}

impl Default for ServerStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
