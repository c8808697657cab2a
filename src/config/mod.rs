//! Configuration types and builders.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Default Firebird server port.
pub const DEFAULT_PORT: u16 = 3050;

/// Tools that receive the guidance block.
///
/// `server_status` is intentionally absent.
pub const GUIDANCE_TARGET_TOOLS: [&str; 3] = ["execute_query", "test_connection", "list_tables"];

/// Firebird connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebirdConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub charset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_library: Option<PathBuf>,
}

impl Default for FirebirdConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: DEFAULT_PORT,
            database: "/path/to/database.fdb".into(),
            user: "SYSDBA".into(),
            password: "masterkey".into(),
            charset: "UTF8".into(),
            client_library: None,
        }
    }
}

impl FirebirdConfig {
    pub fn builder() -> FirebirdConfigBuilder {
        FirebirdConfigBuilder::default()
    }

    /// Connection locator in `host/port:database` form.
    pub fn dsn(&self) -> String {
        format!("{}/{}:{}", self.host, self.port, self.database)
    }
}

/// Builder for FirebirdConfig with fluent API.
#[derive(Default)]
pub struct FirebirdConfigBuilder {
    config: FirebirdConfig,
}

impl FirebirdConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.config.database = database.into();
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.config.user = user.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.config.charset = charset.into();
        self
    }

    pub fn client_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.client_library = Some(path.into());
        self
    }

    /// Build from environment variables.
    pub fn from_env(mut self) -> Result<Self> {
        if let Ok(host) = env::var("FIREBIRD_HOST") {
            self.config.host = host;
        }

        if let Ok(port) = env::var("FIREBIRD_PORT") {
            self.config.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "FIREBIRD_PORT".into(),
                message: format!("Invalid port number: {}", port).into(),
            })?;
        }

        if let Ok(database) = env::var("FIREBIRD_DATABASE") {
            self.config.database = database;
        }

        if let Ok(user) = env::var("FIREBIRD_USER") {
            self.config.user = user;
        }

        if let Ok(password) = env::var("FIREBIRD_PASSWORD") {
            self.config.password = password;
        }

        if let Ok(charset) = env::var("FIREBIRD_CHARSET") {
            self.config.charset = charset;
        }

        if let Ok(path) = env::var("FIREBIRD_CLIENT_LIBRARY")
            && !path.trim().is_empty()
        {
            self.config.client_library = Some(PathBuf::from(path));
        }

        Ok(self)
    }

    pub fn build(self) -> Result<FirebirdConfig> {
        self.validate()?;
        Ok(self.config)
    }

    fn validate(&self) -> Result<()> {
        if self.config.host.is_empty() {
            return Err(ConfigError::MissingField("host".into()).into());
        }
        if self.config.database.is_empty() {
            return Err(ConfigError::MissingField("database".into()).into());
        }
        if self.config.user.is_empty() {
            return Err(ConfigError::MissingField("user".into()).into());
        }
        if self.config.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "port".into(),
                message: "Port must be greater than 0".into(),
            }
            .into());
        }
        Ok(())
    }
}

/// Settings controlling the expert guidance block prepended to tool output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceConfig {
    pub enabled: bool,
    pub auto_apply: bool,
    pub prompt_name: String,
    pub operation_type: String,
    pub complexity_level: String,
    pub target_tools: BTreeSet<String>,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_apply: false,
            prompt_name: "firebird_expert".into(),
            operation_type: "query".into(),
            complexity_level: "intermediate".into(),
            target_tools: GUIDANCE_TARGET_TOOLS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl GuidanceConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(v) = env::var("FIREBIRD_DEFAULT_PROMPT_ENABLED") {
            config.enabled = parse_flag(&v);
        }
        if let Ok(v) = env::var("FIREBIRD_AUTO_APPLY_PROMPT") {
            config.auto_apply = parse_flag(&v);
        }
        if let Ok(v) = env::var("FIREBIRD_DEFAULT_PROMPT") {
            config.prompt_name = v;
        }
        if let Ok(v) = env::var("FIREBIRD_DEFAULT_OPERATION") {
            config.operation_type = v;
        }
        if let Ok(v) = env::var("FIREBIRD_DEFAULT_COMPLEXITY") {
            config.complexity_level = v;
        }
        config
    }

    /// Whether `tool` is one of the tools that receive guidance.
    pub fn targets(&self, tool: &str) -> bool {
        self.target_tools.contains(tool)
    }

    /// Apply an update, returning the names of the fields that changed.
    ///
    /// This is the only way the guidance settings change after startup.
    pub fn apply(&mut self, update: GuidanceUpdate) -> Vec<&'static str> {
        let mut changed = Vec::new();

        if let Some(enabled) = update.enabled {
            log_change("enabled", &self.enabled, &enabled);
            if self.enabled != enabled {
                changed.push("enabled");
            }
            self.enabled = enabled;
        }
        if let Some(auto_apply) = update.auto_apply {
            log_change("auto_apply", &self.auto_apply, &auto_apply);
            if self.auto_apply != auto_apply {
                changed.push("auto_apply");
            }
            self.auto_apply = auto_apply;
        }
        for (field, slot, value) in [
            ("prompt_name", &mut self.prompt_name, update.prompt_name),
            ("operation_type", &mut self.operation_type, update.operation_type),
            ("complexity_level", &mut self.complexity_level, update.complexity_level),
        ] {
            if let Some(value) = value {
                log_change(field, &*slot, &value);
                if *slot != value {
                    changed.push(field);
                }
                *slot = value;
            }
        }

        changed
    }
}

fn log_change<T: std::fmt::Debug>(field: &str, old: &T, new: &T) {
    info!(field, old = ?old, new = ?new, "Guidance configuration updated");
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

/// Partial update for [`GuidanceConfig`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceUpdate {
    pub enabled: Option<bool>,
    pub auto_apply: Option<bool>,
    pub prompt_name: Option<String>,
    pub operation_type: Option<String>,
    pub complexity_level: Option<String>,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: Cow<'static, str>,
    pub version: Cow<'static, str>,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub i18n_dir: Option<PathBuf>,
    pub firebird: FirebirdConfig,
    pub guidance: GuidanceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").into(),
            version: env!("CARGO_PKG_VERSION").into(),
            language: "en_US".into(),
            i18n_dir: None,
            firebird: FirebirdConfig::default(),
            guidance: GuidanceConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Load the full server configuration from the environment.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder()
            .firebird(FirebirdConfigBuilder::new().from_env()?.build()?)
            .guidance(GuidanceConfig::from_env());

        if let Ok(name) = env::var("MCP_SERVER_NAME") {
            builder = builder.name(name);
        }
        if let Ok(version) = env::var("MCP_SERVER_VERSION") {
            builder = builder.version(version);
        }
        if let Ok(language) = env::var("FIREBIRD_LANGUAGE") {
            builder = builder.language(language);
        }
        if let Ok(dir) = env::var("FIREBIRD_I18N_DIR") {
            builder = builder.i18n_dir(dir);
        }

        Ok(builder.build())
    }
}

/// Builder for ServerConfig.
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn version(mut self, version: impl Into<Cow<'static, str>>) -> Self {
        self.config.version = version.into();
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    pub fn i18n_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.i18n_dir = Some(dir.into());
        self
    }

    pub fn firebird(mut self, firebird: FirebirdConfig) -> Self {
        self.config.firebird = firebird;
        self
    }

    pub fn guidance(mut self, guidance: GuidanceConfig) -> Self {
        self.config.guidance = guidance;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}
