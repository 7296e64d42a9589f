//! Process configuration schema and loader.
//!
//! This crate defines everything resolved once at startup:
//!
//! - [`Config`] — Root of the YAML document, every section optional
//! - [`ModelSettings`] — Provider, model name and sampling parameters
//! - [`CheckpointSettings`] — Which conversation-memory strategy to use
//! - [`AgentSettings`] — Call timeout, context window and system prompt
//! - [`ConfigError`] — Failures while loading or resolving
//!
//! # Loading
//!
//! ```rust,ignore
//! use threadline_config::Config;
//!
//! // Reads CONFIG_PATH (default config/config.yaml), then applies
//! // DEBUG / PORT / DATABASE_URL from the environment.
//! let config = Config::load_from_env()?;
//! let model = config.resolve_model(|key| std::env::var(key).ok())?;
//! ```
//!
//! # Parsing
//!
//! ```rust
//! use threadline_config::{CheckpointStrategy, Config};
//!
//! let config = Config::from_yaml("app:\n  debug: false\n  port: 8080\n").unwrap();
//! assert_eq!(config.app.port, 8080);
//! assert!(matches!(config.checkpoint_strategy(), CheckpointStrategy::Sqlite { .. }));
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use threadline_core::{ModelConfig, Provider};
use tracing::{info, warn};

/// Path used when `CONFIG_PATH` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// Errors that can occur when loading or resolving configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The provider needs a key and the named variable is unset or empty.
    #[error("{0} environment variable is required")]
    MissingApiKey(String),
}

impl ConfigError {
    /// Creates an IO error with path context.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppSettings,
    pub model: ModelSettings,
    pub checkpoint: CheckpointSettings,
    pub api: ApiSettings,
    pub tools: ToolSettings,
    pub logging: LoggingSettings,
    pub agent: AgentSettings,
}

/// Process identity and listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub name: String,
    pub version: String,
    /// Selects in-memory checkpoints under `checkpoint.type: auto`.
    pub debug: bool,
    pub port: u16,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "threadline".into(),
            version: "1.0.0".into(),
            debug: true,
            port: 3000,
        }
    }
}

/// Model selection as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub provider: Provider,
    pub name: String,
    /// Variable holding the key; defaults to the provider's conventional one.
    pub api_key_env: Option<String>,
    pub api_base: Option<String>,
    pub parameters: ModelParameters,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: Provider::Google,
            name: "gemini-2.0-flash".into(),
            api_key_env: None,
            api_base: None,
            parameters: ModelParameters::default(),
        }
    }
}

impl ModelSettings {
    /// Name of the environment variable the API key is read from.
    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_key_env())
    }
}

/// Sampling parameters passed through to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParameters {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self { temperature: 0.7, max_tokens: 1000 }
    }
}

/// Conversation-memory strategy as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointType {
    /// Memory in debug mode, SQLite otherwise.
    #[default]
    Auto,
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointSettings {
    #[serde(rename = "type")]
    pub kind: CheckpointType,
    pub sqlite: SqliteSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteSettings {
    pub path: PathBuf,
}

impl Default for SqliteSettings {
    fn default() -> Self {
        Self { path: PathBuf::from("data/checkpoints.db") }
    }
}

/// Resolved memory strategy, with `auto` already decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointStrategy {
    Memory,
    Sqlite { path: PathBuf },
}

/// HTTP surface settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub invoke_path: String,
    pub cors: CorsSettings,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            invoke_path: "/invoke".into(),
            cors: CorsSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsSettings {
    pub enabled: bool,
    /// `"*"` allows any origin.
    pub origins: Vec<String>,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self { enabled: false, origins: vec!["*".into()] }
    }
}

/// Tools the agent may call. No tools ship with threadline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub enabled: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

/// Behavior of each agent invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub timeout_secs: u64,
    /// Most recent messages sent to the model; `None` sends the whole thread.
    pub max_history: Option<usize>,
    pub system_prompt: Option<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_history: None,
            system_prompt: None,
        }
    }
}

impl AgentSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Parses a configuration from a YAML string. Missing keys take defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads a configuration file, falling back to defaults if it does not exist.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        let config = Self::from_yaml(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Loads from `CONFIG_PATH` and applies process environment overrides.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies `DEBUG`, `PORT` and `DATABASE_URL` from the given lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(debug) = lookup("DEBUG") {
            self.app.debug = debug.eq_ignore_ascii_case("true");
        }

        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => self.app.port = port,
                Err(_) => warn!("Invalid PORT value: {}", port),
            }
        }

        if let Some(path) = lookup("DATABASE_URL").filter(|p| !p.is_empty()) {
            self.checkpoint.sqlite.path = PathBuf::from(path);
        }
    }

    /// Decides the memory strategy, resolving `auto` against the debug flag.
    pub fn checkpoint_strategy(&self) -> CheckpointStrategy {
        let sqlite = || CheckpointStrategy::Sqlite { path: self.checkpoint.sqlite.path.clone() };
        match self.checkpoint.kind {
            CheckpointType::Memory => CheckpointStrategy::Memory,
            CheckpointType::Sqlite => sqlite(),
            CheckpointType::Auto if self.app.debug => CheckpointStrategy::Memory,
            CheckpointType::Auto => sqlite(),
        }
    }

    /// Builds the model selection, reading the API key through `lookup`.
    pub fn resolve_model<F>(&self, lookup: F) -> Result<ModelConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = &self.model;
        let key_env = settings.api_key_env();
        let api_key = lookup(key_env).filter(|k| !k.is_empty());

        if api_key.is_none() && settings.provider.requires_api_key() {
            return Err(ConfigError::MissingApiKey(key_env.to_string()));
        }

        let api_base = settings
            .api_base
            .clone()
            .or_else(|| settings.provider.default_api_base().map(String::from));

        Ok(ModelConfig {
            provider: settings.provider,
            model: settings.name.clone(),
            api_base,
            api_key,
            temperature: settings.parameters.temperature,
            max_tokens: settings.parameters.max_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_shipped_service() {
        let config = Config::default();
        assert_eq!(config.app.port, 3000);
        assert!(config.app.debug);
        assert_eq!(config.model.provider, Provider::Google);
        assert_eq!(config.model.name, "gemini-2.0-flash");
        assert_eq!(config.model.api_key_env(), "GOOGLE_API_KEY");
        assert_eq!(config.api.invoke_path, "/invoke");
        assert_eq!(config.agent.timeout(), Duration::from_secs(30));
        assert!(config.tools.enabled.is_empty());
    }

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
        assert_eq!(Config::from_yaml("\n  \n").unwrap(), Config::default());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let yaml = r#"
model:
  provider: anthropic
  name: claude-haiku-4-5
  parameters:
    temperature: 0.2
checkpoint:
  type: sqlite
  sqlite:
    path: /tmp/threads.db
agent:
  timeout_secs: 5
  max_history: 20
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.model.provider, Provider::Anthropic);
        assert_eq!(config.model.parameters.temperature, 0.2);
        assert_eq!(config.model.parameters.max_tokens, 1000);
        assert_eq!(config.model.api_key_env(), "ANTHROPIC_API_KEY");
        assert_eq!(config.agent.max_history, Some(20));
        assert_eq!(config.app.port, 3000);
        assert_eq!(
            config.checkpoint_strategy(),
            CheckpointStrategy::Sqlite { path: PathBuf::from("/tmp/threads.db") }
        );
    }

    #[test]
    fn unknown_checkpoint_type_is_rejected() {
        let err = Config::from_yaml("checkpoint:\n  type: postgres\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn auto_checkpoint_follows_debug_flag() {
        let mut config = Config::default();
        assert_eq!(config.checkpoint_strategy(), CheckpointStrategy::Memory);

        config.app.debug = false;
        assert!(matches!(config.checkpoint_strategy(), CheckpointStrategy::Sqlite { .. }));

        config.checkpoint.kind = CheckpointType::Memory;
        assert_eq!(config.checkpoint_strategy(), CheckpointStrategy::Memory);
    }

    #[test]
    fn env_overrides_apply_after_file() {
        let mut config = Config::default();
        config.apply_env_overrides(env(&[
            ("DEBUG", "FALSE"),
            ("PORT", "8081"),
            ("DATABASE_URL", "/var/lib/threadline.db"),
        ]));
        assert!(!config.app.debug);
        assert_eq!(config.app.port, 8081);
        assert_eq!(config.checkpoint.sqlite.path, PathBuf::from("/var/lib/threadline.db"));
    }

    #[test]
    fn invalid_port_override_is_ignored() {
        let mut config = Config::default();
        config.apply_env_overrides(env(&[("PORT", "not-a-port"), ("DEBUG", "True")]));
        assert_eq!(config.app.port, 3000);
        assert!(config.app.debug);
    }

    #[test]
    fn resolve_model_requires_key_for_hosted_providers() {
        let config = Config::default();
        let err = config.resolve_model(env(&[])).unwrap_err();
        assert_eq!(err.to_string(), "GOOGLE_API_KEY environment variable is required");

        let err = config.resolve_model(env(&[("GOOGLE_API_KEY", "")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey(_)));
    }

    #[test]
    fn resolve_model_fills_provider_endpoint() {
        let config = Config::default();
        let model = config.resolve_model(env(&[("GOOGLE_API_KEY", "g-key")])).unwrap();
        assert_eq!(model.api_key.as_deref(), Some("g-key"));
        assert_eq!(
            model.api_base.as_deref(),
            Some("https://generativelanguage.googleapis.com/v1beta/openai")
        );
        assert_eq!(model.max_tokens, 1000);
    }

    #[test]
    fn resolve_model_allows_keyless_ollama_and_custom_key_env() {
        let config = Config::from_yaml("model:\n  provider: ollama\n  name: llama3.2\n").unwrap();
        let model = config.resolve_model(env(&[])).unwrap();
        assert!(model.api_key.is_none());
        assert_eq!(model.api_base.as_deref(), Some("http://localhost:11434/v1"));

        let config = Config::from_yaml(
            "model:\n  provider: openai\n  name: gpt-4o-mini\n  api_key_env: MY_KEY\n  api_base: http://proxy/v1\n",
        )
        .unwrap();
        let model = config.resolve_model(env(&[("MY_KEY", "k")])).unwrap();
        assert_eq!(model.api_base.as_deref(), Some("http://proxy/v1"));
    }

    #[test]
    fn from_file_reads_yaml_and_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        assert_eq!(Config::from_file(&missing).unwrap(), Config::default());

        let path = dir.path().join("config.yaml");
        fs::write(&path, "app:\n  name: demo\n  port: 9000\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.app.name, "demo");
        assert_eq!(config.app.port, 9000);

        fs::write(&path, "app: [unclosed\n").unwrap();
        assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse(_))));
    }
}
