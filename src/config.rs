//! Configuration management for EcoOptima
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{EcoOptimaError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for EcoOptima
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Provider configuration (OpenAI-compatible, Ollama)
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Agent execution limits
    #[serde(default)]
    pub agent: AgentConfig,
    /// Conversation history windows
    #[serde(default)]
    pub conversation: ConversationConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Run output settings
    #[serde(default)]
    pub output: OutputConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Provider configuration
///
/// Specifies which AI provider to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,

    /// OpenAI-compatible configuration
    #[serde(default)]
    pub openai: OpenAIConfig,

    /// Ollama configuration
    #[serde(default)]
    pub ollama: OllamaConfig,
}

fn default_provider_type() -> String {
    "openai".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            openai: OpenAIConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

/// OpenAI-compatible chat completions configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// API base URL; `/chat/completions` is appended
    #[serde(default = "default_openai_api_base")]
    pub api_base: String,

    /// Model to use
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,
}

fn default_openai_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-5-nano".to_string()
}

fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_base: default_openai_api_base(),
            model: default_openai_model(),
            api_key_env: default_openai_api_key_env(),
        }
    }
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama server host
    #[serde(default = "default_ollama_host")]
    pub host: String,

    /// Model to use for Ollama
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:latest".to_string()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_ollama_model(),
        }
    }
}

/// Agent execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum provider round trips in one tool-calling loop
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Timeout for a single provider call, in seconds
    #[serde(default = "default_call_timeout")]
    pub call_timeout_seconds: u64,

    /// Retries after a timed-out or failed provider call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_max_turns() -> usize {
    10
}

fn default_call_timeout() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            call_timeout_seconds: default_call_timeout(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Conversation history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Turns kept in a session's stored history
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Turns included in follow-up context
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,
}

fn default_history_limit() -> usize {
    12
}

fn default_context_turns() -> usize {
    8
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            context_turns: default_context_turns(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Session cookie name
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Directory holding `<page>.html` files; built-in pages when unset
    #[serde(default)]
    pub pages_dir: Option<PathBuf>,
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_cookie_name() -> String {
    "ecooptima_session".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cookie_name: default_cookie_name(),
            pages_dir: None,
        }
    }
}

/// Run output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for per-run logs and charts
    #[serde(default = "default_log_root")]
    pub log_root: PathBuf,
}

fn default_log_root() -> PathBuf {
    PathBuf::from(crate::chart::DEFAULT_OUTPUT_DIR)
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_root: default_log_root(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

const VALID_PROVIDERS: [&str; 2] = ["openai", "ollama"];

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| EcoOptimaError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| EcoOptimaError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(provider_type) = std::env::var("ECOOPTIMA_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        if let Ok(model) = std::env::var("ECOOPTIMA_OPENAI_MODEL") {
            self.provider.openai.model = model;
        }

        if let Ok(api_base) = std::env::var("ECOOPTIMA_OPENAI_API_BASE") {
            self.provider.openai.api_base = api_base;
        }

        if let Ok(ollama_host) = std::env::var("ECOOPTIMA_OLLAMA_HOST") {
            self.provider.ollama.host = ollama_host;
        }

        if let Ok(ollama_model) = std::env::var("ECOOPTIMA_OLLAMA_MODEL") {
            self.provider.ollama.model = ollama_model;
        }

        if let Ok(timeout) = std::env::var("ECOOPTIMA_CALL_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.agent.call_timeout_seconds = value;
            } else {
                tracing::warn!("Invalid ECOOPTIMA_CALL_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(retries) = std::env::var("ECOOPTIMA_MAX_RETRIES") {
            if let Ok(value) = retries.parse() {
                self.agent.max_retries = value;
            } else {
                tracing::warn!("Invalid ECOOPTIMA_MAX_RETRIES: {}", retries);
            }
        }

        if let Ok(bind) = std::env::var("ECOOPTIMA_BIND") {
            self.server.bind = bind;
        }

        if let Ok(log_root) = std::env::var("ECOOPTIMA_LOG_ROOT") {
            tracing::debug!(log_root = %log_root, "Env override: ECOOPTIMA_LOG_ROOT");
            self.output.log_root = PathBuf::from(log_root);
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if cli.json_logs {
            self.logging.json = true;
        }

        if let Some(provider) = &cli.provider {
            self.provider.provider_type = provider.clone();
        }

        if let crate::cli::Commands::Serve {
            bind: Some(bind), ..
        } = &cli.command
        {
            self.server.bind = bind.clone();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if !VALID_PROVIDERS.contains(&self.provider.provider_type.as_str()) {
            return Err(EcoOptimaError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                VALID_PROVIDERS.join(", ")
            ))
            .into());
        }

        if self.agent.max_turns == 0 {
            return Err(
                EcoOptimaError::Config("agent.max_turns must be greater than 0".to_string()).into(),
            );
        }

        if self.agent.call_timeout_seconds == 0 {
            return Err(EcoOptimaError::Config(
                "agent.call_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.conversation.history_limit == 0 || self.conversation.context_turns == 0 {
            return Err(EcoOptimaError::Config(
                "conversation limits must be greater than 0".to_string(),
            )
            .into());
        }

        if self.conversation.context_turns > self.conversation.history_limit {
            return Err(EcoOptimaError::Config(format!(
                "conversation.context_turns ({}) cannot exceed conversation.history_limit ({})",
                self.conversation.context_turns, self.conversation.history_limit
            ))
            .into());
        }

        if self.server.bind.trim().is_empty() {
            return Err(EcoOptimaError::Config("server.bind cannot be empty".to_string()).into());
        }

        if self.server.cookie_name.trim().is_empty() {
            return Err(
                EcoOptimaError::Config("server.cookie_name cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.provider_type, "openai");
        assert_eq!(config.provider.openai.model, "gpt-5-nano");
        assert_eq!(config.conversation.history_limit, 12);
        assert_eq!(config.conversation.context_turns, 8);
        assert_eq!(config.server.cookie_name, "ecooptima_session");
        assert_eq!(config.output.log_root, PathBuf::from("response_log"));
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_provider() {
        let mut config = Config::default();
        config.provider.provider_type = "bedrock".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let mut config = Config::default();
        config.agent.call_timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_context_exceeds_history() {
        let mut config = Config::default();
        config.conversation.context_turns = 20;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("context_turns"));
    }

    #[test]
    fn test_config_validation_empty_bind() {
        let mut config = Config::default();
        config.server.bind = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml_partial() {
        let yaml = r#"
provider:
  type: ollama
  ollama:
    model: qwen2.5:7b
agent:
  call_timeout_seconds: 30
server:
  bind: 0.0.0.0:8080
  pages_dir: web/templates
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.provider.provider_type, "ollama");
        assert_eq!(config.provider.ollama.model, "qwen2.5:7b");
        assert_eq!(config.provider.ollama.host, "http://localhost:11434");
        assert_eq!(config.agent.call_timeout_seconds, 30);
        assert_eq!(config.agent.max_retries, 2);
        assert_eq!(config.server.pages_dir, Some(PathBuf::from("web/templates")));
        assert_eq!(config.conversation.history_limit, 12);
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        let cli = crate::cli::Cli::default();
        let config = Config::load("nonexistent.yaml", &cli).unwrap();
        assert_eq!(config.server.cookie_name, "ecooptima_session");
    }

    #[test]
    #[serial]
    fn test_env_overrides_and_invalid_numbers() {
        std::env::set_var("ECOOPTIMA_OPENAI_MODEL", "gpt-test");
        std::env::set_var("ECOOPTIMA_CALL_TIMEOUT_SECONDS", "not-a-number");
        std::env::set_var("ECOOPTIMA_MAX_RETRIES", "5");
        std::env::set_var("ECOOPTIMA_LOG_ROOT", "/tmp/eco-runs");

        let cli = crate::cli::Cli::default();
        let config = Config::load("nonexistent.yaml", &cli).unwrap();

        std::env::remove_var("ECOOPTIMA_OPENAI_MODEL");
        std::env::remove_var("ECOOPTIMA_CALL_TIMEOUT_SECONDS");
        std::env::remove_var("ECOOPTIMA_MAX_RETRIES");
        std::env::remove_var("ECOOPTIMA_LOG_ROOT");

        assert_eq!(config.provider.openai.model, "gpt-test");
        assert_eq!(config.agent.call_timeout_seconds, 120);
        assert_eq!(config.agent.max_retries, 5);
        assert_eq!(config.output.log_root, PathBuf::from("/tmp/eco-runs"));
    }

    #[test]
    #[serial]
    fn test_cli_overrides_win() {
        std::env::set_var("ECOOPTIMA_BIND", "127.0.0.1:1111");
        let cli = crate::cli::Cli {
            provider: Some("ollama".to_string()),
            json_logs: true,
            command: crate::cli::Commands::Serve {
                bind: Some("127.0.0.1:2222".to_string()),
            },
            ..Default::default()
        };
        let config = Config::load("nonexistent.yaml", &cli).unwrap();
        std::env::remove_var("ECOOPTIMA_BIND");

        assert_eq!(config.server.bind, "127.0.0.1:2222");
        assert_eq!(config.provider.provider_type, "ollama");
        assert!(config.logging.json);
    }
}
