//! Configuration loading, validation, and management for Groundcrew.
//!
//! Loads configuration from `~/.groundcrew/config.toml` with environment
//! variable overrides. Validates all settings at startup. Completion
//! defaults live in an explicit [`CompletionDefaults`] struct that is
//! handed to the orchestrator at construction — there is no process-wide
//! mutable settings object.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.groundcrew/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Completion defaults applied when a request omits them
    #[serde(default)]
    pub completion: CompletionDefaults,

    /// Completion backend endpoint
    #[serde(default)]
    pub backend: BackendConfig,

    /// Retrieval index (vector store) settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Usage accounting sink
    #[serde(default)]
    pub usage: UsageConfig,

    /// Gateway (HTTP server) settings
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Defaults for a completion request: model, temperature, token cap, and
/// how many chunks a context-augmented completion retrieves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionDefaults {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_retrieval_limit")]
    pub retrieval_limit: usize,
}

fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_retrieval_limit() -> usize {
    5
}

impl Default for CompletionDefaults {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            retrieval_limit: default_retrieval_limit(),
        }
    }
}

/// Completion backend endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Embedding model used to vectorize retrieval queries
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Request timeout in seconds
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

fn default_backend_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_embedding_model() -> String {
    "text-embedding-ada-002".into()
}
fn default_backend_timeout() -> u64 {
    120
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            embedding_model: default_embedding_model(),
            timeout_secs: default_backend_timeout(),
        }
    }
}

/// Retrieval index (vector store) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Whether context-augmented completions may query the index at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of the vector store HTTP API
    #[serde(default = "default_index_url")]
    pub index_url: String,

    /// Query timeout in seconds
    #[serde(default = "default_index_timeout")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_index_url() -> String {
    "http://localhost:8000".into()
}
fn default_index_timeout() -> u64 {
    30
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            index_url: default_index_url(),
            timeout_secs: default_index_timeout(),
        }
    }
}

/// Usage accounting sink configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct UsageConfig {
    /// Whether usage records are dispatched at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of the accounting service
    #[serde(default = "default_usage_url")]
    pub base_url: String,

    /// Service token used to authenticate to the accounting service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_token: Option<String>,

    /// Delivery timeout in seconds
    #[serde(default = "default_usage_timeout")]
    pub timeout_secs: u64,
}

fn default_usage_url() -> String {
    "http://localhost:8080/api".into()
}
fn default_usage_timeout() -> u64 {
    30
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_usage_url(),
            service_token: None,
            timeout_secs: default_usage_timeout(),
        }
    }
}

/// Gateway (HTTP server) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed by the CORS layer
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8100
}
fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".into()]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("completion", &self.completion)
            .field("backend", &self.backend)
            .field("retrieval", &self.retrieval)
            .field("usage", &self.usage)
            .field("gateway", &self.gateway)
            .finish()
    }
}

impl std::fmt::Debug for UsageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageConfig")
            .field("enabled", &self.enabled)
            .field("base_url", &self.base_url)
            .field("service_token", &redact(&self.service_token))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.groundcrew/config.toml).
    ///
    /// Also checks environment variables:
    /// - `GROUNDCREW_API_KEY` / `OPENAI_API_KEY` for the backend key
    /// - `GROUNDCREW_MODEL` for the default model
    /// - `GROUNDCREW_INDEX_URL` for the vector store
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("GROUNDCREW_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("GROUNDCREW_MODEL") {
            config.completion.model = model;
        }

        if let Ok(url) = std::env::var("GROUNDCREW_INDEX_URL") {
            config.retrieval.index_url = url;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".groundcrew")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.completion.temperature < 0.0 || self.completion.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "completion.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.completion.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "completion.max_tokens must be greater than 0".into(),
            ));
        }

        if self.completion.retrieval_limit == 0 {
            return Err(ConfigError::ValidationError(
                "completion.retrieval_limit must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            completion: CompletionDefaults::default(),
            backend: BackendConfig::default(),
            retrieval: RetrievalConfig::default(),
            usage: UsageConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.completion.model, "gpt-3.5-turbo");
        assert_eq!(config.completion.retrieval_limit, 5);
        assert_eq!(config.gateway.port, 8100);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.completion.model, config.completion.model);
        assert_eq!(parsed.retrieval.index_url, config.retrieval.index_url);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            completion: CompletionDefaults {
                temperature: 5.0,
                ..CompletionDefaults::default()
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_retrieval_limit_rejected() {
        let config = AppConfig {
            completion: CompletionDefaults {
                retrieval_limit: 0,
                ..CompletionDefaults::default()
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().completion.max_tokens, 2048);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[completion]
model = "gpt-4o"

[retrieval]
index_url = "http://chroma.internal:8000"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.completion.model, "gpt-4o");
        // Unspecified fields fall back to defaults
        assert!((config.completion.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.retrieval.index_url, "http://chroma.internal:8000");
        assert_eq!(config.usage.base_url, "http://localhost:8080/api");
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            usage: UsageConfig {
                service_token: Some("svc-secret".into()),
                ..UsageConfig::default()
            },
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("svc-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[gateway]\nport = 9000\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.gateway.port, 9000);
    }

    #[test]
    fn malformed_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }
}
