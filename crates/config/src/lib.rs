//! Configuration loading, validation, and management for sitewright.
//!
//! Loads configuration from `~/.sitewright/config.toml` (or an explicit
//! path) with environment variable overrides. Validates all settings at
//! startup. Only the adapters (CLI, gateway) read this; the agent itself is
//! handed plain values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Text used when the system prompt file cannot be read.
pub const FALLBACK_SYSTEM_PROMPT: &str =
    "You are a website builder agent. The system prompt file was not found.";

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model backend: "ollama" or "openai"
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the model service
    #[serde(default = "default_model_host")]
    pub host: String,

    /// API key for OpenAI-compatible endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_model() -> String {
    "qwen2.5-coder:14b-instruct".into()
}
fn default_model_host() -> String {
    "http://localhost:11434".into()
}
fn default_temperature() -> f32 {
    0.7
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("host", &self.host)
            .field("api_key", &redact(&self.api_key))
            .field("temperature", &self.temperature)
            .field("agent", &self.agent)
            .field("workspace", &self.workspace)
            .field("retrieval", &self.retrieval)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model round trips per request
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// General content chunks fetched per turn
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,

    /// Inline system prompt; wins over `system_prompt_path`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Relative to the project root
    #[serde(default = "default_system_prompt_path")]
    pub system_prompt_path: String,
}

fn default_max_iterations() -> usize {
    12
}
fn default_retrieval_k() -> usize {
    20
}
fn default_system_prompt_path() -> String {
    "prompts/system_prompt.txt".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            retrieval_k: default_retrieval_k(),
            system_prompt: None,
            system_prompt_path: default_system_prompt_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// The sandbox root every tool path resolves against
    #[serde(default = "default_project_root")]
    pub project_root: String,

    /// Subtree generated files are anchored under
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Where bundled third-party assets live
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

fn default_project_root() -> String {
    ".".into()
}
fn default_output_dir() -> String {
    "site".into()
}
fn default_static_dir() -> String {
    "static".into()
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            project_root: default_project_root(),
            output_dir: default_output_dir(),
            static_dir: default_static_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// "index" or "none"
    #[serde(default = "default_retrieval_backend")]
    pub backend: String,

    /// Chunk file, relative to the project root
    #[serde(default = "default_index_path")]
    pub index_path: String,

    #[serde(default = "default_template_candidates")]
    pub template_candidates: usize,

    #[serde(default = "default_style_samples")]
    pub style_samples: usize,

    #[serde(default = "default_style_sample_chars")]
    pub style_sample_chars: usize,

    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
}

fn default_retrieval_backend() -> String {
    "index".into()
}
fn default_index_path() -> String {
    "data/chunks/templates.json".into()
}
fn default_template_candidates() -> usize {
    3
}
fn default_style_samples() -> usize {
    3
}
fn default_style_sample_chars() -> usize {
    420
}
fn default_chunk_chars() -> usize {
    600
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            backend: default_retrieval_backend(),
            index_path: default_index_path(),
            template_candidates: default_template_candidates(),
            style_samples: default_style_samples(),
            style_sample_chars: default_style_sample_chars(),
            chunk_chars: default_chunk_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.sitewright/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_overrides(&Self::config_path())
    }

    /// Load from `path`, apply environment overrides, and validate.
    pub fn load_with_overrides(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
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

    /// Environment overrides (highest priority):
    /// - `SITEWRIGHT_PROVIDER`, `SITEWRIGHT_MODEL`
    /// - `OLLAMA_HOST`
    /// - `SITEWRIGHT_API_KEY`, then `OPENAI_API_KEY`
    /// - `SITEWRIGHT_PROJECT_ROOT`
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(provider) = var("SITEWRIGHT_PROVIDER") {
            self.provider = provider;
        }
        if let Some(model) = var("SITEWRIGHT_MODEL") {
            self.model = model;
        }
        if let Some(host) = var("OLLAMA_HOST") {
            self.host = host;
        }
        if let Some(key) = var("SITEWRIGHT_API_KEY").or_else(|| var("OPENAI_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(root) = var("SITEWRIGHT_PROJECT_ROOT") {
            self.workspace.project_root = root;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".sitewright")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if !matches!(self.provider.as_str(), "ollama" | "openai") {
            return Err(ConfigError::ValidationError(format!(
                "unknown provider '{}' (expected 'ollama' or 'openai')",
                self.provider
            )));
        }

        if !matches!(self.retrieval.backend.as_str(), "index" | "none") {
            return Err(ConfigError::ValidationError(format!(
                "unknown retrieval backend '{}' (expected 'index' or 'none')",
                self.retrieval.backend
            )));
        }

        let out = Path::new(&self.workspace.output_dir);
        if self.workspace.output_dir.is_empty()
            || out.is_absolute()
            || out.components().count() != 1
        {
            return Err(ConfigError::ValidationError(
                "workspace.output_dir must be a single relative directory name".into(),
            ));
        }

        Ok(())
    }

    /// The sandbox root.
    pub fn project_root(&self) -> PathBuf {
        PathBuf::from(&self.workspace.project_root)
    }

    /// Resolve a config-relative path against the project root.
    pub fn project_path(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.project_root().join(p)
        }
    }

    /// The system prompt: inline override, else the prompt file, else a
    /// fixed fallback.
    pub fn load_system_prompt(&self) -> String {
        if let Some(prompt) = &self.agent.system_prompt {
            return prompt.clone();
        }
        let path = self.project_path(&self.agent.system_prompt_path);
        match std::fs::read_to_string(&path) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "System prompt unavailable, using fallback"
                );
                FALLBACK_SYSTEM_PROMPT.to_string()
            }
        }
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            host: default_model_host(),
            api_key: None,
            temperature: default_temperature(),
            agent: AgentConfig::default(),
            workspace: WorkspaceConfig::default(),
            retrieval: RetrievalConfig::default(),
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
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "qwen2.5-coder:14b-instruct");
        assert_eq!(config.host, "http://localhost:11434");
        assert_eq!(config.agent.max_iterations, 12);
        assert_eq!(config.agent.retrieval_k, 20);
        assert_eq!(config.workspace.output_dir, "site");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.retrieval.style_sample_chars, 420);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            model = "llama3.1:8b"

            [agent]
            max_iterations = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.model, "llama3.1:8b");
        assert_eq!(config.agent.max_iterations, 4);
        assert_eq!(config.agent.retrieval_k, 20);
        assert_eq!(config.retrieval.chunk_chars, 600);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_iterations_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn nested_output_dir_rejected() {
        let mut config = AppConfig::default();
        config.workspace.output_dir = "../site".into();
        assert!(config.validate().is_err());
        config.workspace.output_dir = "public".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_provider_rejected() {
        let config = AppConfig {
            provider: "carrier-pigeon".into(),
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.provider, "ollama");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = [").unwrap();
        assert!(matches!(AppConfig::load_from(&path), Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("SITEWRIGHT_MODEL", "qwen2.5-coder:7b"),
            ("OLLAMA_HOST", "http://gpu-box:11434"),
            ("OPENAI_API_KEY", "sk-fallback"),
            ("SITEWRIGHT_PROJECT_ROOT", "/srv/sites"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.model, "qwen2.5-coder:7b");
        assert_eq!(config.host, "http://gpu-box:11434");
        assert_eq!(config.api_key.as_deref(), Some("sk-fallback"));
        assert_eq!(config.project_root(), PathBuf::from("/srv/sites"));
        assert_eq!(config.provider, "ollama");
    }

    #[test]
    fn api_key_is_redacted_in_debug() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn system_prompt_prefers_inline_then_file_then_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.workspace.project_root = dir.path().to_string_lossy().into_owned();
        assert_eq!(config.load_system_prompt(), FALLBACK_SYSTEM_PROMPT);

        std::fs::create_dir_all(dir.path().join("prompts")).unwrap();
        std::fs::write(dir.path().join("prompts/system_prompt.txt"), "Build sites.").unwrap();
        assert_eq!(config.load_system_prompt(), "Build sites.");

        config.agent.system_prompt = Some("Inline.".into());
        assert_eq!(config.load_system_prompt(), "Inline.");
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("qwen2.5-coder:14b-instruct"));
        assert!(toml_str.contains("[retrieval]"));
    }
}
