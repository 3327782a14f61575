//! Configuration loading, validation, and management for AIKA.
//!
//! Loads configuration from `~/.aika/config.toml` with environment variable
//! overrides. Validates all settings at startup. Every field is optional in
//! the file; missing values fall back to sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.aika/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Pretty terminal rendering on/off
    #[serde(default = "default_true")]
    pub pretty: bool,

    /// Append a Sources section to final answers automatically
    #[serde(default = "default_true")]
    pub always_show_sources: bool,

    /// Maximum number of source URLs collected per user turn
    #[serde(default = "default_sources_limit")]
    pub sources_limit: usize,

    /// Maximum web_search calls per user turn
    #[serde(default = "default_web_search_limit")]
    pub web_search_limit: u32,

    /// Maximum fetch_url calls per user turn
    #[serde(default = "default_fetch_url_limit")]
    pub fetch_url_limit: u32,

    /// Maximum tool-executing iterations per user turn
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
}

fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn default_model() -> String {
    "openai/gpt-oss-120b".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_sources_limit() -> usize {
    6
}
fn default_web_search_limit() -> u32 {
    2
}
fn default_fetch_url_limit() -> u32 {
    3
}
fn default_max_steps() -> u32 {
    6
}
fn default_true() -> bool {
    true
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
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("pretty", &self.pretty)
            .field("always_show_sources", &self.always_show_sources)
            .field("sources_limit", &self.sources_limit)
            .field("web_search_limit", &self.web_search_limit)
            .field("fetch_url_limit", &self.fetch_url_limit)
            .field("max_steps", &self.max_steps)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.aika/config.toml).
    ///
    /// Environment variables always win over the file:
    /// - `AIKA_API_KEY` / `GROQ_API_KEY` / `OPENAI_API_KEY` (in that order)
    /// - `AIKA_MODEL`, `AIKA_BASE_URL`
    /// - `AIKA_PRETTY`, `AIKA_ALWAYS_SHOW_SOURCES` ("0" disables)
    /// - `AIKA_SOURCES_LIMIT`, `AIKA_WEB_SEARCH_LIMIT`, `AIKA_FETCH_URL_LIMIT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, without env overrides.
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

    fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("AIKA_API_KEY")
                .ok()
                .or_else(|| std::env::var("GROQ_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("AIKA_MODEL") {
            self.model = model;
        }
        if let Ok(url) = std::env::var("AIKA_BASE_URL") {
            self.base_url = url;
        }
        if let Ok(v) = std::env::var("AIKA_PRETTY") {
            self.pretty = v != "0";
        }
        if let Ok(v) = std::env::var("AIKA_ALWAYS_SHOW_SOURCES") {
            self.always_show_sources = v != "0";
        }
        if let Some(v) = env_parse("AIKA_SOURCES_LIMIT") {
            self.sources_limit = v;
        }
        if let Some(v) = env_parse("AIKA_WEB_SEARCH_LIMIT") {
            self.web_search_limit = v;
        }
        if let Some(v) = env_parse("AIKA_FETCH_URL_LIMIT") {
            self.fetch_url_limit = v;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".aika")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.sources_limit == 0 {
            return Err(ConfigError::ValidationError(
                "sources_limit must be at least 1".into(),
            ));
        }
        if self.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "max_steps must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `onboard` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            pretty: true,
            always_show_sources: true,
            sources_limit: default_sources_limit(),
            web_search_limit: default_web_search_limit(),
            fetch_url_limit: default_fetch_url_limit(),
            max_steps: default_max_steps(),
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
        assert_eq!(config.model, "openai/gpt-oss-120b");
        assert_eq!(config.sources_limit, 6);
        assert_eq!(config.web_search_limit, 2);
        assert_eq!(config.fetch_url_limit, 3);
        assert!(config.always_show_sources);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.sources_limit, config.sources_limit);
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
    fn zero_sources_limit_rejected() {
        let config = AppConfig {
            sources_limit: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().max_steps, 6);
    }

    #[test]
    fn partial_config_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = \"llama-3.3-70b\"\nweb_search_limit = 4\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model, "llama-3.3-70b");
        assert_eq!(config.web_search_limit, 4);
        assert_eq!(config.fetch_url_limit, 3);
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("gsk_super_secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("gsk_super_secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-oss-120b"));
        assert!(toml_str.contains("sources_limit"));
    }
}
