//! Configuration management for PdfChat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{PdfChatError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for PdfChat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Document backend settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Identity provider settings
    #[serde(default)]
    pub auth: AuthConfig,

    /// Chat transcript settings
    #[serde(default)]
    pub chat: ChatConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Document backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend; `/api/v1/...` paths are joined onto it
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// Per-request timeout. Uploads include server-side PDF processing, so
    /// this is generous.
    #[serde(default = "default_api_timeout")]
    pub timeout_seconds: u64,
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_api_timeout() -> u64 {
    120
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_seconds: default_api_timeout(),
        }
    }
}

/// Identity provider (GoTrue / Supabase Auth) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Project URL; `/auth/v1/...` paths are joined onto it
    #[serde(default = "default_auth_url")]
    pub url: String,

    /// Public anonymous key sent as the `apikey` header
    #[serde(default)]
    pub anon_key: String,
}

fn default_auth_url() -> String {
    "http://127.0.0.1:54321".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            url: default_auth_url(),
            anon_key: String::new(),
        }
    }
}

/// Chat transcript configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Placeholder shown while an answer is pending
    #[serde(default = "default_thinking_text")]
    pub thinking_text: String,
}

fn default_thinking_text() -> String {
    "Thinking...".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            thinking_text: default_thinking_text(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json_format: bool,
}

fn default_log_level() -> String {
    "pdfchat=warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let (config, warnings) = Self::load_with_warnings(path, cli)?;
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }
        Ok(config)
    }

    /// Load configuration and return the warnings instead of logging them
    ///
    /// The binary installs its tracing subscriber from the loaded logging
    /// settings, so it replays these warnings once logging is up.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`]
    pub fn load_with_warnings(
        path: &str,
        cli: &crate::cli::Cli,
    ) -> Result<(Self, Vec<String>)> {
        let mut warnings = Vec::new();
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            warnings.push(format!("Config file not found at {}, using defaults", path));
            Self::default()
        };

        config.apply_env_vars(&mut warnings);
        config.apply_cli_overrides(cli);

        Ok((config, warnings))
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PdfChatError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| PdfChatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self, warnings: &mut Vec<String>) {
        if let Ok(base_url) = std::env::var("PDFCHAT_API_BASE_URL") {
            tracing::debug!(base_url = %base_url, "Env override: PDFCHAT_API_BASE_URL");
            self.api.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("PDFCHAT_API_TIMEOUT_SECONDS") {
            match timeout.parse::<u64>() {
                Ok(v) => self.api.timeout_seconds = v,
                Err(_) => {
                    warnings.push(format!("Invalid PDFCHAT_API_TIMEOUT_SECONDS: {}", timeout))
                }
            }
        }

        if let Ok(url) = std::env::var("PDFCHAT_AUTH_URL") {
            tracing::debug!(url = %url, "Env override: PDFCHAT_AUTH_URL");
            self.auth.url = url;
        }

        // Value is a credential; do not echo it.
        if let Ok(anon_key) = std::env::var("PDFCHAT_AUTH_ANON_KEY") {
            tracing::debug!("Env override: PDFCHAT_AUTH_ANON_KEY");
            self.auth.anon_key = anon_key;
        }

        if let Ok(level) = std::env::var("PDFCHAT_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json_logs) = std::env::var("PDFCHAT_JSON_LOGS") {
            match json_logs.parse::<bool>() {
                Ok(v) => self.logging.json_format = v,
                Err(_) => {
                    warnings.push(format!("Invalid value for PDFCHAT_JSON_LOGS: {}", json_logs))
                }
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(api_url) = &cli.api_url {
            self.api.base_url = api_url.clone();
        }

        if cli.verbose {
            self.logging.level = "pdfchat=debug".to_string();
        }
    }

    /// Validate the configuration
    ///
    /// Ensures URLs are absolute http(s) URLs and numeric settings are in
    /// range. The anon key is checked only when the identity provider is
    /// actually constructed, so `pdfchat health` works without one.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        validate_http_url("api.base_url", &self.api.base_url)?;
        validate_http_url("auth.url", &self.auth.url)?;

        if self.api.timeout_seconds == 0 {
            return Err(PdfChatError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.thinking_text.trim().is_empty() {
            return Err(
                PdfChatError::Config("chat.thinking_text cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| PdfChatError::Config(format!("{} is not a valid URL ({}): {}", field, e, value)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(PdfChatError::Config(format!(
            "{} must use http or https, got: {}",
            field, other
        ))
        .into()),
    }
}
