//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::client::ClientConfig;
use crate::export::{ExportProfile, GistFormat, HeaderMode};
use crate::session::DEFAULT_BEARER_TTL_SECS;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000/api/".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            request_timeout_ms: self.request_timeout_secs.saturating_mul(1000),
        }
    }
}

/// Credential lifetime and persistence
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_bearer_ttl")]
    pub bearer_ttl_secs: u64,

    #[serde(default = "default_credentials_file")]
    pub credentials_file: String,
}

fn default_bearer_ttl() -> u64 {
    DEFAULT_BEARER_TTL_SECS
}

fn default_credentials_file() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("demandboard").join("session.json").to_string_lossy().to_string())
        .unwrap_or_else(|| "./demandboard_session.json".to_string())
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bearer_ttl_secs: default_bearer_ttl(),
            credentials_file: default_credentials_file(),
        }
    }
}

/// Export defaults
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default)]
    pub profile: GistFormat,

    #[serde(default)]
    pub header_mode: HeaderMode,

    #[serde(default = "default_list_separator")]
    pub list_separator: String,
}

fn default_output_dir() -> String {
    "./exports".to_string()
}

fn default_list_separator() -> String {
    "; ".to_string()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            profile: GistFormat::default(),
            header_mode: HeaderMode::default(),
            list_separator: default_list_separator(),
        }
    }
}

impl ExportConfig {
    /// Export profile described by this configuration
    pub fn export_profile(&self) -> ExportProfile {
        let profile = match self.profile {
            GistFormat::Compact => ExportProfile::compact(),
            GistFormat::Detailed => ExportProfile::detailed(),
        };

        profile
            .list_separator(self.list_separator.clone())
            .header_mode(self.header_mode)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("demandboard").join("config.toml")),
            Some(PathBuf::from("./demandboard.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // API overrides
        if let Some(url) = var("DEMANDBOARD_API_URL") {
            self.api.base_url = url;
        }
        if let Some(timeout) = var("DEMANDBOARD_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.api.request_timeout_secs = secs;
            }
        }

        // Session overrides
        if let Some(path) = var("DEMANDBOARD_CREDENTIALS_FILE") {
            self.session.credentials_file = path;
        }

        // Export overrides
        if let Some(dir) = var("DEMANDBOARD_EXPORT_DIR") {
            self.export.output_dir = dir;
        }

        // Logging overrides
        if let Some(level) = var("DEMANDBOARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("DEMANDBOARD_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Demandboard Configuration
#
# Environment variables override these settings:
# - DEMANDBOARD_API_URL
# - DEMANDBOARD_TIMEOUT_SECS
# - DEMANDBOARD_CREDENTIALS_FILE
# - DEMANDBOARD_EXPORT_DIR
# - DEMANDBOARD_LOG_LEVEL
# - DEMANDBOARD_LOG_FORMAT

[api]
# Base URL of the demand/procurement API
base_url = "http://localhost:8000/api/"

# Request timeout in seconds
request_timeout_secs = 30

[session]
# Bearer credential lifetime when the server does not send one (seconds)
bearer_ttl_secs = 900

# Where the renewal credential is kept between runs
# credentials_file = "~/.local/share/demandboard/session.json"

[export]
# Directory for exported CSV files
output_dir = "./exports"

# Plant summary style: compact or detailed
profile = "compact"

# CSV header: first_row (keys of the first row) or union (all keys)
header_mode = "first_row"

# Separator between plants in gist columns
list_separator = "; "

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for scripting)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8000/api/");
        assert_eq!(config.api.client_config().request_timeout_ms, 30_000);
        assert_eq!(config.session.bearer_ttl_secs, 900);
        assert_eq!(config.export.profile, GistFormat::Compact);
        assert_eq!(config.export.header_mode, HeaderMode::FirstRow);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_generated_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.export.list_separator, "; ");
    }

    #[test]
    fn test_partial_file() {
        let config = Config::parse(
            r#"
[export]
profile = "detailed"
header_mode = "union"
"#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, default_base_url());
        let profile = config.export.export_profile();
        assert_eq!(profile.gist, GistFormat::Detailed);
        assert_eq!(profile.header_mode, HeaderMode::Union);
    }

    #[test]
    fn test_invalid_profile_is_rejected() {
        assert!(Config::parse("[export]\nprofile = \"wide\"\n").is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DEMANDBOARD_API_URL", "https://grid.example/api/"),
            ("DEMANDBOARD_TIMEOUT_SECS", "5"),
            ("DEMANDBOARD_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "https://grid.example/api/");
        assert_eq!(config.api.request_timeout_secs, 5);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_huge_timeout_saturates() {
        let mut config = Config::default();
        config.apply_overrides(|key| {
            (key == "DEMANDBOARD_TIMEOUT_SECS").then(|| u64::MAX.to_string())
        });

        assert_eq!(config.api.request_timeout_secs, u64::MAX);
        assert_eq!(config.api.client_config().request_timeout_ms, u64::MAX);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/demandboard.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
