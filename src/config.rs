//! Configuration file handling for emotion-journal.
//!
//! Loads configuration from `<config dir>/emotion-journal/config.toml` or a
//! custom path.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::camera::Facing;
use crate::detector::DEFAULT_MODELS;
use crate::store::{UserId, DEFAULT_API_URL};

/// Configuration file structure for emotion-journal.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub user: UserConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Inference service URL; falls back to `api.base_url`
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_models")]
    pub models: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            models: default_models(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct CameraConfig {
    #[serde(default)]
    pub facing: Facing,
    /// Image file served as the front camera
    #[serde(default)]
    pub user_frame: Option<PathBuf>,
    /// Image file served as the rear camera
    #[serde(default)]
    pub environment_frame: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct UserConfig {
    #[serde(default)]
    pub id: Option<UserId>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_models() -> Vec<String> {
    DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
                path: path.clone(),
                source: e,
            })?;
            Self::parse(&content).map_err(|e| ConfigError::ParseError { path, source: e })
        } else {
            Ok(Config::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// URL of the inference service.
    pub fn detector_url(&self) -> &str {
        self.detector
            .base_url
            .as_deref()
            .unwrap_or(&self.api.base_url)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("emotion-journal").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/emotion-journal/config.toml")
        })
}

/// Contents written by `config init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# emotion-journal configuration

[api]
# Journal backend
base_url = "http://localhost:8000"

[detector]
# Inference service (defaults to api.base_url)
# base_url = "http://localhost:8001"
models = ["tiny_face_detector", "face_expression_net"]

[camera]
# user (front) or environment (rear)
facing = "user"
# Image files served as camera frames
# user_frame = "/tmp/emotion-journal/front.jpg"
# environment_frame = "/tmp/emotion-journal/rear.jpg"

[user]
# Signed-in user id
# id = 1

[logging]
# Used when RUST_LOG is not set
level = "info"
"#;
