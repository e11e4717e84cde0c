//! Service configuration loaded once at startup.
//!
//! Sources, lowest precedence first:
//! - built-in defaults
//! - optional `config.{toml,yaml,json}` in the working directory
//! - `PAGESIFT__*` environment variables (`__` separates nesting levels)
//! - the conventional `OPENAI_API_KEY` and `PORT` variables
//!
//! A `.env` file, if present, is loaded into the environment first.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ServiceError, ServiceResult};

/// Complete service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Chat-completion service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_openai_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Unset means the HTTP client never gives up on its own.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl OpenAiConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_url(),
            model: default_model(),
            request_timeout_secs: None,
        }
    }
}

/// Where uploaded documents are held while a request is in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
}

/// Upload storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            upload_dir: default_upload_dir(),
        }
    }
}

/// Size limits
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line output
    #[default]
    Compact,
    /// One JSON object per event, for log shippers
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives. `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            openai: OpenAiConfig::default(),
            storage: StorageConfig::default(),
            limits: LimitsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `.env`, the optional config file, and the environment.
    pub fn load() -> ServiceResult<Self> {
        // A missing .env is the normal case outside development
        let _ = dotenvy::dotenv();

        let port = match std::env::var("PORT") {
            Ok(raw) => Some(raw.parse::<u16>().map_err(|e| ServiceError::Config {
                message: format!("Invalid PORT {:?}: {}", raw, e),
            })?),
            Err(_) => None,
        };

        Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("PAGESIFT")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("openai.api_key", std::env::var("OPENAI_API_KEY").ok())
            .and_then(|builder| builder.set_override_option("server.port", port.map(i64::from)))
            .and_then(|builder| builder.build())
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to build config: {}", e),
            })?
            .try_deserialize()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to deserialize config: {}", e),
            })
    }

    /// The API key for the chat-completion service, or a configuration error.
    pub fn require_api_key(&self) -> ServiceResult<&str> {
        self.openai
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ServiceError::Config {
                message: "OPENAI_API_KEY is not set".to_string(),
            })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// ==================== Default Value Functions ====================

fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_log_filter() -> String {
    "pagesift_service=info,tower_http=info".to_string()
}
