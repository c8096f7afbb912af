//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Media (blob storage) settings.
    #[serde(default)]
    pub media: MediaConfig,

    /// External provider endpoints.
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Security settings.
    #[serde(default)]
    pub security: SecurityConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Busy timeout for SQLite connections, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Blob storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Directory audio blobs are written to (served at /media).
    #[serde(default = "default_media_dir")]
    pub dir: String,
}

/// External provider endpoints and model selection.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_text_base_url")]
    pub text_base_url: String,

    #[serde(default = "default_speech_base_url")]
    pub speech_base_url: String,

    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Speech synthesis timeout in seconds (synthesis runs minutes).
    #[serde(default = "default_synthesis_timeout_secs")]
    pub synthesis_timeout_secs: u64,
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Process-wide secret the credential cipher key is derived from.
    #[serde(default = "default_encryption_secret")]
    pub encryption_secret: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "lullaby_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    4000
}

fn default_db_path() -> String {
    "lullaby.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_media_dir() -> String {
    "media".to_string()
}

fn default_text_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_speech_base_url() -> String {
    "https://api.hume.ai".to_string()
}

fn default_text_model() -> String {
    "gpt-4o".to_string()
}

fn default_synthesis_timeout_secs() -> u64 {
    300
}

/// Development-only default. Startup logs a loud warning when it is used.
pub const DEV_ENCRYPTION_SECRET: &str = "lullaby-dev-secret";

fn default_encryption_secret() -> String {
    DEV_ENCRYPTION_SECRET.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            dir: default_media_dir(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            text_base_url: default_text_base_url(),
            speech_base_url: default_speech_base_url(),
            text_model: default_text_model(),
            synthesis_timeout_secs: default_synthesis_timeout_secs(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            encryption_secret: default_encryption_secret(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `LULLABY_HOST` overrides `server.host`
/// - `LULLABY_PORT` overrides `server.port`
/// - `LULLABY_DB_PATH` overrides `database.path`
/// - `LULLABY_MEDIA_DIR` overrides `media.dir`
/// - `LULLABY_TEXT_BASE_URL` overrides `providers.text_base_url`
/// - `LULLABY_SPEECH_BASE_URL` overrides `providers.speech_base_url`
/// - `LULLABY_ENCRYPTION_SECRET` overrides `security.encryption_secret`
/// - `LULLABY_LOG_LEVEL` overrides `logging.level`
/// - `LULLABY_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("LULLABY_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("LULLABY_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(db_path) = std::env::var("LULLABY_DB_PATH") {
        config.database.path = db_path;
    }
    if let Ok(media_dir) = std::env::var("LULLABY_MEDIA_DIR") {
        config.media.dir = media_dir;
    }
    if let Ok(url) = std::env::var("LULLABY_TEXT_BASE_URL") {
        config.providers.text_base_url = url;
    }
    if let Ok(url) = std::env::var("LULLABY_SPEECH_BASE_URL") {
        config.providers.speech_base_url = url;
    }
    if let Ok(secret) = std::env::var("LULLABY_ENCRYPTION_SECRET") {
        config.security.encryption_secret = secret;
    }
    if let Ok(level) = std::env::var("LULLABY_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("LULLABY_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}
