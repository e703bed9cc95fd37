//! Proxy configuration and application paths
//!
//! The configuration lives in a JSON file with `api_settings` and
//! `cache_settings` sections. It is read once at startup into a
//! [`ProxyConfig`] that the rest of the crate borrows.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file inside the config directory
pub const CONFIG_FILE_NAME: &str = "proxy_config.json";

/// Environment variable consulted when the file has no API key
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-opus-20240229";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_CACHE_DURATION: u64 = 3600;

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or written
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not valid JSON or does not match the expected shape
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The settings could not be encoded as JSON
    #[error("failed to serialize config for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A setting has an unusable value
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for the upstream API
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiSettings {
    api_key: String,
    base_url: String,
    #[serde(default = "default_model")]
    model: String,
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
}

/// Settings for the response cache
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheSettings {
    enable_cache: bool,
    /// Time-to-live in seconds
    cache_duration: u64,
}

/// On-disk shape of the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    api_settings: ApiSettings,
    cache_settings: CacheSettings,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

/// Runtime configuration, read-only after loading
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Key sent in the `x-api-key` header
    pub api_key: String,
    /// Scheme and host of the upstream API, e.g. `https://api.anthropic.com`
    pub base_url: String,
    /// Whether responses are served from and written to the cache
    pub cache_enabled: bool,
    /// Cache entry lifetime in seconds
    pub ttl_seconds: u64,
    /// Model identifier sent with every request
    pub model: String,
    /// Token limit sent with every request
    pub max_tokens: u32,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_enabled: true,
            ttl_seconds: DEFAULT_CACHE_DURATION,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("cache_enabled", &self.cache_enabled)
            .field("ttl_seconds", &self.ttl_seconds)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl From<ConfigFile> for ProxyConfig {
    fn from(file: ConfigFile) -> Self {
        Self {
            api_key: file.api_settings.api_key,
            base_url: file.api_settings.base_url,
            cache_enabled: file.cache_settings.enable_cache,
            ttl_seconds: file.cache_settings.cache_duration,
            model: file.api_settings.model,
            max_tokens: file.api_settings.max_tokens,
        }
    }
}

impl From<&ProxyConfig> for ConfigFile {
    fn from(config: &ProxyConfig) -> Self {
        Self {
            api_settings: ApiSettings {
                api_key: config.api_key.clone(),
                base_url: config.base_url.clone(),
                model: config.model.clone(),
                max_tokens: config.max_tokens,
            },
            cache_settings: CacheSettings {
                enable_cache: config.cache_enabled,
                cache_duration: config.ttl_seconds,
            },
        }
    }
}

impl ProxyConfig {
    /// Reads and validates the configuration file at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from(file);
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration, writing the defaults first if `path` does not exist
    pub fn load_or_init(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            Self::default().save(path)?;
            tracing::info!(path = %path.display(), "wrote default configuration");
        }
        Self::load(path)
    }

    /// Writes this configuration as pretty-printed JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source: io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(&ConfigFile::from(self)).map_err(|source| {
            ConfigError::Serialize {
                path: path.to_path_buf(),
                source,
            }
        })?;
        fs::write(path, json).map_err(io_err)
    }

    /// Checks that the settings can produce a working client
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "base_url must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".to_string()));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "max_tokens must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Fills an empty API key from `ANTHROPIC_API_KEY`
    pub fn with_env_api_key(self) -> Self {
        self.with_api_key_fallback(std::env::var(API_KEY_ENV).ok())
    }

    /// Fills an empty API key from `fallback`, if given
    pub fn with_api_key_fallback(mut self, fallback: Option<String>) -> Self {
        if self.api_key.is_empty() {
            if let Some(key) = fallback.filter(|k| !k.is_empty()) {
                self.api_key = key;
            }
        }
        self
    }
}

/// Directories used by the proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Holds `proxy_config.json`
    pub config_dir: PathBuf,
    /// Holds cached responses
    pub cache_dir: PathBuf,
    /// Holds daily log files
    pub log_dir: PathBuf,
}

impl AppPaths {
    /// Uses the platform's XDG-style directories
    ///
    /// Returns `None` if no home directory can be determined.
    pub fn from_project_dirs() -> Option<Self> {
        let dirs = ProjectDirs::from("", "", "localproxy")?;
        Some(Self {
            config_dir: dirs.config_dir().to_path_buf(),
            cache_dir: dirs.cache_dir().to_path_buf(),
            log_dir: dirs.data_local_dir().join("logs"),
        })
    }

    /// Places every directory under a single root
    pub fn under(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
            cache_dir: root.join("cache"),
            log_dir: root.join("logs"),
        }
    }

    /// Path of the configuration file
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Creates all directories if missing
    pub fn ensure(&self) -> io::Result<()> {
        for dir in [&self.config_dir, &self.cache_dir, &self.log_dir] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
