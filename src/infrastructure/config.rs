//! Configuration infrastructure
//!
//! Settings are layered with the `config` crate:
//! 1. Built-in defaults (`AppConfig::default()`)
//! 2. Optional files: `config/default.*`, the user config dir, or an explicit path
//! 3. Environment variables, e.g. `ASIN_CATEGORIZER__FETCHER__REQUEST_DELAY_MS=500`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::infrastructure::category_repository::SQLITE_MAX_VARIABLES;

pub const ENV_PREFIX: &str = "ASIN_CATEGORIZER";
pub const LOCAL_CONFIG_FILE: &str = "config/default";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    FileLoad {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub fetcher: FetcherConfig,
    pub jobs: JobsConfig,
    pub logging: LoggingConfig,
}

/// Category cache storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    pub url: String,

    pub max_connections: u32,

    /// Maximum identifiers bound into one `IN (...)` lookup
    pub lookup_batch_size: usize,

    pub busy_timeout_seconds: u64,
}

/// Product page fetch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Product pages are fetched from `{base_url}/dp/{ASIN}`
    pub base_url: String,

    pub user_agent: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// Minimum delay between two consecutive fetches of one job
    pub request_delay_ms: u64,

    /// Process-wide ceiling shared by all jobs
    pub max_requests_per_second: u32,
}

/// Job runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Per-job broadcast buffer; slower subscribers skip older events
    pub event_buffer_size: usize,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted file logs
    pub json_format: bool,

    pub console_output: bool,

    pub file_output: bool,

    /// Directory for log files; defaults to `logs/` next to the executable
    pub log_dir: Option<PathBuf>,

    pub file_name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:data/asin_categories.db".to_string(),
            max_connections: 10,
            lookup_batch_size: 500,
            busy_timeout_seconds: 5,
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.amazon.com".to_string(),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.114 Safari/537.36".to_string(),
            timeout_seconds: 10,
            request_delay_ms: 2000,
            max_requests_per_second: 5,
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 256,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            log_dir: None,
            file_name: "asin-categorizer.log".to_string(),
        }
    }
}

impl FetcherConfig {
    #[must_use]
    pub const fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl DatabaseConfig {
    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_seconds)
    }
}

impl AppConfig {
    /// Per-user config file, e.g. `~/.config/asin-categorizer/config.toml`
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("asin-categorizer").join("config.toml"))
    }

    /// Loads the layered configuration
    ///
    /// An explicit `path` must exist; the implicit locations are optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?);

        builder = match path {
            Some(path) => {
                debug!("Loading configuration from {:?}", path);
                builder.add_source(config::File::from(path))
            }
            None => {
                let mut builder =
                    builder.add_source(config::File::with_name(LOCAL_CONFIG_FILE).required(false));
                if let Some(user_path) = Self::user_config_path() {
                    builder = builder.add_source(config::File::from(user_path).required(false));
                }
                builder
            }
        };

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 설정값 유효성 검증
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "database.url must not be empty".to_string(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation {
                message: "database.max_connections must be greater than 0".to_string(),
            });
        }

        if self.database.lookup_batch_size == 0 {
            return Err(ConfigError::Validation {
                message: "database.lookup_batch_size must be greater than 0".to_string(),
            });
        }

        if self.database.lookup_batch_size > SQLITE_MAX_VARIABLES {
            return Err(ConfigError::Validation {
                message: format!(
                    "database.lookup_batch_size must not exceed {SQLITE_MAX_VARIABLES}"
                ),
            });
        }

        if url::Url::parse(&self.fetcher.base_url).is_err() {
            return Err(ConfigError::Validation {
                message: format!("fetcher.base_url '{}' is not a valid URL", self.fetcher.base_url),
            });
        }

        if self.fetcher.timeout_seconds == 0 {
            return Err(ConfigError::Validation {
                message: "fetcher.timeout_seconds must be greater than 0".to_string(),
            });
        }

        if self.fetcher.max_requests_per_second == 0 {
            return Err(ConfigError::Validation {
                message: "fetcher.max_requests_per_second must be greater than 0".to_string(),
            });
        }

        if self.jobs.event_buffer_size == 0 {
            return Err(ConfigError::Validation {
                message: "jobs.event_buffer_size must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}
