use crate::catalog::{CatalogDescriptor, CatalogError, CatalogRegistry};
use crate::paths::AppDirs;
use crate::tasks::TaskManagerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const CURRENT_CONFIG_VERSION: u32 = 1;

pub const DEFAULT_CATALOG_URL: &str = "https://marketplace.eclipse.org/";
pub const DEFAULT_CATALOG_LABEL: &str = "Eclipse Marketplace";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_config_version")]
    pub config_version: u32,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub marketplace: MarketplaceConfig,
    #[serde(default)]
    pub catalogs: Vec<CatalogEntry>,
    #[serde(default)]
    pub tasks: TasksConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            logging: LoggingConfig::default(),
            marketplace: MarketplaceConfig::default(),
            catalogs: Vec::new(),
            tasks: TasksConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    #[serde(default = "default_max_log_files")]
    pub max_log_files: usize,
    #[serde(default = "default_stdout_enabled")]
    pub stdout: bool,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_log_files: default_max_log_files(),
            stdout: default_stdout_enabled(),
            file_name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Connection settings for the marketplace REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    #[serde(default = "default_catalog_url")]
    pub default_catalog: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Access token for user-scoped calls. Prefer the OS keyring; this is a
    /// fallback for headless setups.
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            default_catalog: default_catalog_url(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            access_token: None,
        }
    }
}

impl MarketplaceConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// A catalog declared in `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub url: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Worker pool settings for parallel downloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            max_threads: default_max_threads(),
            poll_interval_ms: default_poll_interval_ms(),
            max_retries: default_max_retries(),
        }
    }
}

impl TasksConfig {
    pub fn task_manager_config(&self) -> TaskManagerConfig {
        TaskManagerConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_retries: self.max_retries,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("config validation failed: {0}")]
    Validation(ValidationError),
    #[error("failed to prepare configuration directories: {0}")]
    Directories(#[from] crate::paths::DirsError),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("unsupported config_version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("{0}")]
    Catalog(#[from] CatalogError),
    #[error("tasks.poll_interval_ms must be greater than zero")]
    ZeroPollInterval,
    #[error("tasks.max_retries must be greater than zero")]
    ZeroRetries,
}

impl Config {
    pub fn load_or_default(dirs: &AppDirs) -> Result<Self, ConfigError> {
        dirs.ensure_exists()?;
        let path = Self::config_path(dirs);
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        config.validate().map_err(ConfigError::Validation)?;
        Ok(config)
    }

    pub fn config_path(dirs: &AppDirs) -> PathBuf {
        dirs.config_dir().join("config.toml")
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.config_version != CURRENT_CONFIG_VERSION {
            return Err(ValidationError::UnsupportedVersion {
                found: self.config_version,
                expected: CURRENT_CONFIG_VERSION,
            });
        }
        if self.tasks.poll_interval_ms == 0 {
            return Err(ValidationError::ZeroPollInterval);
        }
        if self.tasks.max_retries == 0 {
            return Err(ValidationError::ZeroRetries);
        }
        self.catalog_registry()?;
        Ok(())
    }

    /// Registry of the configured catalogs. The default catalog is always
    /// present, first unless it is also listed explicitly.
    pub fn catalog_registry(&self) -> Result<CatalogRegistry, CatalogError> {
        let mut descriptors = Vec::with_capacity(self.catalogs.len() + 1);
        let default =
            CatalogDescriptor::new(&self.marketplace.default_catalog, DEFAULT_CATALOG_LABEL)?;
        for entry in &self.catalogs {
            let mut descriptor = CatalogDescriptor::new(&entry.url, entry.label.clone())?;
            descriptor.description = entry.description.clone();
            descriptors.push(descriptor);
        }
        if !descriptors.iter().any(|d| d.url == default.url) {
            descriptors.insert(0, default);
        }
        Ok(CatalogRegistry::new(descriptors))
    }
}

fn default_config_version() -> u32 {
    CURRENT_CONFIG_VERSION
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_max_log_files() -> usize {
    7
}

fn default_stdout_enabled() -> bool {
    true
}

fn default_catalog_url() -> String {
    DEFAULT_CATALOG_URL.to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    20
}

fn default_max_threads() -> usize {
    crate::tasks::MAX_THREADS
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    crate::tasks::DEFAULT_MAX_RETRIES
}
