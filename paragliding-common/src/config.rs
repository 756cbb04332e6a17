//! Configuration loading and root folder resolution
//!
//! Priority order for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Arguments and environment variables are parsed by the binary and handed in
//! as [`ConfigOverrides`]; this module owns the TOML layer and the defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "PARAGLIDING_CONFIG";

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "PARAGLIDING_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "paragliding.db";

/// How new track ids are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Persisted monotonically increasing counter ("1", "2", ...)
    #[default]
    Counter,
    /// Random UUIDv4
    Uuid,
}

impl std::str::FromStr for IdStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "counter" => Ok(IdStrategy::Counter),
            "uuid" => Ok(IdStrategy::Uuid),
            other => Err(Error::Config(format!("Unknown id strategy: {}", other))),
        }
    }
}

/// Service configuration as read from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// Folder holding the database (and anything else the service persists)
    pub root_folder: Option<PathBuf>,
    /// Explicit database file; overrides `root_folder`/paragliding.db
    pub database_path: Option<PathBuf>,
    /// Upper bound for fetching a track file
    pub fetch_timeout_ms: u64,
    /// Upper bound for a single webhook delivery
    pub webhook_timeout_ms: u64,
    /// Pending notifications held before new ones are dropped
    pub webhook_queue_capacity: usize,
    pub id_strategy: IdStrategy,
    /// Optional cap on the number of ids in one ticker page
    pub ticker_page_size: Option<usize>,
    /// Maximum time spent retrying a locked database
    pub db_lock_wait_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            root_folder: None,
            database_path: None,
            fetch_timeout_ms: 10_000,
            webhook_timeout_ms: 5_000,
            webhook_queue_capacity: 256,
            id_strategy: IdStrategy::Counter,
            ticker_page_size: None,
            db_lock_wait_ms: 5_000,
        }
    }
}

/// Values that take precedence over the TOML file (CLI flags / env vars)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub root_folder: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub id_strategy: Option<IdStrategy>,
    pub ticker_page_size: Option<usize>,
}

impl ServiceConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ServiceConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an optional TOML file.
    ///
    /// A missing file yields defaults with a warning; a malformed file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) => path,
            None => {
                info!("No config file found, using defaults");
                return Ok(Self::default());
            }
        };

        if !path.exists() {
            warn!("Config file not found: {} (using defaults)", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded config file: {}", path.display());
        Ok(config)
    }

    /// Apply CLI/env values on top of the file values
    pub fn apply(mut self, overrides: ConfigOverrides) -> Result<Self> {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(root) = overrides.root_folder {
            self.root_folder = Some(root);
        }
        if let Some(db) = overrides.database_path {
            self.database_path = Some(db);
        }
        if let Some(strategy) = overrides.id_strategy {
            self.id_strategy = strategy;
        }
        if let Some(size) = overrides.ticker_page_size {
            self.ticker_page_size = Some(size);
        }
        self.validate()?;
        Ok(self)
    }

    /// Resolved root folder (configured value or OS default)
    pub fn root_folder(&self) -> PathBuf {
        self.root_folder.clone().unwrap_or_else(get_default_root_folder)
    }

    /// Resolved database file path
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.root_folder().join(DATABASE_FILE_NAME))
    }

    fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }
        if self.webhook_queue_capacity == 0 {
            return Err(Error::Config("webhook_queue_capacity must be positive".to_string()));
        }
        if self.ticker_page_size == Some(0) {
            return Err(Error::Config("ticker_page_size must be positive when set".to_string()));
        }
        if self.fetch_timeout_ms == 0 || self.webhook_timeout_ms == 0 {
            return Err(Error::Config("timeouts must be positive".to_string()));
        }
        Ok(())
    }
}

/// Locate the TOML config file when none was named on the command line
fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    let user_config = dirs::config_dir().map(|d| d.join("paragliding").join("config.toml"));
    match user_config {
        Some(path) if path.exists() => Some(path),
        _ => None,
    }
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("paragliding"))
        .unwrap_or_else(|| PathBuf::from("./paragliding_data"))
}
