//! Configuration loading
//!
//! Resolution order, highest priority first:
//! 1. Command-line argument / environment variable (resolved by clap in the binary)
//! 2. TOML config file
//! 3. Compiled defaults (OS data directory via `dirs`)
//!
//! A missing config file is not an error; the service starts on defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5780";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_EVENT_CAPACITY: usize = 256;
pub const DEFAULT_SMTP_PORT: u16 = 587;

const APP_DIR: &str = "thesis-track";

/// Outbound mail settings; absent means log-only notifications
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub sender_email: String,
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_sender_name() -> String {
    "Thesis Track".to_string()
}

/// On-disk TOML layout; every key optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub bind_addr: Option<String>,
    pub database_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub event_capacity: Option<usize>,
    pub smtp: Option<SmtpConfig>,
}

impl TomlConfig {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Load a config file; `Ok(None)` if it does not exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map(Some)
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_addr: Option<String>,
    pub database_path: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration, built once at startup
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub bind_addr: String,
    pub database_path: PathBuf,
    pub log_level: String,
    pub event_capacity: usize,
    pub smtp: Option<SmtpConfig>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            database_path: default_database_path(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            smtp: None,
        }
    }
}

impl TrackerConfig {
    /// Resolve configuration from overrides, config file and defaults
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self> {
        let file = match overrides.config_file.clone().or_else(default_config_file) {
            Some(path) => match TomlConfig::load(&path)? {
                Some(file) => {
                    info!("Loaded config file: {}", path.display());
                    file
                }
                None => {
                    warn!("Config file not found: {} (using defaults)", path.display());
                    TomlConfig::default()
                }
            },
            None => {
                warn!("Could not determine config directory (using defaults)");
                TomlConfig::default()
            }
        };

        Self::merge(overrides, file)
    }

    /// Layer overrides over file values over defaults
    pub fn merge(overrides: ConfigOverrides, file: TomlConfig) -> Result<Self> {
        let defaults = TrackerConfig::default();
        let config = TrackerConfig {
            bind_addr: overrides
                .bind_addr
                .or(file.bind_addr)
                .unwrap_or(defaults.bind_addr),
            database_path: overrides
                .database_path
                .or(file.database_path)
                .unwrap_or(defaults.database_path),
            log_level: overrides
                .log_level
                .or(file.log_level)
                .unwrap_or(defaults.log_level),
            event_capacity: file.event_capacity.unwrap_or(defaults.event_capacity),
            smtp: file.smtp,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be at least 1".to_string()));
        }
        if let Some(smtp) = &self.smtp {
            if smtp.host.trim().is_empty() {
                return Err(Error::Config("smtp.host must not be empty".to_string()));
            }
            if !smtp.sender_email.contains('@') {
                return Err(Error::Config(format!(
                    "smtp.sender_email is not an address: {}",
                    smtp.sender_email
                )));
            }
        }
        Ok(())
    }
}

/// Platform config file location (`<config dir>/thesis-track/config.toml`)
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./thesis_data"))
        .join("thesis.db")
}
