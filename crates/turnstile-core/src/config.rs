//! Application configuration management.
//!
//! Handles loading, saving, and validating turnstile configuration:
//! - Access window around each event's scheduled time
//! - Anti-passback reentry window and per-barcode lock lifetime
//! - Server bind address and logging mode
//! - Storage backend location

use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable that overrides the configuration file location.
pub const CONFIG_PATH_ENV: &str = "TURNSTILE_CONFIG";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    ReadError {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file could not be written.
    #[error("Failed to write {}: {source}", .path.display())]
    WriteError {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A single field holds an invalid value.
    #[error("{field}: {message}")]
    ValidationError {
        /// Dotted field path.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields hold invalid values.
    #[error("{} validation errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Event access window.
    pub window: WindowConfig,

    /// Anti-passback timing.
    pub anti_passback: AntiPassbackConfig,

    /// HTTP server settings.
    pub server: ServerConfig,

    /// Storage backend settings.
    pub storage: StorageConfig,
}

/// Access window around an event's scheduled time.
///
/// An event is open while `now - open_after <= scheduled_at <= now + open_before`:
/// `open_before_secs` bounds how early scanning starts and `open_after_secs`
/// how long after the start it keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Upper bound offset, in seconds.
    pub open_before_secs: i64,

    /// Lower bound offset, in seconds.
    pub open_after_secs: i64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            open_before_secs: 60 * 45,
            open_after_secs: 60 * 60 * 15,
        }
    }
}

/// Anti-passback timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AntiPassbackConfig {
    /// Seconds after the first accepted passage during which a ticket may
    /// still move in and out. Every later scan is refused.
    pub block_after_reentry_secs: i64,

    /// Seconds a barcode stays locked after an accepted passage.
    pub lock_ttl_secs: i64,
}

impl Default for AntiPassbackConfig {
    fn default() -> Self {
        Self {
            block_after_reentry_secs: 60 * 60 * 2,
            lock_ttl_secs: 10,
        }
    }
}

impl AntiPassbackConfig {
    /// Reentry window as a duration.
    #[must_use]
    pub fn block_after_reentry(&self) -> TimeDelta {
        TimeDelta::seconds(self.block_after_reentry_secs)
    }

    /// Lock lifetime as a duration.
    #[must_use]
    pub fn lock_ttl(&self) -> TimeDelta {
        TimeDelta::seconds(self.lock_ttl_secs)
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind_address: String,

    /// Production logging (JSON files + compact stdout).
    pub production: bool,

    /// Directory for the rolling JSON log files in production.
    /// Defaults to `logs` under the data directory.
    pub log_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            production: false,
            log_dir: None,
        }
    }
}

/// Storage backend settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Keep everything in memory; nothing survives a restart.
    pub memory: bool,

    /// Directory for the catalog snapshot and the entry ledger.
    /// Defaults to the platform data directory.
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or
    /// validated.
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<Self> {
        match Self::load(path.as_ref()) {
            Err(ConfigError::NotFound(path)) => {
                info!(path = %path.display(), "No configuration file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Load configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if the file is missing, or another
    /// variant if it cannot be read, parsed or validated.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::WriteError {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigError::WriteError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check every field, collecting all problems.
    ///
    /// # Errors
    ///
    /// Returns a single [`ConfigError::ValidationError`] or a
    /// [`ConfigError::MultipleValidationErrors`] listing each bad field.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if self.window.open_before_secs < 0 {
            errors.push(invalid("window.open_before_secs", "must not be negative"));
        }
        if self.window.open_after_secs < 0 {
            errors.push(invalid("window.open_after_secs", "must not be negative"));
        }
        if self.anti_passback.block_after_reentry_secs <= 0 {
            errors.push(invalid(
                "anti_passback.block_after_reentry_secs",
                "must be positive",
            ));
        }
        if self.anti_passback.lock_ttl_secs <= 0 {
            errors.push(invalid("anti_passback.lock_ttl_secs", "must be positive"));
        } else if self.anti_passback.lock_ttl_secs > self.anti_passback.block_after_reentry_secs {
            errors.push(invalid(
                "anti_passback.lock_ttl_secs",
                "must not exceed block_after_reentry_secs",
            ));
        }
        if self.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(invalid(
                "server.bind_address",
                "must be a socket address such as 0.0.0.0:3000",
            ));
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }

    /// Data directory for file-backed storage.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.storage.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Directory for production log files.
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.server
            .log_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("logs"))
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Configuration file location: `$TURNSTILE_CONFIG`, else the platform
/// config directory.
#[must_use]
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/etc/turnstile/config.toml")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "turnstile").map_or_else(
            || PathBuf::from("./config.toml"),
            |dirs| dirs.config_dir().join("config.toml"),
        )
    }
}

/// Default data directory for the catalog and ledger files.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/var/lib/turnstile")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "turnstile").map_or_else(
            || PathBuf::from("./data"),
            |dirs| dirs.data_dir().to_path_buf(),
        )
    }
}
