#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for pkcon
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/pkcon/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary)

pub mod constants;
pub mod core;

pub use crate::core::{BusConfig, GeneralConfig, PathConfig, ProgressConfig};

use constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, ENV_BAR_WIDTH, ENV_COLOR, ENV_PROGRESS, ENV_SOCKET,
    MIN_BAR_WIDTH,
};
use pkc_errors::{ConfigError, Error};
use pkc_types::{ColorChoice, ProgressMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub bus: BusConfig,

    #[serde(default)]
    pub progress: ProgressConfig,

    #[serde(default)]
    pub paths: PathConfig,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// An explicit path must exist; the default path may be missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        if let Ok(socket) = std::env::var(ENV_SOCKET) {
            if socket.trim().is_empty() {
                return Err(invalid(ENV_SOCKET, socket));
            }
            self.bus.socket_path = PathBuf::from(socket);
        }

        if let Ok(color) = std::env::var(ENV_COLOR) {
            self.general.color = match color.as_str() {
                "always" => ColorChoice::Always,
                "auto" => ColorChoice::Auto,
                "never" => ColorChoice::Never,
                _ => return Err(invalid(ENV_COLOR, color)),
            };
        }

        if let Ok(progress) = std::env::var(ENV_PROGRESS) {
            self.general.progress = match progress.as_str() {
                "auto" => ProgressMode::Auto,
                "always" => ProgressMode::Always,
                "never" => ProgressMode::Never,
                _ => return Err(invalid(ENV_PROGRESS, progress)),
            };
        }

        if let Ok(width) = std::env::var(ENV_BAR_WIDTH) {
            self.progress.bar_width = width
                .parse()
                .map_err(|_| invalid(ENV_BAR_WIDTH, width.clone()))?;
        }

        Ok(())
    }

    /// Check values that parse but cannot be used
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a bar narrower than the pulse
    /// segment plus one cell, or a zero pulse interval.
    pub fn validate(&self) -> Result<(), Error> {
        if self.progress.bar_width < MIN_BAR_WIDTH {
            return Err(invalid(
                "progress.bar_width",
                self.progress.bar_width.to_string(),
            ));
        }
        if self.progress.pulse_interval_ms == 0 {
            return Err(invalid("progress.pulse_interval_ms", "0".to_string()));
        }
        Ok(())
    }

    /// Directory for debug log files (with default)
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.paths.log_dir.clone().unwrap_or_else(|| {
            dirs::state_dir()
                .or_else(dirs::cache_dir)
                .unwrap_or_else(std::env::temp_dir)
                .join(CONFIG_DIR_NAME)
                .join("logs")
        })
    }
}

fn invalid(field: &str, value: String) -> Error {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value,
    }
    .into()
}
