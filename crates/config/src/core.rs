//! Configuration sections

use crate::constants::{DEFAULT_BAR_WIDTH, DEFAULT_PULSE_INTERVAL_MS, DEFAULT_SOCKET_PATH};
use pkc_types::{ColorChoice, ProgressMode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// General application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub color: ColorChoice,
    #[serde(default)]
    pub progress: ProgressMode,
}

/// How to reach the package service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
        }
    }
}

/// Progress bar geometry and timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    #[serde(default = "default_bar_width")]
    pub bar_width: usize,
    #[serde(default = "default_pulse_interval_ms")]
    pub pulse_interval_ms: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            bar_width: DEFAULT_BAR_WIDTH,
            pulse_interval_ms: DEFAULT_PULSE_INTERVAL_MS,
        }
    }
}

impl ProgressConfig {
    #[must_use]
    pub fn pulse_interval(&self) -> Duration {
        Duration::from_millis(self.pulse_interval_ms)
    }
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    /// Directory for `--debug` log files
    pub log_dir: Option<PathBuf>,
}

fn default_socket_path() -> PathBuf {
    PathBuf::from(DEFAULT_SOCKET_PATH)
}

fn default_bar_width() -> usize {
    DEFAULT_BAR_WIDTH
}

fn default_pulse_interval_ms() -> u64 {
    DEFAULT_PULSE_INTERVAL_MS
}
