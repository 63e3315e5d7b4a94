//! Fixed names and default values

pub const CONFIG_DIR_NAME: &str = "pkcon";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Where the package service listens unless configured otherwise
pub const DEFAULT_SOCKET_PATH: &str = "/run/pkcon/service.sock";

pub const DEFAULT_BAR_WIDTH: usize = 15;
pub const MIN_BAR_WIDTH: usize = 3;
pub const DEFAULT_PULSE_INTERVAL_MS: u64 = 40;

pub const ENV_SOCKET: &str = "PKCON_SOCKET";
pub const ENV_COLOR: &str = "PKCON_COLOR";
pub const ENV_PROGRESS: &str = "PKCON_PROGRESS";
pub const ENV_BAR_WIDTH: &str = "PKCON_BAR_WIDTH";
