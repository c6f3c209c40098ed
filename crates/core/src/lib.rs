//! Weather archive core library
//!
//! Shared utilities for the weatherapp server:
//! - Configuration loading (XDG-compliant)
//! - File system utilities
//! - Common constants

mod config;
pub mod fs;

pub use config::{find_config_file, get_xdg_data_dir, load_config, load_toml, ConfigSource};
pub use fs::{ensure_dir_exists, path_exists};

/// Application name used for XDG paths
pub const APP_NAME: &str = "weatherapp";

/// Default server port
pub const DEFAULT_SERVER_PORT: u16 = 9900;
