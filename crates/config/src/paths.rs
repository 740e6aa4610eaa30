//! Path utilities

use std::path::PathBuf;

/// Data directory (~/.mailagent), or `.mailagent` when no home is known
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".mailagent"))
        .unwrap_or_else(|| PathBuf::from(".mailagent"))
}

/// Config file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}
