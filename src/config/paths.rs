//! Platform-specific configuration and cache paths.

use crate::constants::APP_NAME;
use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Get the configuration directory for the current platform.
///
/// - Linux: `~/.config/wildwatch/`
/// - macOS: `~/Library/Application Support/wildwatch/`
/// - Windows: `%APPDATA%\wildwatch\`
pub fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(Error::ConfigDirNotFound)
}

/// Get the full path to the config file.
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Directory where downloaded model weights are cached.
///
/// - Linux: `~/.cache/wildwatch/models/`
pub fn models_cache_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.cache_dir().join("models"))
        .ok_or(Error::CacheDirNotFound)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_returns_path() {
        let path = config_dir().unwrap();
        assert!(path.to_string_lossy().contains("wildwatch"));
    }

    #[test]
    fn test_config_file_path_ends_with_toml() {
        let path = config_file_path().unwrap();
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn test_models_cache_dir_ends_with_models() {
        let path = models_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains("wildwatch"));
        assert!(path.ends_with("models"));
    }
}
