//! Reading and writing the wildwatch TOML file.

use super::config_file_path;
use crate::config::Config;
use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Written above every saved configuration.
const FILE_HEADER: &str = "# wildwatch configuration\n# Omitted keys take their built-in defaults.\n\n";

/// Read the configuration at `path`.
///
/// A missing file is not an error; every section then takes its defaults.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        Err(source) => {
            return Err(Error::ConfigRead {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let config = toml::from_str(&contents).map_err(|source| Error::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Read the per-user configuration.
///
/// Platforms without a config directory get the defaults.
pub fn load_default_config() -> Result<Config> {
    match config_file_path() {
        Ok(path) => load_config_file(&path),
        Err(e) => {
            debug!("{e}; using default configuration");
            Ok(Config::default())
        }
    }
}

/// Write `config` to `path`, creating missing parent directories.
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let write_failed = |source: std::io::Error| Error::ConfigWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_failed)?;
    }
    let body =
        toml::to_string_pretty(config).map_err(|source| Error::ConfigSerialize { source })?;
    std::fs::write(path, format!("{FILE_HEADER}{body}")).map_err(write_failed)
}
