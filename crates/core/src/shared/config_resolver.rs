use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::detection::domain::detection_config::DetectionConfig;
use crate::shared::constants::{CONFIG_DIR_NAME, CONFIG_FILE_NAME};

#[derive(Error, Debug)]
pub enum ConfigResolveError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Resolve the detection config, checking locations in order:
///
/// 1. `explicit` path (must exist when given)
/// 2. User config directory (`<config_dir>/skinscan/config.json`)
/// 3. Built-in defaults
pub fn resolve(explicit: Option<&Path>) -> Result<DetectionConfig, ConfigResolveError> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ConfigResolveError::NotFound(path.to_path_buf()));
        }
        return load(path);
    }

    if let Some(path) = user_config_path() {
        if path.exists() {
            log::info!("Using config from {}", path.display());
            return load(&path);
        }
    }

    Ok(DetectionConfig::default())
}

/// Reads a (possibly partial) JSON config, filling gaps from the defaults.
pub fn load(path: &Path) -> Result<DetectionConfig, ConfigResolveError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigResolveError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    DetectionConfig::from_json(&text).map_err(|e| ConfigResolveError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Platform-specific config location, e.g. `~/.config/skinscan/config.json`.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}
