//! Storage configuration file loading.
//!
//! Reads `StorageConfig` from a TOML file. A missing file yields the
//! defaults; unknown keys are ignored and missing keys take their default.

use folio_core::config::StorageConfig;
use folio_core::error::{FolioError, Result};
use std::fs;
use std::path::Path;

/// Loads and validates the storage configuration at `path`.
///
/// # Errors
///
/// - `FolioError::Io` if the file exists but cannot be read
/// - `FolioError::Serialization` if it is not valid TOML
/// - `FolioError::Config` if the values are inconsistent
pub fn load_config(path: &Path) -> Result<StorageConfig> {
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(StorageConfig::default());
    }

    let content = fs::read_to_string(path)?;
    let config: StorageConfig = toml::from_str(&content)?;
    config
        .validate()
        .map_err(|e| FolioError::config(format!("{}: {}", path.display(), e)))?;

    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Writes `config` to `path` as TOML, creating parent directories.
pub fn save_config(path: &Path, config: &StorageConfig) -> Result<()> {
    config.validate()?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}
