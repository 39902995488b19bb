//! Default locations of folio files.
//!
//! ```text
//! ~/.config/folio/            # Config directory
//! └── config.toml             # StorageConfig
//!
//! ~/.local/share/folio/       # Data directory
//! ├── store.json              # JsonFileStore
//! └── store.lock              # Writer lock
//! ```

use folio_core::error::FolioError;
use std::path::PathBuf;

const APP_DIR: &str = "folio";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// The platform config directory could not be determined.
    ConfigDirNotFound,
    /// The platform data directory could not be determined.
    DataDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
            PathError::DataDirNotFound => write!(f, "Cannot find data directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for FolioError {
    fn from(err: PathError) -> Self {
        FolioError::config(err.to_string())
    }
}

/// Path management for folio.
pub struct FolioPaths;

impl FolioPaths {
    /// Returns the folio configuration directory (e.g. `~/.config/folio/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the folio data directory (e.g. `~/.local/share/folio/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::DataDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn store_file() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("store.json"))
    }
}
