//! Error types for Folio.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the persistence engine.
///
/// Every layer (codec, capacity gate, migrations, stores) reports through this
/// enum so the facade can decide per variant whether to degrade, recover or
/// propagate.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FolioError {
    /// Codec fault. Never surfaces from `load`, which falls back to raw data.
    #[error("Compression error: {0}")]
    Compression(String),

    /// The capacity gate rejected a write.
    #[error("Storage quota exceeded: {reason}")]
    QuotaExceeded {
        needed: u64,
        available: u64,
        reason: String,
    },

    /// A migration path could not be built or a transform failed.
    #[error("Migration error (v{from_version} -> v{to_version}): {message}")]
    Migration {
        from_version: u32,
        to_version: u32,
        message: String,
    },

    /// The stored version is outside the supported window.
    #[error(
        "Unsupported storage version {version} (supported: v{min_supported}..=v{current})"
    )]
    UnsupportedVersion {
        /// The stored `version` as written, which may not be a valid `u32`.
        version: String,
        min_supported: u32,
        current: u32,
    },

    /// A second migration was registered for the same source version.
    #[error("Migration from v{from_version} already registered (rejected '{name}')")]
    DuplicateMigration { from_version: u32, name: String },

    /// Key-value store failure (backend specific).
    #[error("Store error: {0}")]
    Store(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound { entity_type: String, id: String },
}

impl FolioError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Compression error
    pub fn compression(message: impl Into<String>) -> Self {
        Self::Compression(message.into())
    }

    /// Creates a Migration error for the given version pair
    pub fn migration(from_version: u32, to_version: u32, message: impl Into<String>) -> Self {
        Self::Migration {
            from_version,
            to_version,
            message: message.into(),
        }
    }

    /// Creates a Store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_compression(&self) -> bool {
        matches!(self, Self::Compression(_))
    }

    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }

    pub fn is_migration(&self) -> bool {
        matches!(self, Self::Migration { .. })
    }

    pub fn is_unsupported_version(&self) -> bool {
        matches!(self, Self::UnsupportedVersion { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for the failures that the recover policy converts into "no data":
    /// a record that cannot be brought to the current version.
    ///
    /// Serialization, store, IO and quota failures are never swallowed. A
    /// current record that does not fit the caller's type is reported rather
    /// than hidden, so it is not overwritten with a fresh default.
    pub fn is_recoverable_on_load(&self) -> bool {
        matches!(self, Self::Migration { .. } | Self::UnsupportedVersion { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for FolioError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for FolioError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for FolioError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, FolioError>`.
pub type Result<T> = std::result::Result<T, FolioError>;
