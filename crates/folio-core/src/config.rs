//! Storage configuration and capacity constants.

use crate::error::{FolioError, Result};
use serde::{Deserialize, Serialize};

/// Total byte budget of the store (5 MiB).
pub const STORAGE_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

/// Usage above this many bytes raises the capacity warning (4 MiB, 80 %).
pub const WARNING_THRESHOLD_BYTES: u64 = 4 * 1024 * 1024;

/// Fraction of the quota above which usage is critical.
pub const CRITICAL_RATIO: f64 = 0.95;

/// Schema version written by this build. Increment on breaking changes.
pub const CURRENT_VERSION: u32 = 2;

/// Oldest schema version this build can still migrate.
pub const MIN_SUPPORTED_VERSION: u32 = 1;

/// Number of named resume snapshots kept.
pub const DEFAULT_SNAPSHOT_LIMIT: usize = 20;

/// What `load` does when a record cannot be migrated or has an unsupported version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Return the error to the caller (development builds).
    #[default]
    Propagate,
    /// Log the error and report "no saved data" (production builds).
    ///
    /// Applies to unsupported versions and failed migrations only. A
    /// current-version record that does not deserialize still fails.
    Recover,
}

/// Supported schema version window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionBounds {
    pub min_supported: u32,
    pub current: u32,
}

impl VersionBounds {
    pub fn new(min_supported: u32, current: u32) -> Self {
        Self {
            min_supported,
            current,
        }
    }

    /// True iff `min_supported <= version <= current`.
    pub fn contains(&self, version: u32) -> bool {
        version >= self.min_supported && version <= self.current
    }
}

impl Default for VersionBounds {
    fn default() -> Self {
        Self::new(MIN_SUPPORTED_VERSION, CURRENT_VERSION)
    }
}

/// Capacity limits applied by the capacity monitor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityLimits {
    pub quota_bytes: u64,
    pub warning_threshold_bytes: u64,
    pub critical_ratio: f64,
}

impl Default for CapacityLimits {
    fn default() -> Self {
        Self {
            quota_bytes: STORAGE_QUOTA_BYTES,
            warning_threshold_bytes: WARNING_THRESHOLD_BYTES,
            critical_ratio: CRITICAL_RATIO,
        }
    }
}

/// Root configuration for the persistence engine.
///
/// Every field has a default, so a partial TOML file only overrides what it
/// names:
///
/// ```toml
/// quota_bytes = 10485760
/// error_policy = "recover"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub quota_bytes: u64,
    pub warning_threshold_bytes: u64,
    pub critical_ratio: f64,
    pub current_version: u32,
    pub min_supported_version: u32,
    pub error_policy: ErrorPolicy,
    pub snapshot_limit: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            quota_bytes: STORAGE_QUOTA_BYTES,
            warning_threshold_bytes: WARNING_THRESHOLD_BYTES,
            critical_ratio: CRITICAL_RATIO,
            current_version: CURRENT_VERSION,
            min_supported_version: MIN_SUPPORTED_VERSION,
            error_policy: ErrorPolicy::default(),
            snapshot_limit: DEFAULT_SNAPSHOT_LIMIT,
        }
    }
}

impl StorageConfig {
    pub fn capacity_limits(&self) -> CapacityLimits {
        CapacityLimits {
            quota_bytes: self.quota_bytes,
            warning_threshold_bytes: self.warning_threshold_bytes,
            critical_ratio: self.critical_ratio,
        }
    }

    pub fn version_bounds(&self) -> VersionBounds {
        VersionBounds::new(self.min_supported_version, self.current_version)
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Rejects limit combinations the engine cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.quota_bytes == 0 {
            return Err(FolioError::config("quota_bytes must be greater than zero"));
        }
        if self.warning_threshold_bytes > self.quota_bytes {
            return Err(FolioError::config(format!(
                "warning_threshold_bytes ({}) exceeds quota_bytes ({})",
                self.warning_threshold_bytes, self.quota_bytes
            )));
        }
        if !(self.critical_ratio > 0.0 && self.critical_ratio <= 1.0) {
            return Err(FolioError::config(format!(
                "critical_ratio must be in (0, 1], got {}",
                self.critical_ratio
            )));
        }
        if self.min_supported_version == 0 {
            return Err(FolioError::config("min_supported_version must be at least 1"));
        }
        if self.min_supported_version > self.current_version {
            return Err(FolioError::config(format!(
                "min_supported_version ({}) is newer than current_version ({})",
                self.min_supported_version, self.current_version
            )));
        }
        if self.snapshot_limit == 0 {
            return Err(FolioError::config("snapshot_limit must be greater than zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = StorageConfig::default();
        assert_eq!(config.quota_bytes, 5 * 1024 * 1024);
        assert_eq!(config.warning_threshold_bytes, 4 * 1024 * 1024);
        assert_eq!(config.critical_ratio, 0.95);
        assert_eq!(config.error_policy, ErrorPolicy::Propagate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: StorageConfig = toml::from_str("error_policy = \"recover\"").unwrap();
        assert_eq!(config.error_policy, ErrorPolicy::Recover);
        assert_eq!(config.quota_bytes, STORAGE_QUOTA_BYTES);
        assert_eq!(config.current_version, CURRENT_VERSION);
    }

    #[test]
    fn test_validate_rejects_warning_above_quota() {
        let config = StorageConfig {
            warning_threshold_bytes: STORAGE_QUOTA_BYTES + 1,
            ..StorageConfig::default()
        };
        assert!(matches!(config.validate(), Err(FolioError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_inverted_version_window() {
        let config = StorageConfig {
            min_supported_version: 3,
            current_version: 2,
            ..StorageConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_version_bounds_contains() {
        let bounds = VersionBounds::new(1, 3);
        assert!(!bounds.contains(0));
        assert!(bounds.contains(1));
        assert!(bounds.contains(3));
        assert!(!bounds.contains(4));
    }
}
