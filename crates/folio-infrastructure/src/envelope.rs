//! Schema-version envelope around persisted payloads.
//!
//! Wire form (before compression):
//!
//! ```text
//! {"version": 2, "migratedAt": "2026-01-01T00:00:00Z", "data": { ... }}
//! ```
//!
//! Records written before versioning existed are bare JSON payloads. They are
//! read as version 1.

use chrono::{DateTime, Utc};
use folio_core::config::VersionBounds;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Version assigned to records that carry no envelope.
pub const LEGACY_VERSION: u32 = 1;

/// A payload tagged with the schema version it was written at.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionedEnvelope<T> {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrated_at: Option<DateTime<Utc>>,
    pub data: T,
}

/// Wraps `data` at `version`, stamped with the current time.
pub fn wrap<T>(data: T, version: u32) -> VersionedEnvelope<T> {
    VersionedEnvelope {
        version,
        migrated_at: Some(Utc::now()),
        data,
    }
}

pub fn unwrap<T>(envelope: VersionedEnvelope<T>) -> T {
    envelope.data
}

/// True if `value` has the envelope shape: an object with a numeric
/// `version` and a `data` field.
pub fn is_versioned(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| obj.get("version").is_some_and(Value::is_number) && obj.contains_key("data"))
}

/// Schema version found in a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StoredVersion {
    /// A positive integer version.
    Known(u32),
    /// A numeric `version` that is zero, negative, fractional or beyond
    /// `u32`. Never inside the supported window.
    OutOfRange(serde_json::Number),
}

impl StoredVersion {
    /// The version as `u32`, if it is a valid schema version.
    pub fn known(&self) -> Option<u32> {
        match self {
            StoredVersion::Known(version) => Some(*version),
            StoredVersion::OutOfRange(_) => None,
        }
    }

    pub fn is_supported(&self, bounds: &VersionBounds) -> bool {
        self.known().is_some_and(|version| is_supported(version, bounds))
    }
}

impl fmt::Display for StoredVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredVersion::Known(version) => f.pad(&version.to_string()),
            StoredVersion::OutOfRange(number) => f.pad(&number.to_string()),
        }
    }
}

/// Detects the schema version of a stored record.
///
/// Returns `None` only when there is no record. Text that does not parse, or
/// parses without a numeric `version`, is legacy version 1. Any numeric
/// `version` is reported as found, valid or not.
pub fn detect_version(raw: Option<&str>) -> Option<StoredVersion> {
    let raw = raw?;
    let version = serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|value| version_of(&value))
        .unwrap_or(StoredVersion::Known(LEGACY_VERSION));
    Some(version)
}

fn version_of(value: &Value) -> Option<StoredVersion> {
    let Value::Number(number) = value.get("version")? else {
        return None;
    };

    let version = number
        .as_u64()
        .filter(|v| *v >= 1)
        .and_then(|v| u32::try_from(v).ok())
        .map(StoredVersion::Known)
        .unwrap_or_else(|| StoredVersion::OutOfRange(number.clone()));
    Some(version)
}

/// Returns the payload of a parsed record: `data` for enveloped records, the
/// value itself for legacy ones.
pub fn payload_of(value: Value) -> Value {
    if is_versioned(&value) {
        match value {
            Value::Object(mut obj) => obj.remove("data").unwrap_or(Value::Null),
            other => other,
        }
    } else {
        value
    }
}

pub fn is_supported(version: u32, bounds: &VersionBounds) -> bool {
    bounds.contains(version)
}

pub fn needs_migration(current_version: u32, target_version: u32) -> bool {
    current_version < target_version
}
