//! Save/load entry point composing codec, capacity gate, envelope and migrations.
//!
//! Save: value → envelope → JSON → compress → quota check → store.
//! Load: store → decompress (raw fallback) → detect version → data as-is when
//! current, migrated when older, error policy when unsupported.

use crate::capacity::{CapacityMonitor, CapacityStatus, QuotaCheck, entry_size, format_bytes};
use crate::codec;
use crate::envelope::{self, LEGACY_VERSION, StoredVersion};
use crate::migration::{BackupEntry, MigrationRegistry, MigrationRunner, parse_backup_key};
use folio_core::KeyValueStore;
use folio_core::config::{CapacityLimits, ErrorPolicy, StorageConfig, VersionBounds};
use folio_core::error::{FolioError, Result};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::Value;
use std::sync::Arc;

/// Detailed result of a load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome<T> {
    /// The record was read (and migrated if it was older).
    Loaded(T),
    /// Nothing is stored under the key.
    Missing,
    /// A record exists but could not be brought to the current version.
    ///
    /// Only produced under `ErrorPolicy::Recover`. The stored record and any
    /// backups are left in place for manual recovery.
    Unrecoverable {
        reason: String,
        backup_keys: Vec<String>,
    },
}

impl<T> LoadOutcome<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            LoadOutcome::Loaded(value) => Some(value),
            LoadOutcome::Missing | LoadOutcome::Unrecoverable { .. } => None,
        }
    }
}

/// Facts about a stored record, without migrating it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordInfo {
    pub key: String,
    pub stored_bytes: u64,
    pub compressed: bool,
    pub version: StoredVersion,
    pub supported: bool,
    pub needs_migration: bool,
}

/// Public save/load API of the persistence engine.
///
/// Owns the read/write sequence for every key it is given. The registry is
/// injected and only read.
pub struct PersistenceFacade {
    store: Arc<dyn KeyValueStore>,
    registry: Arc<MigrationRegistry>,
    capacity: CapacityMonitor,
    bounds: VersionBounds,
    policy: ErrorPolicy,
}

impl PersistenceFacade {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        registry: Arc<MigrationRegistry>,
        config: &StorageConfig,
    ) -> Self {
        Self {
            store,
            registry,
            capacity: CapacityMonitor::new(config.capacity_limits()),
            bounds: config.version_bounds(),
            policy: config.error_policy,
        }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.policy
    }

    pub fn version_bounds(&self) -> VersionBounds {
        self.bounds
    }

    pub fn capacity_limits(&self) -> &CapacityLimits {
        self.capacity.limits()
    }

    // ============================================================================
    // Save
    // ============================================================================

    /// Saves `data` under `key` at the current schema version.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, data: &T) -> Result<()> {
        self.save_with_version(key, data, self.bounds.current)
    }

    /// Saves `data` under `key` tagged with `version`.
    ///
    /// # Errors
    ///
    /// - `FolioError::QuotaExceeded` if the compressed record would not fit;
    ///   nothing is written in that case
    /// - Serialization, compression or store errors
    pub fn save_with_version<T: Serialize + ?Sized>(
        &self,
        key: &str,
        data: &T,
        version: u32,
    ) -> Result<()> {
        let envelope = envelope::wrap(data, version);
        let text = serde_json::to_string(&envelope)?;
        let compressed = codec::compress(&text)?;

        // The new value replaces the old one, so the old entry does not count.
        let used = self.capacity.size_of_store(self.store.as_ref())?;
        let replaced = self
            .store
            .get(key)?
            .map(|old| entry_size(key, old.len()))
            .unwrap_or(0);
        let used_by_others = used.saturating_sub(replaced);
        let needed = entry_size(key, compressed.len());

        let check = self.capacity.check_with_usage(used_by_others, needed);
        if !check.allowed {
            return Err(quota_error(check));
        }

        self.store.set(key, &compressed)?;

        let status = self.capacity.status_for(used_by_others + needed);
        tracing::debug!(
            "Saved '{}' at v{}: {} -> {} ({})",
            key,
            version,
            format_bytes(text.len() as u64),
            format_bytes(compressed.len() as u64),
            format_usage(&status)
        );
        if status.critical {
            tracing::warn!("Storage usage critical: {}", format_usage(&status));
        } else if status.warning {
            tracing::warn!("Storage usage above warning threshold: {}", format_usage(&status));
        }

        Ok(())
    }

    // ============================================================================
    // Load
    // ============================================================================

    /// Loads the record under `key` as `T`.
    ///
    /// Returns `Ok(None)` when nothing is stored. Under `ErrorPolicy::Recover`
    /// an unmigratable or unsupported record also yields `Ok(None)`; use
    /// [`load_detailed`](Self::load_detailed) to tell the two apart.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        Ok(self.load_detailed(key)?.into_option())
    }

    /// Loads the record under `key` as untyped JSON.
    pub fn load_value(&self, key: &str) -> Result<Option<Value>> {
        self.load(key)
    }

    /// Loads the record under `key`, reporting why nothing was returned.
    pub fn load_detailed<T: DeserializeOwned>(&self, key: &str) -> Result<LoadOutcome<T>> {
        let Some(raw) = self.read_raw(key)? else {
            return Ok(LoadOutcome::Missing);
        };

        let text = decode_stored(key, &raw);

        match self.read_record(key, &text) {
            Ok(value) => Ok(LoadOutcome::Loaded(value)),
            Err(err) if self.policy == ErrorPolicy::Recover && err.is_recoverable_on_load() => {
                let backup_keys = self
                    .list_backups(key)
                    .map(|entries| entries.into_iter().map(|e| e.key).collect())
                    .unwrap_or_default();
                tracing::error!(
                    "Failed to load '{}', treating it as empty: {} (backups: {:?})",
                    key,
                    err,
                    backup_keys
                );
                Ok(LoadOutcome::Unrecoverable {
                    reason: err.to_string(),
                    backup_keys,
                })
            }
            Err(err) => Err(err),
        }
    }

    fn read_raw(&self, key: &str) -> Result<Option<String>> {
        Ok(self.store.get(key)?.filter(|raw| !raw.is_empty()))
    }

    fn read_record<T: DeserializeOwned>(&self, key: &str, text: &str) -> Result<T> {
        let stored = envelope::detect_version(Some(text))
            .unwrap_or(StoredVersion::Known(LEGACY_VERSION));

        let version = match stored.known() {
            Some(version) if envelope::is_supported(version, &self.bounds) => version,
            _ => {
                return Err(FolioError::UnsupportedVersion {
                    version: stored.to_string(),
                    min_supported: self.bounds.min_supported,
                    current: self.bounds.current,
                });
            }
        };

        if version == self.bounds.current {
            let parsed: Value = serde_json::from_str(text)?;
            return Ok(serde_json::from_value(envelope::payload_of(parsed))?);
        }

        let runner = MigrationRunner::new(Arc::clone(&self.store), Arc::clone(&self.registry));
        let migrated = runner.run_migration(key, text, version, self.bounds.current)?;
        let typed: T = serde_json::from_value(migrated.clone()).map_err(|e| {
            FolioError::migration(
                version,
                self.bounds.current,
                format!("migrated record does not match the current schema: {}", e),
            )
        })?;

        self.write_back(key, &migrated);
        Ok(typed)
    }

    /// Persists a migrated record at the current version so the next load
    /// skips the migration. Failure only costs a repeated migration later.
    fn write_back(&self, key: &str, migrated: &Value) {
        if let Err(err) = self.save(key, migrated) {
            tracing::warn!(
                "Migrated '{}' but could not store the result, will migrate again on next load: {}",
                key,
                err
            );
        }
    }

    // ============================================================================
    // Inspection
    // ============================================================================

    /// Describes the record under `key` without migrating it.
    pub fn inspect(&self, key: &str) -> Result<Option<RecordInfo>> {
        let Some(raw) = self.read_raw(key)? else {
            return Ok(None);
        };

        let text = decode_stored(key, &raw);
        let version = envelope::detect_version(Some(&text))
            .unwrap_or(StoredVersion::Known(LEGACY_VERSION));
        let supported = version.is_supported(&self.bounds);
        let needs_migration = supported
            && version
                .known()
                .is_some_and(|v| envelope::needs_migration(v, self.bounds.current));

        Ok(Some(RecordInfo {
            key: key.to_string(),
            stored_bytes: entry_size(key, raw.len()),
            compressed: text != raw,
            version,
            supported,
            needs_migration,
        }))
    }

    pub fn capacity_status(&self) -> Result<CapacityStatus> {
        self.capacity.status(self.store.as_ref())
    }

    pub fn check_quota(&self, additional_bytes: u64) -> Result<QuotaCheck> {
        self.capacity.check(self.store.as_ref(), additional_bytes)
    }

    /// Backups written for `key`, oldest first.
    pub fn list_backups(&self, key: &str) -> Result<Vec<BackupEntry>> {
        let mut entries: Vec<BackupEntry> = self
            .store
            .keys()?
            .iter()
            .filter_map(|candidate| parse_backup_key(key, candidate))
            .collect();
        entries.sort_by(|a, b| {
            a.created_at_millis
                .cmp(&b.created_at_millis)
                .then_with(|| a.key.cmp(&b.key))
        });
        Ok(entries)
    }
}

/// Decompresses a stored record, falling back to the raw string for records
/// written before compression was introduced.
fn decode_stored(key: &str, raw: &str) -> String {
    match codec::decompress(raw) {
        Ok(text) if serde_json::from_str::<IgnoredAny>(&text).is_ok() => text,
        Ok(_) => {
            tracing::debug!("'{}' does not decompress to JSON, reading it uncompressed", key);
            raw.to_string()
        }
        Err(err) => {
            tracing::debug!("'{}' is not compressed ({}), reading it uncompressed", key, err);
            raw.to_string()
        }
    }
}

fn quota_error(check: QuotaCheck) -> FolioError {
    FolioError::QuotaExceeded {
        needed: check.needed_bytes,
        available: check.available_bytes,
        reason: check.reason.unwrap_or_else(|| "quota exceeded".to_string()),
    }
}

fn format_usage(status: &CapacityStatus) -> String {
    format!(
        "{} / {} ({:.1}%)",
        format_bytes(status.used_bytes),
        format_bytes(status.total_bytes),
        status.percent_used
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::FnMigration;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn facade(store: Arc<MemoryStore>, registry: MigrationRegistry, policy: ErrorPolicy) -> PersistenceFacade {
        let config = StorageConfig::default().with_error_policy(policy);
        PersistenceFacade::new(store, Arc::new(registry), &config)
    }

    fn add_flag_registry() -> MigrationRegistry {
        let mut registry = MigrationRegistry::new();
        registry
            .register(Arc::new(FnMigration::new(1, 2, "add-flag", |data: &Value| {
                let mut next = data
                    .as_object()
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("expected an object"))?;
                next.insert("flag".to_string(), json!(true));
                Ok(Value::Object(next))
            })))
            .unwrap();
        registry
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let facade = facade(store.clone(), MigrationRegistry::new(), ErrorPolicy::Propagate);

        let data = json!({"name": "Ada", "summary": "日本語 🚀"});
        facade.save("draft", &data).unwrap();

        let raw = store.get("draft").unwrap().unwrap();
        assert!(!raw.contains("Ada"), "record should be stored compressed");

        let loaded: Value = facade.load("draft").unwrap().unwrap();
        assert_eq!(loaded, data);
    }

    #[test]
    fn test_missing_key_is_none() {
        let store = Arc::new(MemoryStore::new());
        let facade = facade(store, MigrationRegistry::new(), ErrorPolicy::Propagate);

        assert_eq!(facade.load_value("nonexistent").unwrap(), None);
        assert_eq!(
            facade.load_detailed::<Value>("nonexistent").unwrap(),
            LoadOutcome::Missing
        );
    }

    #[test]
    fn test_uncompressed_current_record_is_read() {
        let store = Arc::new(MemoryStore::with_entries([(
            "draft",
            r#"{"version":2,"data":{"name":"A"}}"#,
        )]));
        let facade = facade(store, MigrationRegistry::new(), ErrorPolicy::Propagate);

        assert_eq!(facade.load_value("draft").unwrap(), Some(json!({"name": "A"})));
    }

    #[test]
    fn test_pretty_printed_legacy_record_is_read_raw() {
        let raw = "{\n  \"name\": \"A\",\n\t\"tags\": [\n    \"x\"\n  ]\n}";
        let store = Arc::new(MemoryStore::with_entries([("draft", raw)]));
        let facade = facade(store, add_flag_registry(), ErrorPolicy::Propagate);

        let info = facade.inspect("draft").unwrap().unwrap();
        assert!(!info.compressed);
        assert_eq!(info.version, StoredVersion::Known(1));

        let loaded = facade.load_value("draft").unwrap().unwrap();
        assert_eq!(loaded, json!({"name": "A", "tags": ["x"], "flag": true}));
    }

    #[test]
    fn test_pretty_printed_current_record_is_read_raw() {
        let raw = "{\n  \"version\": 2,\n  \"data\": {\n    \"name\": \"A\"\n  }\n}";
        let store = Arc::new(MemoryStore::with_entries([("draft", raw)]));
        let facade = facade(store, MigrationRegistry::new(), ErrorPolicy::Propagate);

        assert_eq!(facade.load_value("draft").unwrap(), Some(json!({"name": "A"})));
    }

    #[test]
    fn test_older_record_is_migrated_and_written_back() {
        let store = Arc::new(MemoryStore::new());
        let facade = facade(store.clone(), add_flag_registry(), ErrorPolicy::Propagate);
        facade.save_with_version("draft", &json!({"name": "A"}), 1).unwrap();

        let loaded = facade.load_value("draft").unwrap().unwrap();
        assert_eq!(loaded, json!({"name": "A", "flag": true}));
        assert_eq!(facade.list_backups("draft").unwrap().len(), 1);

        let info = facade.inspect("draft").unwrap().unwrap();
        assert_eq!(info.version, StoredVersion::Known(2));
        assert!(info.compressed);
        assert!(!info.needs_migration);

        // second load reads the written-back record, no new backup
        assert_eq!(facade.load_value("draft").unwrap().unwrap(), loaded);
        assert_eq!(facade.list_backups("draft").unwrap().len(), 1);
    }

    #[test]
    fn test_unsupported_version_propagates() {
        let store = Arc::new(MemoryStore::with_entries([(
            "draft",
            r#"{"version":9,"data":{}}"#,
        )]));
        let facade = facade(store, MigrationRegistry::new(), ErrorPolicy::Propagate);

        let err = facade.load_value("draft").unwrap_err();
        assert_eq!(
            err,
            FolioError::UnsupportedVersion {
                version: "9".to_string(),
                min_supported: 1,
                current: 2
            }
        );
    }

    #[test]
    fn test_unsupported_version_recovers_to_none() {
        let raw = r#"{"version":9,"data":{}}"#;
        let store = Arc::new(MemoryStore::with_entries([("draft", raw)]));
        let facade = facade(store.clone(), MigrationRegistry::new(), ErrorPolicy::Recover);

        assert_eq!(facade.load_value("draft").unwrap(), None);
        match facade.load_detailed::<Value>("draft").unwrap() {
            LoadOutcome::Unrecoverable { reason, .. } => assert!(reason.contains('9')),
            other => panic!("unexpected outcome: {:?}", other),
        }
        // the record itself is left untouched
        assert_eq!(store.get("draft").unwrap().as_deref(), Some(raw));
    }

    #[test]
    fn test_invalid_numeric_versions_are_unsupported() {
        for raw in [
            r#"{"version":0,"data":{"name":"A"}}"#,
            r#"{"version":-1,"data":{"name":"A"}}"#,
            r#"{"version":1.5,"data":{"name":"A"}}"#,
            r#"{"version":1e10,"data":{"name":"A"}}"#,
            r#"{"version":4294967297,"data":{"name":"A"}}"#,
        ] {
            let shown = serde_json::from_str::<Value>(raw).unwrap()["version"].to_string();
            let store = Arc::new(MemoryStore::with_entries([("draft", raw)]));
            let facade = facade(store.clone(), add_flag_registry(), ErrorPolicy::Propagate);

            let err = facade.load_value("draft").unwrap_err();
            assert_eq!(
                err,
                FolioError::UnsupportedVersion {
                    version: shown,
                    min_supported: 1,
                    current: 2
                },
                "{}",
                raw
            );

            let info = facade.inspect("draft").unwrap().unwrap();
            assert!(!info.supported, "{}", raw);
            assert!(!info.needs_migration, "{}", raw);

            // neither migrated nor backed up nor rewritten
            assert_eq!(store.keys().unwrap(), vec!["draft"], "{}", raw);
            assert_eq!(store.get("draft").unwrap().as_deref(), Some(raw));
        }
    }

    #[test]
    fn test_invalid_numeric_version_recovers_to_none() {
        let raw = r#"{"version":0,"data":{"name":"A"}}"#;
        let store = Arc::new(MemoryStore::with_entries([("draft", raw)]));
        let facade = facade(store.clone(), add_flag_registry(), ErrorPolicy::Recover);

        assert_eq!(facade.load_value("draft").unwrap(), None);
        assert_eq!(store.get("draft").unwrap().as_deref(), Some(raw));
    }

    #[test]
    fn test_type_mismatch_is_not_swallowed_by_recover() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Named {
            name: String,
        }

        let store = Arc::new(MemoryStore::new());
        let facade = facade(store, MigrationRegistry::new(), ErrorPolicy::Recover);
        facade.save("draft", &json!({"title": "no name here"})).unwrap();

        let err = facade.load::<Named>("draft").unwrap_err();
        assert!(matches!(err, FolioError::Serialization { .. }), "{:?}", err);
    }

    #[test]
    fn test_failed_migration_recovers_with_backup_keys() {
        let store = Arc::new(MemoryStore::with_entries([("draft", "[1,2,3]")]));
        let facade = facade(store, add_flag_registry(), ErrorPolicy::Recover);

        match facade.load_detailed::<Value>("draft").unwrap() {
            LoadOutcome::Unrecoverable { backup_keys, .. } => {
                assert_eq!(backup_keys.len(), 1);
                assert!(backup_keys[0].starts_with("draft_backup_v1_"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_failed_migration_propagates_in_development() {
        let store = Arc::new(MemoryStore::with_entries([("draft", "[1,2,3]")]));
        let facade = facade(store, add_flag_registry(), ErrorPolicy::Propagate);

        assert!(facade.load_value("draft").unwrap_err().is_migration());
    }

    #[test]
    fn test_quota_rejection_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let config = StorageConfig {
            quota_bytes: 64,
            warning_threshold_bytes: 32,
            ..StorageConfig::default()
        };
        let facade = PersistenceFacade::new(store.clone(), Arc::new(MigrationRegistry::new()), &config);

        let big: String = (0..2000).map(|i| char::from_u32(0x4E00 + i).unwrap()).collect();
        let err = facade.save("draft", &big).unwrap_err();

        assert!(err.is_quota_exceeded());
        assert!(store.is_empty());
    }

    #[test]
    fn test_overwrite_does_not_count_old_value() {
        let store = Arc::new(MemoryStore::new());
        let facade = facade(store, MigrationRegistry::new(), ErrorPolicy::Propagate);
        let payload = "x".repeat(1024);

        facade.save("draft", &payload).unwrap();
        let first = facade.capacity_status().unwrap().used_bytes;
        facade.save("draft", &payload).unwrap();
        let second = facade.capacity_status().unwrap().used_bytes;

        assert!(second <= first + 64, "first={} second={}", first, second);
    }
}
