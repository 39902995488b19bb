//! Executes migration chains with a mandatory pre-migration backup.
//!
//! Rules:
//! 1. The backup is written before any transform runs, even when the chain
//!    turns out to be empty.
//! 2. Transforms never touch their input; each one returns a new value.
//! 3. A failing step aborts the run. Nothing is skipped.

use super::registry::MigrationRegistry;
use crate::envelope;
use chrono::Utc;
use folio_core::KeyValueStore;
use folio_core::error::{FolioError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A backup record discovered in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    pub key: String,
    pub from_version: u32,
    pub created_at_millis: i64,
}

/// Derived store key of a backup: `{key}_backup_v{from_version}_{millis}`.
pub fn backup_key(key: &str, from_version: u32, millis: i64) -> String {
    format!("{}_backup_v{}_{}", key, from_version, millis)
}

/// Parses a backup key belonging to `key`.
///
/// Returns `None` for keys of other records or keys that do not follow the
/// naming pattern exactly.
pub fn parse_backup_key(key: &str, candidate: &str) -> Option<BackupEntry> {
    let rest = candidate.strip_prefix(key)?.strip_prefix("_backup_v")?;
    let (version, millis) = rest.split_once('_')?;
    if version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(BackupEntry {
        key: candidate.to_string(),
        from_version: version.parse().ok()?,
        created_at_millis: millis.parse().ok()?,
    })
}

/// Runs a migration chain for one record.
pub struct MigrationRunner {
    store: Arc<dyn KeyValueStore>,
    registry: Arc<MigrationRegistry>,
}

impl MigrationRunner {
    pub fn new(store: Arc<dyn KeyValueStore>, registry: Arc<MigrationRegistry>) -> Self {
        Self { store, registry }
    }

    /// Writes `raw` under a fresh backup key and returns that key.
    ///
    /// Never overwrites an existing backup: if the millisecond key is taken,
    /// the timestamp is advanced until a free key is found.
    pub fn create_backup(&self, key: &str, raw: &str, from_version: u32) -> Result<String> {
        let mut millis = Utc::now().timestamp_millis();
        let mut candidate = backup_key(key, from_version, millis);
        while self.store.get(&candidate)?.is_some() {
            millis += 1;
            candidate = backup_key(key, from_version, millis);
        }

        self.store.set(&candidate, raw)?;
        tracing::info!("Backup created: {}", candidate);
        Ok(candidate)
    }

    /// Upgrades the record `raw` (stored under `key`) from `from_version`
    /// to `to_version` and returns the migrated payload.
    ///
    /// `raw` is the decoded JSON text of the record, with or without an
    /// envelope.
    ///
    /// # Errors
    ///
    /// - Store errors while writing the backup
    /// - `FolioError::Migration` for a missing link or a failing transform
    /// - `FolioError::Migration` if `raw` is not JSON
    pub fn run_migration(
        &self,
        key: &str,
        raw: &str,
        from_version: u32,
        to_version: u32,
    ) -> Result<Value> {
        self.create_backup(key, raw, from_version)?;

        let path = self.registry.build_path(from_version, to_version)?;
        let parsed: Value = serde_json::from_str(raw).map_err(|e| {
            FolioError::migration(
                from_version,
                to_version,
                format!("stored record is not valid JSON: {}", e),
            )
        })?;
        let mut current = envelope::payload_of(parsed);

        if path.is_empty() {
            tracing::debug!(
                "No migration steps for '{}' (v{} -> v{})",
                key,
                from_version,
                to_version
            );
            return Ok(current);
        }

        tracing::info!(
            "Starting migration of '{}' from v{} to v{} ({} steps)",
            key,
            from_version,
            to_version,
            path.len()
        );

        for (i, migration) in path.iter().enumerate() {
            tracing::info!(
                "Migration step {}/{}: v{} -> v{} ({})",
                i + 1,
                path.len(),
                migration.from_version(),
                migration.to_version(),
                migration.name()
            );

            current = migration.transform(&current).map_err(|e| {
                FolioError::migration(
                    migration.from_version(),
                    migration.to_version(),
                    format!(
                        "Migration v{}→v{} ({}) failed: {:#}",
                        migration.from_version(),
                        migration.to_version(),
                        migration.name(),
                        e
                    ),
                )
            })?;
        }

        tracing::info!(
            "Migration completed successfully: '{}' v{} -> v{}",
            key,
            from_version,
            to_version
        );

        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::traits::{FnMigration, Migration};
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn add_field(from: u32, field: &'static str) -> Arc<dyn Migration> {
        Arc::new(FnMigration::new(from, from + 1, format!("add-{}", field), move |data: &Value| {
            let mut next = data
                .as_object()
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("expected an object"))?;
            next.insert(field.to_string(), json!(true));
            Ok(Value::Object(next))
        }))
    }

    fn runner_with(migrations: Vec<Arc<dyn Migration>>) -> (Arc<MemoryStore>, MigrationRunner) {
        let store = Arc::new(MemoryStore::new());
        let mut registry = MigrationRegistry::new();
        registry.register_all(migrations).unwrap();
        let runner = MigrationRunner::new(store.clone(), Arc::new(registry));
        (store, runner)
    }

    fn backups(store: &MemoryStore, key: &str) -> Vec<(BackupEntry, String)> {
        store
            .keys()
            .unwrap()
            .into_iter()
            .filter_map(|k| parse_backup_key(key, &k))
            .map(|entry| {
                let value = store.get(&entry.key).unwrap().unwrap();
                (entry, value)
            })
            .collect()
    }

    #[test]
    fn test_backup_key_round_trip() {
        let key = backup_key("draft", 1, 1_700_000_000_000);
        assert_eq!(key, "draft_backup_v1_1700000000000");

        let entry = parse_backup_key("draft", &key).unwrap();
        assert_eq!(entry.from_version, 1);
        assert_eq!(entry.created_at_millis, 1_700_000_000_000);

        assert!(parse_backup_key("other", &key).is_none());
        assert!(parse_backup_key("draft", "draft_backup_vx_1").is_none());
        assert!(parse_backup_key("draft", "draft_backup_v1_").is_none());
    }

    #[test]
    fn test_backup_precedes_migration() {
        let (store, runner) = runner_with(vec![add_field(1, "a"), add_field(2, "b")]);
        let raw = r#"{"version":1,"data":{"name":"A"}}"#;

        let migrated = runner.run_migration("draft", raw, 1, 3).unwrap();
        assert_eq!(migrated, json!({"name": "A", "a": true, "b": true}));

        let found = backups(&store, "draft");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0.from_version, 1);
        assert_eq!(found[0].1, raw);
    }

    #[test]
    fn test_empty_path_still_backs_up() {
        let (store, runner) = runner_with(vec![]);
        let raw = r#"{"version":2,"data":[1,2]}"#;

        let data = runner.run_migration("draft", raw, 2, 2).unwrap();
        assert_eq!(data, json!([1, 2]));
        assert_eq!(backups(&store, "draft").len(), 1);
    }

    #[test]
    fn test_legacy_payload_is_migrated_whole() {
        let (_, runner) = runner_with(vec![add_field(1, "a")]);

        let migrated = runner.run_migration("draft", r#"{"name":"A"}"#, 1, 2).unwrap();
        assert_eq!(migrated, json!({"name": "A", "a": true}));
    }

    #[test]
    fn test_failing_step_names_version_pair() {
        let (store, runner) = runner_with(vec![add_field(1, "a")]);

        let err = runner.run_migration("draft", "[1,2,3]", 1, 2).unwrap_err();
        match err {
            FolioError::Migration {
                from_version,
                to_version,
                message,
            } => {
                assert_eq!((from_version, to_version), (1, 2));
                assert!(message.contains("expected an object"), "message: {}", message);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // the backup is kept even though the run failed
        assert_eq!(backups(&store, "draft").len(), 1);
    }

    #[test]
    fn test_missing_link_fails_after_backup() {
        let (store, runner) = runner_with(vec![add_field(1, "a")]);

        let err = runner.run_migration("draft", r#"{"name":"A"}"#, 1, 3).unwrap_err();
        assert!(err.is_migration());
        assert_eq!(backups(&store, "draft").len(), 1);
    }

    #[test]
    fn test_backups_are_never_overwritten() {
        let (store, runner) = runner_with(vec![]);

        let first = runner.create_backup("draft", "one", 1).unwrap();
        let second = runner.create_backup("draft", "two", 1).unwrap();
        assert_ne!(first, second);
        assert_eq!(store.get(&first).unwrap().as_deref(), Some("one"));
        assert_eq!(store.get(&second).unwrap().as_deref(), Some("two"));
    }
}
