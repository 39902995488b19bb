pub mod backups;
pub mod config;
pub mod record;
pub mod status;

use anyhow::{Context as _, Result};
use folio_core::KeyValueStore;
use folio_core::config::StorageConfig;
use folio_infrastructure::config_loader::load_config;
use folio_infrastructure::{
    CapacityMonitor, CapacityStatus, Entity, FolioPaths, JsonFileStore, MigrationManager, MigrationRegistry, PersistenceFacade,
    build_migration_manager,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a command needs: the opened store, its config and migrations.
pub struct Context {
    pub store: Arc<dyn KeyValueStore>,
    pub store_path: PathBuf,
    pub config_path: PathBuf,
    pub config: StorageConfig,
    manager: MigrationManager,
}

impl Context {
    pub fn open(store: Option<PathBuf>, config: Option<PathBuf>) -> Result<Self> {
        let config_path = match config {
            Some(path) => path,
            None => FolioPaths::config_file().context("Failed to resolve config path")?,
        };
        let config = load_config(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

        let store_path = match store {
            Some(path) => path,
            None => FolioPaths::store_file().context("Failed to resolve store path")?,
        };
        let file_store = JsonFileStore::open(&store_path)
            .with_context(|| format!("Failed to open store {}", store_path.display()))?;

        let manager = build_migration_manager().context("Failed to register migrations")?;

        tracing::debug!(
            "Using store {} with config {}",
            store_path.display(),
            config_path.display()
        );

        Ok(Self {
            store: Arc::new(file_store),
            store_path,
            config_path,
            config,
            manager,
        })
    }

    /// Usage of the whole store against the configured quota.
    pub fn capacity_status(&self) -> Result<CapacityStatus> {
        Ok(CapacityMonitor::new(self.config.capacity_limits()).status(self.store.as_ref())?)
    }

    /// Facade for `key`, using the registry of the entity stored there.
    ///
    /// Keys no entity owns get an empty registry, so only current-version
    /// records of those keys can be read.
    pub fn facade_for(&self, key: &str) -> PersistenceFacade {
        let registry = Entity::all()
            .iter()
            .find(|entity| entity.storage_key() == key)
            .map(|entity| self.manager.registry(*entity))
            .unwrap_or_else(|| Arc::new(MigrationRegistry::new()));

        PersistenceFacade::new(Arc::clone(&self.store), registry, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::resume::DRAFT_STORAGE_KEY;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    #[test]
    fn test_open_with_missing_files_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = Context::open(
            Some(temp_dir.path().join("store.json")),
            Some(temp_dir.path().join("config.toml")),
        )
        .unwrap();

        assert_eq!(ctx.config, StorageConfig::default());
        assert!(ctx.store.keys().unwrap().is_empty());
        assert_eq!(ctx.capacity_status().unwrap().used_bytes, 0);
    }

    #[test]
    fn test_facade_for_entity_key_migrates() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = Context::open(
            Some(temp_dir.path().join("store.json")),
            Some(temp_dir.path().join("config.toml")),
        )
        .unwrap();
        ctx.store.set(DRAFT_STORAGE_KEY, r#"{"name":"A"}"#).unwrap();

        let loaded: Value = ctx
            .facade_for(DRAFT_STORAGE_KEY)
            .load(DRAFT_STORAGE_KEY)
            .unwrap()
            .unwrap();
        assert_eq!(loaded["atsOptimized"], json!(false));
    }

    #[test]
    fn test_facade_for_other_key_has_no_migrations() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = Context::open(
            Some(temp_dir.path().join("store.json")),
            Some(temp_dir.path().join("config.toml")),
        )
        .unwrap();
        ctx.store.set("notes", r#"{"text":"hi"}"#).unwrap();

        let err = ctx.facade_for("notes").load::<Value>("notes").unwrap_err();
        assert!(err.is_migration());
    }
}
