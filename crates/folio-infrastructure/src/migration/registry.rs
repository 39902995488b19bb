//! Migration registry for building linear migration chains.
//!
//! Each source version maps to exactly one migration, so the upgrade path
//! from any version is a simple linked list: v1 → v2 → v3 → ...
//! Duplicate registrations are rejected up front rather than discovered when
//! a record is loaded.

use super::traits::Migration;
use folio_core::error::{FolioError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registry mapping a source version to the migration that upgrades it.
///
/// # Example
///
/// ```ignore
/// let mut registry = MigrationRegistry::new();
/// registry.register(Arc::new(V1ToV2))?;  // 1 → 2
/// registry.register(Arc::new(V2ToV3))?;  // 2 → 3
///
/// let path = registry.build_path(1, 3)?; // [V1ToV2, V2ToV3]
/// ```
#[derive(Debug, Default)]
pub struct MigrationRegistry {
    migrations: BTreeMap<u32, Arc<dyn Migration>>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a single migration.
    ///
    /// # Errors
    ///
    /// Returns `FolioError::DuplicateMigration` if a migration for the same
    /// source version is already registered.
    pub fn register(&mut self, migration: Arc<dyn Migration>) -> Result<()> {
        let from = migration.from_version();
        if let Some(existing) = self.migrations.get(&from) {
            tracing::error!(
                "Rejected migration '{}': v{} already handled by '{}'",
                migration.name(),
                from,
                existing.name()
            );
            return Err(FolioError::DuplicateMigration {
                from_version: from,
                name: migration.name().to_string(),
            });
        }

        if migration.to_version() != from + 1 {
            tracing::warn!(
                "Migration '{}' jumps from v{} to v{}",
                migration.name(),
                from,
                migration.to_version()
            );
        }

        tracing::debug!(
            "Registered migration '{}' (v{} -> v{})",
            migration.name(),
            from,
            migration.to_version()
        );
        self.migrations.insert(from, migration);
        Ok(())
    }

    /// Registers multiple migrations, stopping at the first rejected one.
    pub fn register_all(&mut self, migrations: Vec<Arc<dyn Migration>>) -> Result<()> {
        for migration in migrations {
            self.register(migration)?;
        }
        Ok(())
    }

    /// Returns true if no migrations are registered.
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Returns the number of registered migrations.
    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    /// Source versions that have a registered migration, ascending.
    pub fn available_migrations(&self) -> Vec<u32> {
        self.migrations.keys().copied().collect()
    }

    /// Registered migrations ordered by source version.
    pub fn migrations(&self) -> impl Iterator<Item = &Arc<dyn Migration>> {
        self.migrations.values()
    }

    /// Builds the ordered chain of migrations from `from_version` to `to_version`.
    ///
    /// Walks the chain link by link starting at `from_version`; migrations
    /// that are not reachable from it are never included. Returns an empty
    /// path when `from_version >= to_version`.
    ///
    /// # Errors
    ///
    /// Returns `FolioError::Migration` when a link is missing, when a step
    /// does not move forward, or when a step overshoots `to_version`.
    pub fn build_path(&self, from_version: u32, to_version: u32) -> Result<Vec<Arc<dyn Migration>>> {
        if from_version >= to_version {
            return Ok(Vec::new());
        }

        let mut current = from_version;
        let mut path = Vec::new();

        while current < to_version {
            let next = self.migrations.get(&current).ok_or_else(|| {
                FolioError::migration(
                    current,
                    to_version,
                    format!(
                        "No migration path from v{} to v{} (available: {:?})",
                        current,
                        current + 1,
                        self.available_migrations()
                    ),
                )
            })?;

            let next_version = next.to_version();
            if next_version <= current {
                return Err(FolioError::migration(
                    current,
                    next_version,
                    format!("Migration '{}' does not advance the version", next.name()),
                ));
            }
            if next_version > to_version {
                return Err(FolioError::migration(
                    current,
                    to_version,
                    format!(
                        "Migration '{}' targets v{}, beyond v{}",
                        next.name(),
                        next_version,
                        to_version
                    ),
                ));
            }

            path.push(Arc::clone(next));
            current = next_version;
        }

        Ok(path)
    }
}
