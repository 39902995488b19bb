//! Schema migration framework for Folio.
//!
//! Stored records carry the schema version they were written at. When a
//! record older than the current version is loaded, the runner walks a linear
//! chain of single-step migrations up to the current version:
//!
//! - Each source version has at most one migration (checked on registration)
//! - Steps run in order, none is skipped
//! - The pre-migration record is backed up before the first step
//! - Transforms build new values and never modify their input
//!
//! # Architecture
//!
//! ```text
//! MigrationManager
//!   ├── ResumeDraft registry      (v1 → v2)
//!   └── ResumeSnapshots registry  (v1 → v2)
//!            │
//!            V
//!     MigrationRunner ── backup ──> "{key}_backup_v{from}_{millis}"
//!            │
//!            V
//!     transform, transform, ...
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let manager = migration::build_migration_manager()?;
//! let facade = PersistenceFacade::new(store, manager.registry(Entity::ResumeDraft), &config);
//! let draft: Option<ResumeDocument> = facade.load(DRAFT_STORAGE_KEY)?;
//! ```

mod manager;
mod registry;
pub mod resume;
mod runner;
mod traits;

// Public API
pub use manager::{Entity, MigrationManager, MigrationManagerBuilder};
pub use registry::MigrationRegistry;
pub use runner::{BackupEntry, MigrationRunner, backup_key, parse_backup_key};
pub use traits::{FnMigration, Migration, Typed, TypedMigration};

use folio_core::error::Result;

/// Builds a `MigrationManager` with every entity's migrations registered.
///
/// Call once at startup and share the result.
///
/// # Errors
///
/// Returns an error if any registration is rejected (duplicate source
/// version) or an entity is left without a registry.
pub fn build_migration_manager() -> Result<MigrationManager> {
    let resume_draft_registry = {
        let mut registry = MigrationRegistry::new();
        resume::register_resume_migrations(&mut registry)?;
        registry
    };

    let resume_snapshots_registry = {
        let mut registry = MigrationRegistry::new();
        resume::register_snapshot_migrations(&mut registry)?;
        registry
    };

    MigrationManager::builder()
        .with_resume_draft_registry(resume_draft_registry)
        .with_resume_snapshots_registry(resume_snapshots_registry)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::config::CURRENT_VERSION;

    #[test]
    fn test_build_migration_manager() {
        let manager = build_migration_manager().expect("manager should build");

        for entity in Entity::all() {
            let registry = manager.registry(*entity);
            let path = registry.build_path(1, CURRENT_VERSION).unwrap();
            assert_eq!(path.len(), (CURRENT_VERSION - 1) as usize, "{:?}", entity);
        }
    }
}
