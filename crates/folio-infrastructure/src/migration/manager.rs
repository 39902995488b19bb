//! Central manager for all entity migrations.
//!
//! Each stored record type has its own registry, because the same version
//! number means a different payload shape for each of them (a v1 draft is a
//! resume object, a v1 snapshot list is an array). When adding an entity:
//!
//! 1. Add a variant to `Entity` and to `Entity::all()`
//! 2. Add a registry field and a `with_*_registry()` builder method
//! 3. Extract it in `MigrationManagerBuilder::build()`
//!
//! The exhaustive match in `MigrationManager::registry()` points at anything
//! that was forgotten.

use super::registry::MigrationRegistry;
use folio_core::error::{FolioError, Result};
use folio_core::resume::{DRAFT_STORAGE_KEY, SNAPSHOTS_STORAGE_KEY};
use std::sync::Arc;

/// All stored records that support schema migrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    /// The working resume draft
    ResumeDraft,
    /// The list of named resume snapshots
    ResumeSnapshots,
}

impl Entity {
    pub const fn all() -> &'static [Entity] {
        &[Entity::ResumeDraft, Entity::ResumeSnapshots]
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Entity::ResumeDraft => "ResumeDraft",
            Entity::ResumeSnapshots => "ResumeSnapshots",
        }
    }

    /// Store key the entity is persisted under.
    pub const fn storage_key(&self) -> &'static str {
        match self {
            Entity::ResumeDraft => DRAFT_STORAGE_KEY,
            Entity::ResumeSnapshots => SNAPSHOTS_STORAGE_KEY,
        }
    }
}

/// Registries for every entity, shared read-only after bootstrap.
#[derive(Debug, Clone)]
pub struct MigrationManager {
    resume_draft_registry: Arc<MigrationRegistry>,
    resume_snapshots_registry: Arc<MigrationRegistry>,
}

impl MigrationManager {
    pub fn builder() -> MigrationManagerBuilder {
        MigrationManagerBuilder::new()
    }

    pub fn registry(&self, entity: Entity) -> Arc<MigrationRegistry> {
        match entity {
            Entity::ResumeDraft => Arc::clone(&self.resume_draft_registry),
            Entity::ResumeSnapshots => Arc::clone(&self.resume_snapshots_registry),
        }
    }

    /// Logs the registered chain of every entity.
    pub fn validate(&self) -> Result<()> {
        for entity in Entity::all() {
            let registry = self.registry(*entity);
            if registry.is_empty() {
                tracing::warn!("{} migration registry is empty", entity.name());
            } else {
                tracing::debug!(
                    "{} registry: {} migrations registered (from {:?})",
                    entity.name(),
                    registry.len(),
                    registry.available_migrations()
                );
            }
        }
        Ok(())
    }
}

/// Builder ensuring every entity gets a registry.
#[derive(Default)]
pub struct MigrationManagerBuilder {
    resume_draft_registry: Option<MigrationRegistry>,
    resume_snapshots_registry: Option<MigrationRegistry>,
}

impl MigrationManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resume_draft_registry(mut self, registry: MigrationRegistry) -> Self {
        self.resume_draft_registry = Some(registry);
        self
    }

    pub fn with_resume_snapshots_registry(mut self, registry: MigrationRegistry) -> Self {
        self.resume_snapshots_registry = Some(registry);
        self
    }

    /// Builds the manager.
    ///
    /// # Errors
    ///
    /// Returns `FolioError::Config` naming the first entity without a registry.
    pub fn build(self) -> Result<MigrationManager> {
        let resume_draft_registry = self
            .resume_draft_registry
            .ok_or_else(|| FolioError::config("ResumeDraft migration registry not set"))?;

        let resume_snapshots_registry = self
            .resume_snapshots_registry
            .ok_or_else(|| FolioError::config("ResumeSnapshots migration registry not set"))?;

        let manager = MigrationManager {
            resume_draft_registry: Arc::new(resume_draft_registry),
            resume_snapshots_registry: Arc::new(resume_snapshots_registry),
        };

        manager.validate()?;

        Ok(manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_all_registries() {
        let result = MigrationManagerBuilder::new()
            .with_resume_draft_registry(MigrationRegistry::new())
            .build();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("ResumeSnapshots"));
    }

    #[test]
    fn test_builder_success_with_all_registries() {
        let manager = MigrationManagerBuilder::new()
            .with_resume_draft_registry(MigrationRegistry::new())
            .with_resume_snapshots_registry(MigrationRegistry::new())
            .build()
            .unwrap();

        for entity in Entity::all() {
            assert!(manager.registry(*entity).is_empty());
        }
    }

    #[test]
    fn test_entity_storage_keys_are_distinct() {
        assert_ne!(
            Entity::ResumeDraft.storage_key(),
            Entity::ResumeSnapshots.storage_key()
        );
    }
}
