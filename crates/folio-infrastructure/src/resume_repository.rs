//! Store-backed ResumeRepository implementation

use crate::migration::{Entity, MigrationManager};
use crate::persistence::PersistenceFacade;
use folio_core::KeyValueStore;
use folio_core::config::StorageConfig;
use folio_core::error::{FolioError, Result};
use folio_core::resume::{
    DRAFT_STORAGE_KEY, ResumeDocument, ResumeRepository, SNAPSHOTS_STORAGE_KEY, SavedVersion,
};
use std::sync::Arc;

/// Resume repository persisting through [`PersistenceFacade`].
///
/// Responsibilities:
/// - Keep the draft and the snapshot list under their own keys
/// - Use the matching migration registry for each key
/// - Maintain snapshot ordering and the snapshot limit
///
/// Does NOT:
/// - Compress, version or migrate anything itself (delegated to the facade)
pub struct StoreResumeRepository {
    drafts: PersistenceFacade,
    snapshots: PersistenceFacade,
    snapshot_limit: usize,
}

impl StoreResumeRepository {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        manager: &MigrationManager,
        config: &StorageConfig,
    ) -> Self {
        Self {
            drafts: PersistenceFacade::new(
                Arc::clone(&store),
                manager.registry(Entity::ResumeDraft),
                config,
            ),
            snapshots: PersistenceFacade::new(
                store,
                manager.registry(Entity::ResumeSnapshots),
                config,
            ),
            snapshot_limit: config.snapshot_limit,
        }
    }

    pub fn snapshot_limit(&self) -> usize {
        self.snapshot_limit
    }
}

impl ResumeRepository for StoreResumeRepository {
    fn load_draft(&self) -> Result<Option<ResumeDocument>> {
        self.drafts.load(DRAFT_STORAGE_KEY)
    }

    fn save_draft(&self, document: &ResumeDocument) -> Result<()> {
        self.drafts.save(DRAFT_STORAGE_KEY, document)
    }

    fn save_snapshot(&self, name: &str, document: &ResumeDocument) -> Result<SavedVersion> {
        let snapshot = SavedVersion::new(name, document.clone());

        let mut list = self.list_snapshots()?;
        list.retain(|existing| existing.id != snapshot.id);
        list.insert(0, snapshot.clone());
        list.truncate(self.snapshot_limit);

        self.snapshots.save(SNAPSHOTS_STORAGE_KEY, &list)?;
        self.save_draft(document)?;

        tracing::info!(
            "Saved snapshot '{}' ({}), {} stored",
            snapshot.name,
            snapshot.id,
            list.len()
        );
        Ok(snapshot)
    }

    fn list_snapshots(&self) -> Result<Vec<SavedVersion>> {
        Ok(self
            .snapshots
            .load::<Vec<SavedVersion>>(SNAPSHOTS_STORAGE_KEY)?
            .unwrap_or_default())
    }

    fn restore_snapshot(&self, id: &str) -> Result<ResumeDocument> {
        let snapshot = self
            .list_snapshots()?
            .into_iter()
            .find(|snapshot| snapshot.id == id)
            .ok_or_else(|| FolioError::not_found("SavedVersion", id))?;

        self.save_draft(&snapshot.data)?;
        tracing::info!("Restored snapshot '{}' ({})", snapshot.name, snapshot.id);
        Ok(snapshot.data)
    }
}
