//! Resume repository trait.

use super::model::{ResumeDocument, SavedVersion};
use crate::error::Result;

/// Repository for the working resume draft and its named snapshots.
pub trait ResumeRepository: Send + Sync {
    /// Loads the working draft, migrating older records first.
    ///
    /// Returns `Ok(None)` when nothing was saved yet.
    fn load_draft(&self) -> Result<Option<ResumeDocument>>;

    /// Saves the working draft at the current schema version.
    fn save_draft(&self, document: &ResumeDocument) -> Result<()>;

    /// Stores a named snapshot of `document` and saves it as the draft.
    ///
    /// The newest snapshot comes first; the list is truncated to the
    /// configured snapshot limit.
    fn save_snapshot(&self, name: &str, document: &ResumeDocument) -> Result<SavedVersion>;

    /// Lists stored snapshots, newest first.
    fn list_snapshots(&self) -> Result<Vec<SavedVersion>>;

    /// Makes the snapshot with `id` the working draft and returns it.
    fn restore_snapshot(&self, id: &str) -> Result<ResumeDocument>;
}
