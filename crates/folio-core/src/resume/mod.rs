//! Resume domain module.
//!
//! The persistence engine treats the resume as an opaque JSON document. This
//! module only models the fields the engine's own migrations introduce, plus
//! the named snapshot list kept next to the working draft.
//!
//! # Module Structure
//!
//! - `model`: `ResumeDocument`, `OptimizationRecord`, `SavedVersion`
//! - `repository`: Repository trait for draft and snapshot persistence

mod model;
mod repository;

pub use model::{OptimizationRecord, ResumeDocument, SavedVersion};
pub use repository::ResumeRepository;

/// Store key of the working draft.
pub const DRAFT_STORAGE_KEY: &str = "resumeBuilderDraft";

/// Store key of the named snapshot list.
pub const SNAPSHOTS_STORAGE_KEY: &str = "resumeBuilderSnapshots";
