//! Persistence engine for folio: compression, capacity accounting, versioned
//! envelopes and schema migrations over a pluggable key-value store.

pub mod capacity;
pub mod codec;
pub mod config_loader;
pub mod envelope;
pub mod migration;
pub mod paths;
pub mod persistence;
pub mod resume_repository;
pub mod storage;

pub use crate::capacity::{CapacityMonitor, CapacityStatus, QuotaCheck};
pub use crate::migration::{Entity, MigrationManager, MigrationRegistry, build_migration_manager};
pub use crate::paths::FolioPaths;
pub use crate::persistence::{LoadOutcome, PersistenceFacade, RecordInfo};
pub use crate::resume_repository::StoreResumeRepository;
pub use crate::storage::{JsonFileStore, MemoryStore};
