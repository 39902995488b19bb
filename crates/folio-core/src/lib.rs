//! Domain types, configuration and error model shared by the Folio crates.

pub mod config;
pub mod error;
pub mod resume;
pub mod store;

// Re-export common types
pub use config::{ErrorPolicy, StorageConfig};
pub use error::{FolioError, Result};
pub use store::KeyValueStore;
