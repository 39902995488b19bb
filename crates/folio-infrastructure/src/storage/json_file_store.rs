//! Durable key-value store kept in a single JSON file.
//!
//! Provides:
//! - **Atomicity**: every write goes to a temp file that is fsynced and then
//!   renamed over the store file
//! - **Isolation**: writers hold an exclusive `fs2` lock on a sibling lock file
//!   and re-read the file under the lock, so a write only replaces its own key
//!
//! There is no coordination beyond that: two processes writing the same key
//! race, and the last writer wins.

use folio_core::KeyValueStore;
use folio_core::error::{FolioError, Result};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

type Entries = BTreeMap<String, String>;

/// Key-value store persisted as one JSON object on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    /// Last state read from or written to disk.
    cache: RwLock<Entries>,
}

impl JsonFileStore {
    /// Opens the store at `path`, creating nothing until the first write.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not a
    /// JSON object of strings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = read_entries(&path)?;
        tracing::debug!("Opened store {} ({} keys)", path.display(), entries.len());
        Ok(Self {
            path,
            cache: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `f` to the on-disk entries under the exclusive lock and
    /// writes the result back atomically.
    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Entries),
    {
        let _lock = FileLock::acquire(&self.path)?;

        let mut entries = read_entries(&self.path)?;
        f(&mut entries);
        write_entries(&self.path, &entries)?;

        *self
            .cache
            .write()
            .map_err(|_| FolioError::store("file store cache lock poisoned"))? = entries;
        Ok(())
    }

    fn read_cache(&self) -> Result<std::sync::RwLockReadGuard<'_, Entries>> {
        self.cache
            .read()
            .map_err(|_| FolioError::store("file store cache lock poisoned"))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_cache()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.read_cache()?.keys().cloned().collect())
    }
}

/// Reads the store file. A missing or blank file is an empty store.
fn read_entries(path: &Path) -> Result<Entries> {
    if !path.exists() {
        return Ok(Entries::new());
    }

    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Entries::new());
    }

    Ok(serde_json::from_str(&content)?)
}

/// Writes the store file via temp file + fsync + rename.
fn write_entries(path: &Path, entries: &Entries) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string(entries)?;

    let tmp_path = temp_path(path)?;
    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(json.as_bytes())?;
    tmp_file.sync_all()?;
    drop(tmp_file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| FolioError::io(format!("store path has no file name: {}", path.display())))?;
    let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
    Ok(path.with_file_name(tmp_name))
}

/// A file lock guard that releases the lock when dropped.
struct FileLock {
    file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        fs2::FileExt::lock_exclusive(&file)
            .map_err(|e| FolioError::store(format!("Failed to acquire lock: {}", e)))?;

        Ok(FileLock { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Best effort. The lock is also released when the handle closes.
        let _ = fs2::FileExt::unlock(&self.file);
    }
}
