//! Session-scoped key/value storage backends.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Errors raised when writing to session storage.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session storage is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// String key/value storage that lives for one session.
///
/// Reads never fail: a missing or unreadable entry is `None`.
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;

    /// # Errors
    /// Returns an error if the backend cannot persist the value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// # Errors
    /// Returns an error if the backend cannot persist the removal.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-lifetime storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Storage backed by a JSON object on disk.
///
/// Survives process restarts for as long as the file is kept; deleting the
/// file ends the session. Written with `0o600` permissions on Unix.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        #[cfg(unix)]
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&self.path)?;

        #[cfg(not(unix))]
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;

        let json = serde_json::to_string_pretty(entries)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    fn update(
        &self,
        apply: impl FnOnce(&mut HashMap<String, String>),
    ) -> Result<(), StorageError> {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        // A corrupt file is replaced rather than blocking every later write.
        let mut entries = self.read_all().unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), "Discarding unreadable session file: {e}");
            HashMap::new()
        });
        apply(&mut entries);
        self.write_all(&entries)
    }
}

impl SessionStorage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        match self.read_all() {
            Ok(mut entries) => entries.remove(key),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Failed to read session file: {e}");
                None
            }
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}
