//! String key-value persistence backing the session store.

use std::{
    collections::BTreeMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Failures raised by a [`KeyValueStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage io error at {path}: {source}")]
    Io {
        /// File involved in the failed operation.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The backing file does not hold a JSON object of strings.
    #[error("storage file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Minimal async-storage style interface: string keys to string values.
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process store, used by tests and as a fallback when no data directory exists.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// JSON-object file on disk. Every write replaces the file atomically.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Store backed by the file at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(source) => Err(StorageError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(io_err)?;

        let serialized = serde_json::to_vec_pretty(entries)?;
        let mut file = NamedTempFile::new_in(parent).map_err(io_err)?;
        file.write_all(&serialized).map_err(io_err)?;
        file.persist(&self.path)
            .map_err(|err| io_err(err.error))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock();
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_store_persists_across_instances() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested/session.json");

        let store = FileStore::new(&path);
        assert_eq!(store.get("token")?, None);
        store.set("token", "abc")?;
        store.set("isLoggedIn", "true")?;

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("token")?.as_deref(), Some("abc"));
        reopened.remove("token")?;
        reopened.remove("token")?;
        assert_eq!(store.get("token")?, None);
        assert_eq!(store.get("isLoggedIn")?.as_deref(), Some("true"));
        Ok(())
    }

    #[test]
    fn corrupt_file_is_reported() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("session.json");
        fs::write(&path, "not json")?;

        let store = FileStore::new(&path);
        assert!(matches!(store.get("user"), Err(StorageError::Corrupt(_))));
        Ok(())
    }
}
