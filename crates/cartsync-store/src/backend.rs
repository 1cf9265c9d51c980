//! Raw storage backends.
//!
//! Backends only move strings around. Envelopes, expiry and typed access
//! live in [`Store`](crate::Store).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::StoreError;

/// A string key/value backend, the analogue of browser local or session
/// storage.
pub trait StorageBackend {
    /// Read the raw value for `key`.
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write the raw value for `key`, replacing any previous value.
    fn write(&mut self, key: &str, value: String) -> Result<(), StoreError>;

    /// Delete `key`. Deleting a missing key is not an error.
    fn delete(&mut self, key: &str) -> Result<(), StoreError>;

    /// All keys currently held.
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// In-memory backend.
///
/// Mirrors session storage: contents live as long as the backend does. An
/// optional byte quota (keys plus values) reproduces the quota errors that
/// browsers raise.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
}

impl MemoryBackend {
    /// Create an empty backend without a quota.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty backend limited to `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            quota: Some(bytes),
        }
    }

    /// Change the quota. `None` removes the limit.
    pub fn set_quota(&mut self, quota: Option<usize>) {
        self.quota = quota;
    }

    /// Insert a raw value, bypassing the quota.
    pub fn insert_raw(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the backend holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        if let Some(limit) = self.quota {
            let needed = self.used_bytes_without(key) + key.len() + value.len();
            if needed > limit {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// File-backed backend.
///
/// Mirrors local storage: the whole map is a single JSON object on disk,
/// rewritten on every mutation so a new process sees the last write.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileBackend {
    /// Open the file at `path`, creating parent directories as needed.
    ///
    /// A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let entries = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self { path, entries })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        self.persist()
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_round_trip() {
        let mut backend = MemoryBackend::new();
        backend.write("a", "1".to_string()).unwrap();
        assert_eq!(backend.read("a").unwrap(), Some("1".to_string()));

        backend.delete("a").unwrap();
        assert_eq!(backend.read("a").unwrap(), None);
    }

    #[test]
    fn test_memory_quota_rejects_oversized_write() {
        let mut backend = MemoryBackend::with_quota(10);
        backend.write("k", "12345".to_string()).unwrap();

        let err = backend.write("other", "123456789".to_string()).unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { limit: 10, .. }));
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_memory_quota_counts_replacement_once() {
        let mut backend = MemoryBackend::with_quota(6);
        backend.write("k", "12345".to_string()).unwrap();
        // Overwriting the same key frees its previous bytes first.
        backend.write("k", "54321".to_string()).unwrap();
        assert_eq!(backend.read("k").unwrap(), Some("54321".to_string()));
    }

    #[test]
    fn test_file_backend_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.write("cartItems", "[]".to_string()).unwrap();
        drop(backend);

        let reopened = FileBackend::open(&path).unwrap();
        assert_eq!(reopened.read("cartItems").unwrap(), Some("[]".to_string()));
        assert_eq!(reopened.keys().unwrap(), vec!["cartItems".to_string()]);
    }

    #[test]
    fn test_file_backend_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            FileBackend::open(&path),
            Err(StoreError::Serialize(_))
        ));
    }
}
