//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::error::StorageResult;
use parking_lot::RwLock;
use std::collections::HashMap;

/// An in-memory storage backend.
///
/// Stores all data in memory; suitable for unit tests, integration tests,
/// and ephemeral engines that do not need persistence.
///
/// # Thread Safety
///
/// This backend is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use fieldsync_store::{InMemoryBackend, StorageBackend};
///
/// let backend = InMemoryBackend::new();
/// backend.write("queue", b"[]").unwrap();
/// assert_eq!(backend.read("queue").unwrap(), Some(b"[]".to_vec()));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend pre-populated with entries.
    ///
    /// Useful for testing restart/recovery scenarios.
    #[must_use]
    pub fn with_entries(entries: HashMap<String, Vec<u8>>) -> Self {
        Self {
            data: RwLock::new(entries),
        }
    }

    /// Returns a copy of all entries. Useful for assertions.
    #[must_use]
    pub fn entries(&self) -> HashMap<String, Vec<u8>> {
        self.data.read().clone()
    }

    /// Clears all entries.
    pub fn clear(&self) {
        self.data.write().clear();
    }
}

impl StorageBackend for InMemoryBackend {
    fn read(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn write(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        self.data.write().insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.data.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.data.read().keys().cloned().collect())
    }
}
