//! Typed store over a storage backend.

use crate::backend::StorageBackend;
use crate::error::StorageResult;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// The engine's well-known storage keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKey {
    /// Live (non-archived) record snapshot.
    LiveRecords,
    /// Archived (soft-deleted) record snapshot.
    ArchivedRecords,
    /// Pending-change queue.
    PendingQueue,
    /// Conflict list (resolved and unresolved, audit log).
    Conflicts,
    /// Persisted sync status snapshot.
    SyncStatus,
}

impl StoreKey {
    /// Stable on-disk name of the key.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::LiveRecords => "live_records",
            StoreKey::ArchivedRecords => "archived_records",
            StoreKey::PendingQueue => "pending_queue",
            StoreKey::Conflicts => "conflicts",
            StoreKey::SyncStatus => "sync_status",
        }
    }
}

/// A typed keyed store over an opaque [`StorageBackend`].
///
/// Values are stored as JSON documents. Collection keys that have never
/// been written read back as empty.
pub struct LocalStore {
    backend: Box<dyn StorageBackend>,
}

impl LocalStore {
    /// Creates a store over the given backend.
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Reads the full collection under `key`. A missing key yields an
    /// empty vector.
    pub fn read_all<T: DeserializeOwned>(&self, key: StoreKey) -> StorageResult<Vec<T>> {
        match self.backend.read(key.as_str())? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    /// Replaces the full collection under `key`. Durable on return.
    pub fn write_all<T: Serialize>(&self, key: StoreKey, items: &[T]) -> StorageResult<()> {
        let bytes = serde_json::to_vec(items)?;
        self.backend.write(key.as_str(), &bytes)
    }

    /// Reads a single value under `key`, or `None` if never written.
    pub fn read_value<T: DeserializeOwned>(&self, key: StoreKey) -> StorageResult<Option<T>> {
        match self.backend.read(key.as_str())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Writes a single value under `key`. Durable on return.
    pub fn write_value<T: Serialize>(&self, key: StoreKey, value: &T) -> StorageResult<()> {
        let bytes = serde_json::to_vec(value)?;
        self.backend.write(key.as_str(), &bytes)
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore").finish_non_exhaustive()
    }
}
