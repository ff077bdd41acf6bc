//! Storage backend trait definition.

use crate::error::StorageResult;

/// A low-level keyed storage backend.
///
/// Storage backends are **opaque byte stores**. They map string keys to
/// byte blobs and know nothing about records, queues, or conflicts — the
/// engine owns all interpretation.
///
/// # Invariants
///
/// - `read` returns exactly the bytes most recently written for that key
/// - `write` is durable on return: after it succeeds, the data survives
///   process termination
/// - writing a key replaces any previous value wholesale
/// - Backends must be `Send + Sync` for shared access
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] — for testing
/// - [`super::FileBackend`] — for persistent storage
pub trait StorageBackend: Send + Sync {
    /// Reads the value stored under `key`, or `None` if the key has never
    /// been written.
    fn read(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Writes `data` under `key`, replacing any previous value.
    ///
    /// After this returns successfully the data is durable.
    fn write(&self, key: &str, data: &[u8]) -> StorageResult<()>;

    /// Removes the value stored under `key`. Removing a missing key is
    /// not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Returns all keys currently present, in unspecified order.
    fn keys(&self) -> StorageResult<Vec<String>>;
}
