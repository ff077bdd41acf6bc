//! Durable, coalescing pending-change queue.

use crate::error::SyncResult;
use fieldsync_model::PendingChange;
use fieldsync_store::{LocalStore, StoreKey};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// The append-only, coalescing log of mutations not yet confirmed by the
/// remote store.
///
/// # Invariants
///
/// - At most one entry per record id: a newer mutation replaces the
///   queued entry in place, keeping its queue position.
/// - The full queue is persisted synchronously after every mutation —
///   the only point where crash-safety is guaranteed, so callers enqueue
///   before considering a mutation applied.
/// - There is no cross-record ordering guarantee.
pub struct PendingQueue {
    entries: RwLock<Vec<PendingChange>>,
    store: Arc<LocalStore>,
}

impl PendingQueue {
    /// Loads the queue persisted under [`StoreKey::PendingQueue`].
    pub fn load(store: Arc<LocalStore>) -> SyncResult<Self> {
        let entries = store.read_all(StoreKey::PendingQueue)?;
        Ok(Self {
            entries: RwLock::new(entries),
            store,
        })
    }

    /// Adds a change, replacing any queued entry for the same record.
    ///
    /// Persists the whole queue before returning.
    pub fn enqueue(&self, change: PendingChange) -> SyncResult<()> {
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|e| e.record_id == change.record_id) {
            Some(existing) => {
                debug!(record_id = %change.record_id, action = ?change.action, "coalescing pending change");
                *existing = change;
            }
            None => {
                debug!(record_id = %change.record_id, action = ?change.action, "enqueueing pending change");
                entries.push(change);
            }
        }
        self.persist(&entries)
    }

    /// Returns the current queue contents without mutating them. A drain
    /// runs to completion over this snapshot; changes enqueued afterwards
    /// wait for the next drain.
    pub fn drain_snapshot(&self) -> Vec<PendingChange> {
        self.entries.read().clone()
    }

    /// Removes the entry for `record_id` after its push was confirmed.
    ///
    /// Removing an id with no entry is a no-op.
    pub fn remove(&self, record_id: Uuid) -> SyncResult<()> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.record_id != record_id);
        if entries.len() == before {
            return Ok(());
        }
        self.persist(&entries)
    }

    /// Number of entries waiting to be pushed.
    pub fn pending_count(&self) -> usize {
        self.entries.read().len()
    }

    /// True when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn persist(&self, entries: &[PendingChange]) -> SyncResult<()> {
        self.store.write_all(StoreKey::PendingQueue, entries)?;
        Ok(())
    }
}
