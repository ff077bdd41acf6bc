//! Durable conflict work-list.

use crate::error::{SyncError, SyncResult};
use fieldsync_model::ConflictRecord;
use fieldsync_store::{LocalStore, StoreKey};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// The persisted list of detected conflicts.
///
/// Entries are never deleted. Resolution flips `resolved` exactly once
/// and the entry stays for audit; re-detecting a conflict for a record
/// with an unresolved entry refreshes that entry in place instead of
/// stacking duplicates.
pub struct ConflictList {
    entries: RwLock<Vec<ConflictRecord>>,
    store: Arc<LocalStore>,
}

impl ConflictList {
    /// Loads the list persisted under [`StoreKey::Conflicts`].
    pub fn load(store: Arc<LocalStore>) -> SyncResult<Self> {
        let entries = store.read_all(StoreKey::Conflicts)?;
        Ok(Self {
            entries: RwLock::new(entries),
            store,
        })
    }

    /// Records a detected conflict.
    ///
    /// When an unresolved entry for the same record already exists, its
    /// versions and timestamps are refreshed in place and its id kept, so
    /// a caller holding that id still resolves the current divergence.
    pub fn upsert_detected(&self, conflict: ConflictRecord) -> SyncResult<()> {
        let mut entries = self.entries.write();
        match entries
            .iter_mut()
            .find(|e| e.record_id == conflict.record_id && !e.resolved)
        {
            Some(existing) => {
                existing.local_version = conflict.local_version;
                existing.remote_version = conflict.remote_version;
                existing.local_timestamp = conflict.local_timestamp;
                existing.remote_timestamp = conflict.remote_timestamp;
                existing.detected_at = conflict.detected_at;
            }
            None => {
                info!(record_id = %conflict.record_id, "conflict detected");
                entries.push(conflict);
            }
        }
        self.persist(&entries)
    }

    /// All entries, resolved and unresolved, in detection order.
    pub fn all(&self) -> Vec<ConflictRecord> {
        self.entries.read().clone()
    }

    /// Unresolved entries in detection order.
    pub fn unresolved(&self) -> Vec<ConflictRecord> {
        self.entries
            .read()
            .iter()
            .filter(|e| !e.resolved)
            .cloned()
            .collect()
    }

    /// The oldest unresolved entry, if any.
    pub fn next_unresolved(&self) -> Option<ConflictRecord> {
        self.entries.read().iter().find(|e| !e.resolved).cloned()
    }

    /// Looks up one entry by conflict id.
    pub fn get(&self, conflict_id: Uuid) -> Option<ConflictRecord> {
        self.entries
            .read()
            .iter()
            .find(|e| e.id == conflict_id)
            .cloned()
    }

    /// Marks one entry resolved.
    ///
    /// Fails with [`SyncError::AlreadyResolved`] on a second attempt and
    /// [`SyncError::UnknownConflict`] for an id not in the list.
    pub fn mark_resolved(&self, conflict_id: Uuid) -> SyncResult<()> {
        let mut entries = self.entries.write();
        let entry = entries
            .iter_mut()
            .find(|e| e.id == conflict_id)
            .ok_or(SyncError::UnknownConflict(conflict_id))?;
        if entry.resolved {
            return Err(SyncError::AlreadyResolved(conflict_id));
        }
        entry.resolved = true;
        info!(conflict_id = %conflict_id, record_id = %entry.record_id, "conflict resolved");
        self.persist(&entries)
    }

    /// Number of unresolved entries.
    pub fn unresolved_count(&self) -> usize {
        self.entries.read().iter().filter(|e| !e.resolved).count()
    }

    fn persist(&self, entries: &[ConflictRecord]) -> SyncResult<()> {
        self.store.write_all(StoreKey::Conflicts, entries)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldsync_model::Record;
    use fieldsync_store::InMemoryBackend;

    fn list() -> ConflictList {
        ConflictList::load(Arc::new(LocalStore::new(InMemoryBackend::new()))).unwrap()
    }

    fn conflict() -> ConflictRecord {
        let mut local = Record::new("Amina K.", "facility-1", "chw-7", 1_000);
        local.updated_at = 100_000;
        let mut remote = local.clone();
        remote.updated_at = 200_000;
        remote.community = Some("hillside".into());
        ConflictRecord::new(local, remote, 300_000)
    }

    #[test]
    fn detected_conflicts_are_listed_unresolved() {
        let l = list();
        let c = conflict();
        l.upsert_detected(c.clone()).unwrap();

        assert_eq!(l.unresolved_count(), 1);
        assert_eq!(l.next_unresolved().unwrap().id, c.id);
        assert_eq!(l.get(c.id).unwrap().record_id, c.record_id);
    }

    #[test]
    fn redetection_refreshes_in_place() {
        let l = list();
        let c = conflict();
        l.upsert_detected(c.clone()).unwrap();

        let mut newer = conflict();
        newer.record_id = c.record_id;
        newer.detected_at = 400_000;
        l.upsert_detected(newer).unwrap();

        // Same entry, same id, refreshed detection time.
        assert_eq!(l.unresolved_count(), 1);
        let entry = l.get(c.id).unwrap();
        assert_eq!(entry.detected_at, 400_000);
    }

    #[test]
    fn resolution_happens_exactly_once() {
        let l = list();
        let c = conflict();
        l.upsert_detected(c.clone()).unwrap();

        l.mark_resolved(c.id).unwrap();
        assert_eq!(l.unresolved_count(), 0);
        // The entry stays for audit.
        assert_eq!(l.all().len(), 1);
        assert!(l.get(c.id).unwrap().resolved);

        assert!(matches!(
            l.mark_resolved(c.id),
            Err(SyncError::AlreadyResolved(_))
        ));
    }

    #[test]
    fn unknown_conflict_is_an_error() {
        let l = list();
        assert!(matches!(
            l.mark_resolved(Uuid::new_v4()),
            Err(SyncError::UnknownConflict(_))
        ));
    }

    #[test]
    fn resolved_entry_does_not_block_new_detection() {
        let l = list();
        let c = conflict();
        l.upsert_detected(c.clone()).unwrap();
        l.mark_resolved(c.id).unwrap();

        let mut again = conflict();
        again.record_id = c.record_id;
        l.upsert_detected(again).unwrap();

        assert_eq!(l.all().len(), 2);
        assert_eq!(l.unresolved_count(), 1);
    }

    #[test]
    fn list_survives_reload() {
        let store = Arc::new(LocalStore::new(InMemoryBackend::new()));
        let c = conflict();
        {
            let l = ConflictList::load(Arc::clone(&store)).unwrap();
            l.upsert_detected(c.clone()).unwrap();
        }
        let l = ConflictList::load(store).unwrap();
        assert_eq!(l.unresolved_count(), 1);
        assert_eq!(l.next_unresolved().unwrap().id, c.id);
    }
}
