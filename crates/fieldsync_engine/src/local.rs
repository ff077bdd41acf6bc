//! Durable local record sets.

use crate::error::{SyncError, SyncResult};
use fieldsync_model::Record;
use fieldsync_store::{LocalStore, StoreKey};
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

/// The device's durable view of its records.
///
/// Records live in exactly one of two sets: `live` for active records
/// and `archived` for soft-deleted ones. Both sets are persisted after
/// every mutation.
pub struct LocalRecordStore {
    live: RwLock<Vec<Record>>,
    archived: RwLock<Vec<Record>>,
    store: Arc<LocalStore>,
}

impl LocalRecordStore {
    /// Loads both sets from the store.
    pub fn load(store: Arc<LocalStore>) -> SyncResult<Self> {
        let live = store.read_all(StoreKey::LiveRecords)?;
        let archived = store.read_all(StoreKey::ArchivedRecords)?;
        Ok(Self {
            live: RwLock::new(live),
            archived: RwLock::new(archived),
            store,
        })
    }

    /// The live set in insertion order.
    pub fn live(&self) -> Vec<Record> {
        self.live.read().clone()
    }

    /// The archived (soft-deleted) set.
    pub fn archived(&self) -> Vec<Record> {
        self.archived.read().clone()
    }

    /// Looks up a record by id in either set.
    pub fn get(&self, record_id: Uuid) -> Option<Record> {
        self.live
            .read()
            .iter()
            .chain(self.archived.read().iter())
            .find(|r| r.id == record_id)
            .cloned()
    }

    /// Looks up a record in the live set only.
    pub fn get_live(&self, record_id: Uuid) -> Option<Record> {
        self.live.read().iter().find(|r| r.id == record_id).cloned()
    }

    /// Inserts or replaces a record in the live set, keeping its
    /// position on replace.
    pub fn upsert_live(&self, record: Record) -> SyncResult<()> {
        let mut live = self.live.write();
        match live.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => live.push(record),
        }
        self.persist_live(&live)
    }

    /// Moves a live record to the archived set, stamping the deletion
    /// metadata.
    pub fn soft_delete(
        &self,
        record_id: Uuid,
        deleted_by: &str,
        now: i64,
    ) -> SyncResult<Record> {
        let mut live = self.live.write();
        let mut archived = self.archived.write();

        let index = live
            .iter()
            .position(|r| r.id == record_id)
            .ok_or(SyncError::UnknownRecord(record_id))?;
        let mut record = live.remove(index);
        record.deleted = true;
        record.deleted_at = Some(now);
        record.deleted_by = Some(deleted_by.to_string());
        record.updated_at = now;
        archived.push(record.clone());

        self.persist_both(&live, &archived)?;
        Ok(record)
    }

    /// Moves an archived record back to the live set, clearing the
    /// deletion metadata.
    pub fn restore(&self, record_id: Uuid, now: i64) -> SyncResult<Record> {
        let mut live = self.live.write();
        let mut archived = self.archived.write();

        let index = archived
            .iter()
            .position(|r| r.id == record_id)
            .ok_or(SyncError::UnknownRecord(record_id))?;
        let mut record = archived.remove(index);
        record.deleted = false;
        record.deleted_at = None;
        record.deleted_by = None;
        record.updated_at = now;
        live.push(record.clone());

        self.persist_both(&live, &archived)?;
        Ok(record)
    }

    /// Permanently removes a record from whichever set holds it.
    pub fn purge(&self, record_id: Uuid) -> SyncResult<()> {
        let mut live = self.live.write();
        let mut archived = self.archived.write();

        let before = live.len() + archived.len();
        live.retain(|r| r.id != record_id);
        archived.retain(|r| r.id != record_id);
        if live.len() + archived.len() == before {
            return Err(SyncError::UnknownRecord(record_id));
        }

        self.persist_both(&live, &archived)
    }

    /// Replaces both sets wholesale after a merge-on-load, partitioning
    /// the snapshot on the deletion flag.
    pub fn replace_all(&self, snapshot: Vec<Record>) -> SyncResult<()> {
        let mut live = self.live.write();
        let mut archived = self.archived.write();

        let (deleted, kept): (Vec<Record>, Vec<Record>) =
            snapshot.into_iter().partition(|r| r.deleted);
        *live = kept;
        *archived = deleted;

        self.persist_both(&live, &archived)
    }

    fn persist_live(&self, live: &[Record]) -> SyncResult<()> {
        self.store.write_all(StoreKey::LiveRecords, live)?;
        Ok(())
    }

    fn persist_both(&self, live: &[Record], archived: &[Record]) -> SyncResult<()> {
        self.store.write_all(StoreKey::LiveRecords, live)?;
        self.store.write_all(StoreKey::ArchivedRecords, archived)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldsync_store::InMemoryBackend;

    fn records() -> LocalRecordStore {
        LocalRecordStore::load(Arc::new(LocalStore::new(InMemoryBackend::new()))).unwrap()
    }

    fn record() -> Record {
        Record::new("Amina K.", "facility-1", "chw-7", 1_000)
    }

    #[test]
    fn upsert_inserts_then_replaces_in_place() {
        let s = records();
        let a = record();
        let b = record();
        s.upsert_live(a.clone()).unwrap();
        s.upsert_live(b.clone()).unwrap();

        let mut edited = a.clone();
        edited.community = Some("riverside".into());
        s.upsert_live(edited).unwrap();

        let live = s.live();
        assert_eq!(live.len(), 2);
        assert_eq!(live[0].id, a.id);
        assert_eq!(live[0].community, Some("riverside".into()));
    }

    #[test]
    fn soft_delete_moves_and_stamps() {
        let s = records();
        let r = record();
        s.upsert_live(r.clone()).unwrap();

        let deleted = s.soft_delete(r.id, "chw-7", 5_000).unwrap();
        assert!(deleted.deleted);
        assert_eq!(deleted.deleted_at, Some(5_000));
        assert_eq!(deleted.deleted_by.as_deref(), Some("chw-7"));
        assert_eq!(deleted.updated_at, 5_000);

        assert!(s.live().is_empty());
        assert_eq!(s.archived().len(), 1);
        // Still findable by id.
        assert!(s.get(r.id).is_some());
        assert!(s.get_live(r.id).is_none());
    }

    #[test]
    fn restore_clears_deletion_metadata() {
        let s = records();
        let r = record();
        s.upsert_live(r.clone()).unwrap();
        s.soft_delete(r.id, "chw-7", 5_000).unwrap();

        let restored = s.restore(r.id, 6_000).unwrap();
        assert!(!restored.deleted);
        assert_eq!(restored.deleted_at, None);
        assert_eq!(restored.deleted_by, None);
        assert_eq!(restored.updated_at, 6_000);
        assert_eq!(s.live().len(), 1);
        assert!(s.archived().is_empty());
    }

    #[test]
    fn purge_removes_from_either_set() {
        let s = records();
        let a = record();
        let b = record();
        s.upsert_live(a.clone()).unwrap();
        s.upsert_live(b.clone()).unwrap();
        s.soft_delete(b.id, "chw-7", 5_000).unwrap();

        s.purge(a.id).unwrap();
        s.purge(b.id).unwrap();
        assert!(s.live().is_empty());
        assert!(s.archived().is_empty());

        assert!(matches!(
            s.purge(a.id),
            Err(SyncError::UnknownRecord(_))
        ));
    }

    #[test]
    fn unknown_ids_are_errors() {
        let s = records();
        let id = Uuid::new_v4();
        assert!(matches!(
            s.soft_delete(id, "chw-7", 1),
            Err(SyncError::UnknownRecord(_))
        ));
        assert!(matches!(s.restore(id, 1), Err(SyncError::UnknownRecord(_))));
    }

    #[test]
    fn replace_all_partitions_on_deletion_flag() {
        let s = records();
        let live = record();
        let mut gone = record();
        gone.deleted = true;
        gone.deleted_at = Some(5_000);

        s.replace_all(vec![live.clone(), gone.clone()]).unwrap();
        assert_eq!(s.live().len(), 1);
        assert_eq!(s.live()[0].id, live.id);
        assert_eq!(s.archived().len(), 1);
        assert_eq!(s.archived()[0].id, gone.id);
    }

    #[test]
    fn sets_survive_reload() {
        let store = Arc::new(LocalStore::new(InMemoryBackend::new()));
        let r = record();
        {
            let s = LocalRecordStore::load(Arc::clone(&store)).unwrap();
            s.upsert_live(r.clone()).unwrap();
        }
        let s = LocalRecordStore::load(store).unwrap();
        assert_eq!(s.live().len(), 1);
        assert_eq!(s.live()[0].id, r.id);
    }
}
