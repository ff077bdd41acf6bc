//! Remote store collaborator.

use crate::error::{SyncError, SyncResult};
use fieldsync_model::Record;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

/// The central store this engine reconciles against.
///
/// This trait abstracts the server side, allowing different
/// implementations (HTTP API client, mock for testing, etc.).
///
/// # Invariants
///
/// - All operations must be idempotent under retry: a failed drain entry
///   is pushed again on the next trigger with the same payload.
/// - `fetch_all` returns the full snapshot for one owning scope.
pub trait RemoteStore: Send + Sync {
    /// Creates or replaces one record.
    fn upsert(&self, record: &Record) -> SyncResult<()>;

    /// Permanently deletes one record. Deleting a missing record is not
    /// an error.
    fn delete(&self, record_id: Uuid) -> SyncResult<()>;

    /// Fetches the remote snapshot for a facility scope.
    fn fetch_all(&self, facility_id: &str) -> SyncResult<Vec<Record>>;
}

/// A mock remote store for testing.
///
/// Holds records in memory, can simulate being unreachable or failing on
/// specific record ids, and counts calls for assertions.
#[derive(Debug, Default)]
pub struct MockRemoteStore {
    records: Mutex<HashMap<Uuid, Record>>,
    failing_ids: Mutex<HashSet<Uuid>>,
    reachable: AtomicBool,
    upsert_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl MockRemoteStore {
    /// Creates a new reachable mock with no records.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            failing_ids: Mutex::new(HashSet::new()),
            reachable: AtomicBool::new(true),
            upsert_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    /// Seeds the remote with existing records.
    pub fn seed(&self, records: impl IntoIterator<Item = Record>) {
        let mut map = self.records.lock();
        for record in records {
            map.insert(record.id, record);
        }
    }

    /// Makes the remote reachable or unreachable.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Makes upserts and deletes for one record id fail until cleared.
    pub fn fail_record(&self, record_id: Uuid) {
        self.failing_ids.lock().insert(record_id);
    }

    /// Clears all scripted per-record failures.
    pub fn clear_failures(&self) {
        self.failing_ids.lock().clear();
    }

    /// Returns the remote's record for `record_id`, if any.
    pub fn get(&self, record_id: Uuid) -> Option<Record> {
        self.records.lock().get(&record_id).cloned()
    }

    /// Number of records held remotely.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// True when the remote holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Total upsert calls observed.
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    /// Total delete calls observed.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Total fetch calls observed.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> SyncResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SyncError::network("remote unreachable"))
        }
    }

    fn check_record(&self, record_id: Uuid) -> SyncResult<()> {
        if self.failing_ids.lock().contains(&record_id) {
            Err(SyncError::network(format!(
                "remote rejected record {record_id}"
            )))
        } else {
            Ok(())
        }
    }
}

impl RemoteStore for MockRemoteStore {
    fn upsert(&self, record: &Record) -> SyncResult<()> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        self.check_record(record.id)?;
        self.records.lock().insert(record.id, record.clone());
        Ok(())
    }

    fn delete(&self, record_id: Uuid) -> SyncResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        self.check_record(record_id)?;
        self.records.lock().remove(&record_id);
        Ok(())
    }

    fn fetch_all(&self, facility_id: &str) -> SyncResult<Vec<Record>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        let mut records: Vec<Record> = self
            .records
            .lock()
            .values()
            .filter(|r| r.facility_id == facility_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.registered_at);
        Ok(records)
    }
}
