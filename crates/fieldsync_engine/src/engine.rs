//! The sync engine facade.

use crate::config::EngineConfig;
use crate::conflicts::ConflictList;
use crate::coordinator::SyncCoordinator;
use crate::detector::ConflictDetector;
use crate::error::{SyncError, SyncResult};
use crate::local::LocalRecordStore;
use crate::merge::merge_snapshots;
use crate::queue::PendingQueue;
use crate::remote::RemoteStore;
use crate::resolver::resolve_versions;
use fieldsync_model::{
    now_ms, ConflictRecord, FieldDiff, PendingChange, Record, ResolutionStrategy, SubRecordStatus,
    SyncProgress,
};
use fieldsync_store::LocalStore;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome of one drain over the pending queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries in the drained snapshot.
    pub attempted: usize,
    /// Entries confirmed and removed from the queue.
    pub synced: usize,
    /// Entries that failed and stay queued for the next trigger.
    pub failed: usize,
}

/// Outcome of one merge-on-load reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Records in the merged snapshot, live and archived.
    pub merged_total: usize,
    /// Divergences recorded in the conflict list by this load.
    pub new_conflicts: usize,
}

/// The engine tying the local store, pending queue, conflict list and
/// coordinator to one remote store.
///
/// Every mutation validates, applies to the local store, and enqueues
/// within the same call, so an applied-but-not-durable window cannot
/// exist. Sync is pull-then-push: [`load`] reconciles the remote
/// snapshot in, drains push queued changes out.
///
/// [`load`]: SyncEngine::load
pub struct SyncEngine<R: RemoteStore> {
    config: EngineConfig,
    remote: Arc<R>,
    records: LocalRecordStore,
    queue: PendingQueue,
    conflicts: ConflictList,
    coordinator: SyncCoordinator,
    detector: ConflictDetector,
}

impl<R: RemoteStore> SyncEngine<R> {
    /// Opens the engine over a local store, reloading everything the
    /// previous process persisted.
    pub fn new(config: EngineConfig, remote: Arc<R>, store: LocalStore) -> SyncResult<Self> {
        let store = Arc::new(store);
        let records = LocalRecordStore::load(Arc::clone(&store))?;
        let queue = PendingQueue::load(Arc::clone(&store))?;
        let conflicts = ConflictList::load(Arc::clone(&store))?;
        let coordinator = SyncCoordinator::new(Arc::clone(&store), config.status_display_window);
        let detector = ConflictDetector::new(config.conflict_window_ms);

        Ok(Self {
            config,
            remote,
            records,
            queue,
            conflicts,
            coordinator,
            detector,
        })
    }

    // ----- mutations -----

    /// Registers a new record.
    pub fn add_record(&self, record: Record) -> SyncResult<()> {
        record.validate()?;
        self.records.upsert_live(record.clone())?;
        self.queue.enqueue(PendingChange::add(record, now_ms()))
    }

    /// Edits an existing live record, stamping `updated_at`.
    pub fn update_record(&self, mut record: Record) -> SyncResult<Record> {
        if self.records.get_live(record.id).is_none() {
            return Err(SyncError::UnknownRecord(record.id));
        }
        record.validate()?;
        record.updated_at = now_ms();
        self.records.upsert_live(record.clone())?;
        self.queue
            .enqueue(PendingChange::update(record.clone(), record.updated_at))?;
        Ok(record)
    }

    /// Marks one scheduled sub-record administered, stamping the batch
    /// and the administering actor from this device's configuration.
    pub fn administer(
        &self,
        record_id: Uuid,
        sub_name: &str,
        given_date: i64,
        batch_number: Option<String>,
    ) -> SyncResult<Record> {
        let mut record = self
            .records
            .get_live(record_id)
            .ok_or(SyncError::UnknownRecord(record_id))?;
        let sub = record
            .sub_record_mut(sub_name)
            .ok_or_else(|| SyncError::UnknownSubRecord {
                record_id,
                name: sub_name.to_string(),
            })?;
        sub.status = SubRecordStatus::Completed;
        sub.given_date = Some(given_date);
        sub.batch_number = batch_number;
        sub.administered_by = Some(self.config.device_actor.clone());

        record.updated_at = now_ms();
        record.validate()?;
        self.records.upsert_live(record.clone())?;
        self.queue
            .enqueue(PendingChange::update(record.clone(), record.updated_at))?;
        Ok(record)
    }

    /// Soft-deletes a live record (reversible).
    pub fn soft_delete_record(&self, record_id: Uuid) -> SyncResult<Record> {
        let now = now_ms();
        let record = self
            .records
            .soft_delete(record_id, &self.config.device_actor, now)?;
        self.queue
            .enqueue(PendingChange::soft_delete(record.clone(), now))?;
        Ok(record)
    }

    /// Restores an archived record to the live set.
    pub fn restore_record(&self, record_id: Uuid) -> SyncResult<Record> {
        let now = now_ms();
        let record = self.records.restore(record_id, now)?;
        self.queue
            .enqueue(PendingChange::restore(record.clone(), now))?;
        Ok(record)
    }

    /// Permanently removes a record locally and schedules the remote
    /// delete.
    pub fn purge_record(&self, record_id: Uuid) -> SyncResult<()> {
        self.records.purge(record_id)?;
        self.queue
            .enqueue(PendingChange::delete(record_id, now_ms()))
    }

    // ----- views -----

    /// The live record set.
    pub fn live_records(&self) -> Vec<Record> {
        self.records.live()
    }

    /// The archived (soft-deleted) record set.
    pub fn archived_records(&self) -> Vec<Record> {
        self.records.archived()
    }

    /// Looks up one record in either set.
    pub fn get_record(&self, record_id: Uuid) -> Option<Record> {
        self.records.get(record_id)
    }

    /// The current sync status projection.
    pub fn progress(&self) -> SyncProgress {
        let mut progress = self.coordinator.progress();
        progress.pending_count = self.queue.pending_count();
        progress
    }

    /// Unresolved conflicts in detection order.
    pub fn conflicts(&self) -> Vec<ConflictRecord> {
        self.conflicts.unresolved()
    }

    /// The oldest unresolved conflict, if any.
    pub fn next_conflict(&self) -> Option<ConflictRecord> {
        self.conflicts.next_unresolved()
    }

    /// The differing tracked fields of one conflict.
    pub fn conflict_diffs(&self, conflict_id: Uuid) -> SyncResult<Vec<FieldDiff>> {
        let conflict = self
            .conflicts
            .get(conflict_id)
            .ok_or(SyncError::UnknownConflict(conflict_id))?;
        Ok(self.detector.diffs(&conflict))
    }

    // ----- conflict resolution -----

    /// Resolves a conflict under a strategy.
    ///
    /// The resolved record replaces the local version and is enqueued
    /// for push like any edit. Resolving twice fails with
    /// [`SyncError::AlreadyResolved`].
    pub fn resolve_conflict(
        &self,
        conflict_id: Uuid,
        strategy: ResolutionStrategy,
    ) -> SyncResult<Record> {
        let conflict = self
            .conflicts
            .get(conflict_id)
            .ok_or(SyncError::UnknownConflict(conflict_id))?;
        if conflict.resolved {
            return Err(SyncError::AlreadyResolved(conflict_id));
        }

        let resolved = resolve_versions(&conflict, strategy, now_ms());
        self.finish_resolution(conflict_id, resolved)
    }

    /// Resolves a conflict with a caller-edited record, bypassing the
    /// built-in strategies. The record must belong to the conflict.
    pub fn resolve_conflict_manual(
        &self,
        conflict_id: Uuid,
        mut resolved: Record,
    ) -> SyncResult<Record> {
        let conflict = self
            .conflicts
            .get(conflict_id)
            .ok_or(SyncError::UnknownConflict(conflict_id))?;
        if conflict.resolved {
            return Err(SyncError::AlreadyResolved(conflict_id));
        }
        if resolved.id != conflict.record_id {
            return Err(SyncError::UnknownRecord(resolved.id));
        }
        resolved.updated_at = now_ms();
        self.finish_resolution(conflict_id, resolved)
    }

    fn finish_resolution(&self, conflict_id: Uuid, resolved: Record) -> SyncResult<Record> {
        resolved.validate()?;
        self.records.upsert_live(resolved.clone())?;
        self.queue
            .enqueue(PendingChange::update(resolved.clone(), resolved.updated_at))?;
        self.conflicts.mark_resolved(conflict_id)?;
        Ok(resolved)
    }

    // ----- sync triggers -----

    /// Applies a network presence transition. Coming online triggers a
    /// pull-then-push cycle.
    pub fn on_network_changed(&self, online: bool) -> Option<DrainReport> {
        if !self.coordinator.set_online(online) {
            return None;
        }
        info!("network regained, starting sync cycle");
        self.run_sync_cycle()
    }

    /// Runs the startup sync cycle if the device is online.
    pub fn sync_on_startup(&self) -> Option<DrainReport> {
        if !self.coordinator.is_online() {
            return None;
        }
        self.run_sync_cycle()
    }

    /// Pull then push. A retryable load failure means the remote is
    /// unreachable, so the drain is skipped rather than failing every
    /// entry against it; the queue waits for the next trigger.
    fn run_sync_cycle(&self) -> Option<DrainReport> {
        match self.load() {
            Ok(_) => {}
            Err(err) if err.is_retryable() => {
                warn!(error = %err, "remote unreachable, skipping drain");
                return None;
            }
            Err(err) => warn!(error = %err, "merge-on-load failed, draining queue anyway"),
        }
        self.drain()
    }

    /// Manually triggers a drain. Returns false without touching the
    /// remote when offline or when a drain is already running.
    pub fn trigger_manual_sync(&self) -> bool {
        if !self.coordinator.trigger_allowed() {
            return false;
        }
        self.drain().is_some()
    }

    /// Pulls the remote snapshot and reconciles it into the local sets.
    ///
    /// Divergent pairs land in the conflict list and provisionally keep
    /// the remote version; the merged snapshot is persisted before this
    /// returns. Network failure leaves the local sets untouched.
    pub fn load(&self) -> SyncResult<LoadReport> {
        let remote_snapshot = self.remote.fetch_all(&self.config.facility_id)?;

        let mut local_snapshot = self.records.live();
        local_snapshot.extend(self.records.archived());

        let now = now_ms();
        let outcome = merge_snapshots(
            &local_snapshot,
            &remote_snapshot,
            &self.detector,
            self.coordinator.last_sync_time(),
            now,
        );

        let mut merged = outcome.merged;
        for record in &mut merged {
            record.refresh_overdue(now);
        }

        let new_conflicts = outcome.conflicts.len();
        for conflict in outcome.conflicts {
            self.conflicts.upsert_detected(conflict)?;
        }

        let merged_total = merged.len();
        self.records.replace_all(merged)?;

        info!(merged_total, new_conflicts, "merge-on-load complete");
        Ok(LoadReport {
            merged_total,
            new_conflicts,
        })
    }

    /// Drains the pending queue against the remote store.
    ///
    /// Each snapshot entry is pushed exactly once; confirmed entries
    /// leave the queue, failed entries stay for the next trigger.
    /// Returns `None` when offline or when another drain holds the
    /// single-flight guard.
    pub fn drain(&self) -> Option<DrainReport> {
        if !self.coordinator.is_online() {
            return None;
        }
        let snapshot = self.queue.drain_snapshot();
        if !self.coordinator.start_sync(snapshot.len()) {
            return None;
        }

        let mut synced = 0;
        let mut failed = 0;
        for entry in &snapshot {
            match self.push_entry(entry) {
                Ok(()) => {
                    if let Err(err) = self.queue.remove(entry.record_id) {
                        warn!(record_id = %entry.record_id, error = %err, "failed to dequeue confirmed entry");
                    }
                    synced += 1;
                }
                Err(err) => {
                    warn!(record_id = %entry.record_id, action = ?entry.action, error = %err, "push failed, entry stays queued");
                    failed += 1;
                }
            }
            self.coordinator.update_progress(synced, failed);
        }

        self.coordinator.set_pending(self.queue.pending_count());
        self.coordinator.complete_sync(failed == 0);
        info!(attempted = snapshot.len(), synced, failed, "drain complete");

        Some(DrainReport {
            attempted: snapshot.len(),
            synced,
            failed,
        })
    }

    fn push_entry(&self, entry: &PendingChange) -> SyncResult<()> {
        if entry.is_delete() {
            return self.remote.delete(entry.record_id);
        }
        let payload = entry
            .payload
            .as_ref()
            .ok_or(SyncError::UnknownRecord(entry.record_id))?;
        self.remote.upsert(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockRemoteStore;
    use fieldsync_model::{SubRecord, SyncStatus, ValidationError};
    use fieldsync_store::InMemoryBackend;
    use std::time::Duration;

    fn engine() -> (SyncEngine<MockRemoteStore>, Arc<MockRemoteStore>) {
        let remote = Arc::new(MockRemoteStore::new());
        let config = EngineConfig::new("facility-1", "chw-7")
            .with_status_display_window(Duration::from_secs(60));
        let engine = SyncEngine::new(
            config,
            Arc::clone(&remote),
            LocalStore::new(InMemoryBackend::new()),
        )
        .unwrap();
        (engine, remote)
    }

    fn record() -> Record {
        Record::new("Amina K.", "facility-1", "chw-7", 1_000)
    }

    #[test]
    fn add_applies_locally_and_queues() {
        let (engine, remote) = engine();
        let r = record();
        engine.add_record(r.clone()).unwrap();

        assert_eq!(engine.live_records().len(), 1);
        assert_eq!(engine.progress().pending_count, 1);
        // Nothing touches the remote until a drain.
        assert_eq!(remote.upsert_calls(), 0);
    }

    #[test]
    fn invalid_record_is_rejected_before_queueing() {
        let (engine, _) = engine();
        let mut r = record();
        r.full_name = "".into();

        let err = engine.add_record(r).unwrap_err();
        assert!(matches!(
            err,
            SyncError::Validation(ValidationError::EmptyField("full_name"))
        ));
        assert!(engine.live_records().is_empty());
        assert_eq!(engine.progress().pending_count, 0);
    }

    #[test]
    fn update_requires_a_live_record() {
        let (engine, _) = engine();
        assert!(matches!(
            engine.update_record(record()),
            Err(SyncError::UnknownRecord(_))
        ));
    }

    #[test]
    fn administer_completes_the_sub_record() {
        let (engine, _) = engine();
        let mut r = record();
        r.sub_records.push(SubRecord::scheduled("dose-1", 5_000));
        engine.add_record(r.clone()).unwrap();

        let updated = engine
            .administer(r.id, "dose-1", 6_000, Some("BATCH-42".into()))
            .unwrap();

        let sub = updated.sub_record("dose-1").unwrap();
        assert!(sub.is_completed());
        assert_eq!(sub.given_date, Some(6_000));
        assert_eq!(sub.batch_number.as_deref(), Some("BATCH-42"));
        assert_eq!(sub.administered_by.as_deref(), Some("chw-7"));

        // Add then administer coalesced to one queued entry.
        assert_eq!(engine.progress().pending_count, 1);
    }

    #[test]
    fn administer_unknown_sub_record_is_an_error() {
        let (engine, _) = engine();
        let r = record();
        engine.add_record(r.clone()).unwrap();

        assert!(matches!(
            engine.administer(r.id, "dose-9", 6_000, None),
            Err(SyncError::UnknownSubRecord { .. })
        ));
    }

    #[test]
    fn offline_manual_sync_does_nothing() {
        let (engine, remote) = engine();
        engine.add_record(record()).unwrap();

        assert!(!engine.trigger_manual_sync());
        assert_eq!(remote.upsert_calls(), 0);
        assert_eq!(engine.progress().pending_count, 1);
        assert_eq!(engine.progress().status, SyncStatus::Offline);
    }

    #[test]
    fn drain_pushes_and_clears_the_queue() {
        let (engine, remote) = engine();
        let r = record();
        engine.add_record(r.clone()).unwrap();

        let report = engine.on_network_changed(true).unwrap();
        assert_eq!(
            report,
            DrainReport {
                attempted: 1,
                synced: 1,
                failed: 0
            }
        );
        assert_eq!(remote.get(r.id).unwrap().id, r.id);
        assert_eq!(engine.progress().pending_count, 0);
        assert_eq!(engine.progress().status, SyncStatus::Success);
    }

    #[test]
    fn partial_failure_keeps_failed_entries_queued() {
        let (engine, remote) = engine();
        let ok_a = record();
        let bad = record();
        let ok_b = record();
        engine.add_record(ok_a.clone()).unwrap();
        engine.add_record(bad.clone()).unwrap();
        engine.add_record(ok_b.clone()).unwrap();
        remote.fail_record(bad.id);

        let report = engine.on_network_changed(true).unwrap();
        assert_eq!(
            report,
            DrainReport {
                attempted: 3,
                synced: 2,
                failed: 1
            }
        );
        assert_eq!(engine.progress().pending_count, 1);
        assert_eq!(engine.progress().status, SyncStatus::Error);

        // The failed entry retries on the next trigger and succeeds.
        remote.clear_failures();
        assert!(engine.trigger_manual_sync());
        assert_eq!(engine.progress().pending_count, 0);
        assert!(remote.get(bad.id).is_some());
    }

    #[test]
    fn purge_deletes_remotely() {
        let (engine, remote) = engine();
        let r = record();
        engine.add_record(r.clone()).unwrap();
        engine.on_network_changed(true);
        assert!(remote.get(r.id).is_some());

        engine.purge_record(r.id).unwrap();
        engine.trigger_manual_sync();

        assert!(remote.get(r.id).is_none());
        assert_eq!(remote.delete_calls(), 1);
    }

    #[test]
    fn soft_delete_round_trips_through_the_remote() {
        let (engine, remote) = engine();
        let r = record();
        engine.add_record(r.clone()).unwrap();
        engine.on_network_changed(true);

        engine.soft_delete_record(r.id).unwrap();
        engine.trigger_manual_sync();
        assert!(remote.get(r.id).unwrap().deleted);

        engine.restore_record(r.id).unwrap();
        engine.trigger_manual_sync();
        assert!(!remote.get(r.id).unwrap().deleted);
    }

    #[test]
    fn load_adopts_remote_records() {
        let (engine, remote) = engine();
        remote.seed([record(), record()]);

        let report = engine.on_network_changed(true);
        assert!(report.is_some());
        assert_eq!(engine.live_records().len(), 2);
    }

    #[test]
    fn load_detects_and_resolves_conflicts() {
        let (engine, remote) = engine();

        // Both sides edited the same record, well apart in time.
        let mut local = record();
        local.updated_at = 100_000;
        local.community = Some("riverside".into());
        engine.add_record(local.clone()).unwrap();

        let mut remote_edit = local.clone();
        remote_edit.updated_at = 200_000;
        remote_edit.community = Some("hillside".into());
        remote.seed([remote_edit]);

        engine.on_network_changed(true);
        let conflict = engine.next_conflict().expect("conflict detected");
        assert_eq!(conflict.record_id, local.id);
        assert_eq!(conflict.local_version.community, Some("riverside".into()));

        let diffs = engine.conflict_diffs(conflict.id).unwrap();
        assert!(diffs.iter().any(|d| d.field == "community"));

        let resolved = engine
            .resolve_conflict(conflict.id, ResolutionStrategy::KeepLocal)
            .unwrap();
        assert_eq!(resolved.community, Some("riverside".into()));
        assert!(engine.next_conflict().is_none());

        // The resolution pushes like any edit.
        engine.trigger_manual_sync();
        assert_eq!(
            remote.get(local.id).unwrap().community,
            Some("riverside".into())
        );

        // Second resolution attempt fails.
        assert!(matches!(
            engine.resolve_conflict(conflict.id, ResolutionStrategy::KeepLocal),
            Err(SyncError::AlreadyResolved(_))
        ));
    }

    #[test]
    fn manual_resolution_takes_the_edited_record() {
        let (engine, remote) = engine();

        let mut local = record();
        local.updated_at = 100_000;
        local.community = Some("riverside".into());
        engine.add_record(local.clone()).unwrap();

        let mut remote_edit = local.clone();
        remote_edit.updated_at = 200_000;
        remote_edit.community = Some("hillside".into());
        remote.seed([remote_edit]);

        engine.on_network_changed(true);
        let conflict = engine.next_conflict().expect("conflict detected");

        // A record from the wrong conflict is rejected.
        assert!(matches!(
            engine.resolve_conflict_manual(conflict.id, record()),
            Err(SyncError::UnknownRecord(_))
        ));

        let mut edited = conflict.local_version.clone();
        edited.community = Some("both banks".into());
        let resolved = engine.resolve_conflict_manual(conflict.id, edited).unwrap();

        assert_eq!(resolved.community, Some("both banks".into()));
        assert_eq!(
            engine.get_record(local.id).unwrap().community,
            Some("both banks".into())
        );
        assert!(engine.next_conflict().is_none());
    }

    #[test]
    fn network_regain_edge_triggers_once() {
        let (engine, remote) = engine();
        engine.add_record(record()).unwrap();

        assert!(engine.on_network_changed(true).is_some());
        // Already online: no edge, no cycle.
        assert!(engine.on_network_changed(true).is_none());
        assert_eq!(remote.fetch_calls(), 1);
    }

    #[test]
    fn unreachable_remote_skips_the_drain_entirely() {
        let (engine, remote) = engine();
        engine.add_record(record()).unwrap();
        remote.set_reachable(false);

        // The pull fails, so no entry is pushed at an unreachable remote.
        assert!(engine.on_network_changed(true).is_none());
        assert_eq!(remote.fetch_calls(), 1);
        assert_eq!(remote.upsert_calls(), 0);
        assert_eq!(engine.progress().pending_count, 1);
        assert_eq!(engine.progress().status, SyncStatus::Idle);

        remote.set_reachable(true);
        assert!(engine.trigger_manual_sync());
        assert_eq!(engine.progress().pending_count, 0);
    }

    #[test]
    fn going_offline_queues_quietly() {
        let (engine, remote) = engine();
        engine.on_network_changed(true);
        engine.on_network_changed(false);

        engine.add_record(record()).unwrap();
        assert_eq!(engine.progress().status, SyncStatus::Offline);
        assert_eq!(remote.upsert_calls(), 0);
    }
}
