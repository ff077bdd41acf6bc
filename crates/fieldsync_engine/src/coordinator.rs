//! Single-flight sync coordination and status projection.

use fieldsync_model::{now_ms, SyncProgress};
use fieldsync_store::{LocalStore, StoreKey};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Serializes drains and projects their state to callers.
///
/// At most one drain runs at a time: the guard is taken with a
/// compare-exchange, so a trigger arriving mid-drain is dropped rather
/// than queued. Terminal Success/Error statuses revert to idle (or
/// offline) lazily once the display window has elapsed, evaluated on
/// read.
pub struct SyncCoordinator {
    progress: RwLock<SyncProgress>,
    is_syncing: AtomicBool,
    online: AtomicBool,
    completed_at: RwLock<Option<Instant>>,
    display_window: Duration,
    store: Arc<LocalStore>,
}

impl SyncCoordinator {
    /// Creates a coordinator, restoring `last_sync_time` from the
    /// persisted snapshot. The device starts offline until told
    /// otherwise.
    pub fn new(store: Arc<LocalStore>, display_window: Duration) -> Self {
        let mut progress = SyncProgress::default();
        match store.read_value::<SyncProgress>(StoreKey::SyncStatus) {
            Ok(Some(persisted)) => progress.last_sync_time = persisted.last_sync_time,
            Ok(None) => {}
            Err(err) => warn!(error = %err, "failed to read persisted sync status"),
        }

        Self {
            progress: RwLock::new(progress),
            is_syncing: AtomicBool::new(false),
            online: AtomicBool::new(false),
            completed_at: RwLock::new(None),
            display_window,
            store,
        }
    }

    /// The current progress snapshot, with terminal statuses reverted
    /// once their display window has elapsed.
    pub fn progress(&self) -> SyncProgress {
        self.maybe_revert_terminal();
        self.progress.read().clone()
    }

    /// Completion time of the last drain, epoch milliseconds.
    pub fn last_sync_time(&self) -> Option<i64> {
        self.progress.read().last_sync_time
    }

    /// Applies a network presence transition. Returns true when the
    /// device just came online, which is the cue to trigger a drain.
    pub fn set_online(&self, online: bool) -> bool {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        self.progress.write().set_online(online);
        online && !was_online
    }

    /// True when the device currently has network.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// True while a drain is running.
    pub fn is_syncing(&self) -> bool {
        self.is_syncing.load(Ordering::SeqCst)
    }

    /// True when a drain trigger would be honored right now.
    pub fn trigger_allowed(&self) -> bool {
        self.is_online() && !self.is_syncing()
    }

    /// Attempts to take the single-flight guard and begin a drain over
    /// `pending_count` entries. Returns false when a drain is already
    /// running; the caller drops the trigger.
    pub fn start_sync(&self, pending_count: usize) -> bool {
        if self
            .is_syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.progress.write().start_sync(pending_count);
        true
    }

    /// Records per-entry outcomes mid-drain.
    pub fn update_progress(&self, synced: usize, failed: usize) {
        self.progress.write().update_progress(synced, failed);
    }

    /// Refreshes the queue depth shown to callers.
    pub fn set_pending(&self, pending_count: usize) {
        self.progress.write().pending_count = pending_count;
    }

    /// Completes the drain, persists the snapshot, and releases the
    /// single-flight guard.
    ///
    /// A failed snapshot write is logged and swallowed: status is a
    /// projection, and losing it must not fail a drain that already
    /// pushed its entries.
    pub fn complete_sync(&self, success: bool) {
        let snapshot = {
            let mut progress = self.progress.write();
            progress.complete_sync(success, now_ms());
            progress.clone()
        };
        if let Err(err) = self.store.write_value(StoreKey::SyncStatus, &snapshot) {
            warn!(error = %err, "failed to persist sync status snapshot");
        }
        *self.completed_at.write() = Some(Instant::now());
        self.is_syncing.store(false, Ordering::SeqCst);
    }

    fn maybe_revert_terminal(&self) {
        let elapsed = {
            let completed_at = self.completed_at.read();
            match *completed_at {
                Some(at) => at.elapsed() >= self.display_window,
                None => false,
            }
        };
        if elapsed {
            self.progress.write().revert_terminal(self.is_online());
            *self.completed_at.write() = None;
        }
    }
}
