//! Caller-facing sync status projection.

use serde::{Deserialize, Serialize};

/// The current phase of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// No network; mutations queue locally.
    Offline,
    /// Network present, no drain in progress.
    Idle,
    /// A drain is in progress.
    Syncing,
    /// The last drain pushed every entry.
    Success,
    /// The last drain left failed entries behind.
    Error,
}

impl SyncStatus {
    /// True for the per-drain terminal states that revert to idle after
    /// the display window.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Success | SyncStatus::Error)
    }
}

/// Process-wide transient sync state, exposed read-only to callers and
/// persisted as a snapshot so `last_sync_time` survives restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    /// Entries in the pending queue.
    pub pending_count: usize,
    /// Entries pushed successfully during the current/last drain.
    pub synced_count: usize,
    /// Entries that failed during the current/last drain.
    pub failed_count: usize,
    /// Completion time of the last drain, epoch milliseconds.
    pub last_sync_time: Option<i64>,
    /// Whether a drain is running right now.
    pub is_syncing: bool,
    /// Current phase.
    pub status: SyncStatus,
}

impl Default for SyncProgress {
    fn default() -> Self {
        Self {
            pending_count: 0,
            synced_count: 0,
            failed_count: 0,
            last_sync_time: None,
            is_syncing: false,
            status: SyncStatus::Offline,
        }
    }
}

impl SyncProgress {
    /// Begins a drain over `pending_count` queued entries.
    pub fn start_sync(&mut self, pending_count: usize) {
        self.pending_count = pending_count;
        self.synced_count = 0;
        self.failed_count = 0;
        self.is_syncing = true;
        self.status = SyncStatus::Syncing;
    }

    /// Records per-entry outcomes as the drain progresses.
    pub fn update_progress(&mut self, synced: usize, failed: usize) {
        self.synced_count = synced;
        self.failed_count = failed;
    }

    /// Marks the drain complete with a terminal status and stamps
    /// `last_sync_time`.
    pub fn complete_sync(&mut self, success: bool, now: i64) {
        self.is_syncing = false;
        self.status = if success {
            SyncStatus::Success
        } else {
            SyncStatus::Error
        };
        self.last_sync_time = Some(now);
    }

    /// Reverts a terminal status back to idle or offline once the display
    /// window has elapsed.
    pub fn revert_terminal(&mut self, online: bool) {
        if self.status.is_terminal() {
            self.status = if online {
                SyncStatus::Idle
            } else {
                SyncStatus::Offline
            };
        }
    }

    /// Applies a network presence transition. Does not interrupt a
    /// running drain.
    pub fn set_online(&mut self, online: bool) {
        if self.is_syncing {
            return;
        }
        self.status = if online {
            SyncStatus::Idle
        } else {
            SyncStatus::Offline
        };
    }
}
