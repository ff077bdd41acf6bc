//! Conflict detection.

use crate::config::DEFAULT_CONFLICT_WINDOW_MS;
use fieldsync_model::{ConflictRecord, FieldDiff, Record, SubRecord};

/// Decides whether a local and remote version of the same record have
/// genuinely diverged.
///
/// This is a timestamp-window heuristic, not causal or vector-clock
/// tracking: edits closer together than the window are treated as one
/// edit to absorb clock and network jitter. The window is configurable
/// because clock-skew bounds between devices are deployment-specific.
#[derive(Debug, Clone, Copy)]
pub struct ConflictDetector {
    window_ms: i64,
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new(DEFAULT_CONFLICT_WINDOW_MS)
    }
}

/// The scalar fields compared between versions, with their values
/// rendered for diffing.
fn tracked_fields(record: &Record) -> [(&'static str, Option<String>); 5] {
    [
        ("full_name", Some(record.full_name.clone())),
        ("mother_name", record.mother_name.clone()),
        ("community", record.community.clone()),
        ("contact_phone", record.contact_phone.clone()),
        ("date_of_birth", record.date_of_birth.clone()),
    ]
}

/// Compares the serialized form of two sub-record collections, so that
/// absent optional fields and present-but-equal fields compare alike.
fn sub_records_differ(local: &[SubRecord], remote: &[SubRecord]) -> bool {
    serde_json::to_value(local).ok() != serde_json::to_value(remote).ok()
}

impl ConflictDetector {
    /// Creates a detector with the given jitter window in milliseconds.
    pub fn new(window_ms: i64) -> Self {
        Self { window_ms }
    }

    /// Returns true iff the two versions genuinely diverged.
    ///
    /// Near-simultaneous writes (timestamp gap below the window) are one
    /// edit, never a conflict. Beyond the window, versions conflict iff
    /// any tracked scalar differs or the sub-record collections differ
    /// structurally.
    pub fn detect(&self, local: &Record, remote: &Record) -> bool {
        let gap = (local.effective_timestamp() - remote.effective_timestamp()).abs();
        if gap < self.window_ms {
            return false;
        }

        let local_fields = tracked_fields(local);
        let remote_fields = tracked_fields(remote);
        if local_fields != remote_fields {
            return true;
        }

        sub_records_differ(&local.sub_records, &remote.sub_records)
    }

    /// Lists the differing tracked fields of a conflict.
    ///
    /// Emits one entry per differing scalar, plus a single synthetic
    /// entry carrying the completed sub-record count per side when the
    /// collections differ — the diff stays proportional to what changed,
    /// not to collection size.
    pub fn diffs(&self, conflict: &ConflictRecord) -> Vec<FieldDiff> {
        let local = &conflict.local_version;
        let remote = &conflict.remote_version;
        let mut diffs = Vec::new();

        for ((field, local_value), (_, remote_value)) in tracked_fields(local)
            .into_iter()
            .zip(tracked_fields(remote))
        {
            if local_value != remote_value {
                diffs.push(FieldDiff::new(field, local_value, remote_value));
            }
        }

        if sub_records_differ(&local.sub_records, &remote.sub_records) {
            diffs.push(FieldDiff::new(
                "completed_sub_records",
                Some(local.completed_sub_records().to_string()),
                Some(remote.completed_sub_records().to_string()),
            ));
        }

        diffs
    }
}
