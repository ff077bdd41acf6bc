//! Merge-on-load reconciliation of local and remote snapshots.

use crate::detector::ConflictDetector;
use fieldsync_model::{ConflictRecord, Record};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// The result of reconciling a remote snapshot into the local one.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The merged snapshot that replaces the local one. Ordered remote
    /// snapshot first, then records present only locally.
    pub merged: Vec<Record>,
    /// Divergences found while merging. The merged snapshot provisionally
    /// carries the remote version of each until resolution.
    pub conflicts: Vec<ConflictRecord>,
}

/// Reconciles snapshots id by id.
///
/// - present only locally → kept (a pending creation, it will be pushed)
/// - present only remotely → adopted
/// - present in both → the detector decides; divergent pairs become
///   conflicts and provisionally keep the remote value, otherwise the
///   strictly later `updated_at` wins with ties going to remote
///
/// A pair is only eligible to conflict when neither side predates
/// `last_sync`: a side unchanged since the last confirmed sync point
/// cannot have diverged, so the newer side simply wins.
pub fn merge_snapshots(
    local: &[Record],
    remote: &[Record],
    detector: &ConflictDetector,
    last_sync: Option<i64>,
    now: i64,
) -> MergeOutcome {
    let local_by_id: HashMap<Uuid, &Record> = local.iter().map(|r| (r.id, r)).collect();
    let remote_ids: HashSet<Uuid> = remote.iter().map(|r| r.id).collect();

    let mut merged = Vec::with_capacity(local.len().max(remote.len()));
    let mut conflicts = Vec::new();

    for remote_record in remote {
        match local_by_id.get(&remote_record.id).copied() {
            None => merged.push(remote_record.clone()),
            Some(local_record) => {
                let both_newer = last_sync.map_or(true, |t| {
                    local_record.effective_timestamp() >= t
                        && remote_record.effective_timestamp() >= t
                });

                if both_newer && detector.detect(local_record, remote_record) {
                    conflicts.push(ConflictRecord::new(
                        local_record.clone(),
                        remote_record.clone(),
                        now,
                    ));
                    merged.push(remote_record.clone());
                } else if local_record.effective_timestamp()
                    > remote_record.effective_timestamp()
                {
                    merged.push(local_record.clone());
                } else {
                    // Remote wins ties.
                    merged.push(remote_record.clone());
                }
            }
        }
    }

    for local_record in local {
        if !remote_ids.contains(&local_record.id) {
            merged.push(local_record.clone());
        }
    }

    MergeOutcome { merged, conflicts }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(updated_at: i64) -> Record {
        let mut r = Record::new("Amina K.", "facility-1", "chw-7", 1_000);
        r.updated_at = updated_at;
        r
    }

    fn detector() -> ConflictDetector {
        ConflictDetector::default()
    }

    #[test]
    fn local_only_records_are_kept() {
        let local = vec![record(10_000)];
        let outcome = merge_snapshots(&local, &[], &detector(), None, 50_000);

        assert_eq!(outcome.merged, local);
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn remote_only_records_are_adopted() {
        let remote = vec![record(10_000)];
        let outcome = merge_snapshots(&[], &remote, &detector(), None, 50_000);

        assert_eq!(outcome.merged, remote);
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn later_side_wins_when_not_divergent() {
        // Same contents, different timestamps: no conflict, later wins.
        let older = record(10_000);
        let mut newer = older.clone();
        newer.updated_at = 20_000;

        let outcome = merge_snapshots(
            std::slice::from_ref(&newer),
            std::slice::from_ref(&older),
            &detector(),
            None,
            50_000,
        );
        assert_eq!(outcome.merged[0].updated_at, 20_000);
        assert!(outcome.conflicts.is_empty());

        let outcome = merge_snapshots(
            std::slice::from_ref(&older),
            std::slice::from_ref(&newer),
            &detector(),
            None,
            50_000,
        );
        assert_eq!(outcome.merged[0].updated_at, 20_000);
    }

    #[test]
    fn tie_goes_to_remote() {
        let local = record(10_000);
        let mut remote = local.clone();
        remote.recorded_by = "other-device".to_string();

        let outcome = merge_snapshots(
            std::slice::from_ref(&local),
            std::slice::from_ref(&remote),
            &detector(),
            None,
            50_000,
        );
        assert_eq!(outcome.merged[0].recorded_by, "other-device");
    }

    #[test]
    fn divergent_pair_becomes_conflict_and_keeps_remote() {
        let mut local = record(100_000);
        local.community = Some("riverside".into());
        let mut remote = local.clone();
        remote.updated_at = 200_000;
        remote.community = Some("hillside".into());

        let outcome = merge_snapshots(
            std::slice::from_ref(&local),
            std::slice::from_ref(&remote),
            &detector(),
            None,
            300_000,
        );

        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.conflicts[0].record_id, local.id);
        assert_eq!(outcome.merged[0].community, Some("hillside".into()));
    }

    #[test]
    fn side_unchanged_since_last_sync_cannot_conflict() {
        // Local edit predates the last confirmed sync; remote moved on.
        let mut local = record(100_000);
        local.community = Some("riverside".into());
        let mut remote = local.clone();
        remote.updated_at = 200_000;
        remote.community = Some("hillside".into());

        let outcome = merge_snapshots(
            std::slice::from_ref(&local),
            std::slice::from_ref(&remote),
            &detector(),
            Some(150_000),
            300_000,
        );

        assert!(outcome.conflicts.is_empty());
        assert_eq!(outcome.merged[0].community, Some("hillside".into()));
    }

    #[test]
    fn merged_order_is_remote_then_local_only() {
        let shared_remote = record(10_000);
        let mut shared_local = shared_remote.clone();
        shared_local.updated_at = 20_000;
        let local_only = record(30_000);
        let remote_only = record(40_000);

        let outcome = merge_snapshots(
            &[local_only.clone(), shared_local.clone()],
            &[shared_remote, remote_only.clone()],
            &detector(),
            None,
            50_000,
        );

        let ids: Vec<Uuid> = outcome.merged.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![shared_local.id, remote_only.id, local_only.id]);
    }
}
