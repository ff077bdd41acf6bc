//! Conflict resolution strategies.

use fieldsync_model::{ConflictRecord, Record, ResolutionStrategy, SubRecord};

/// Computes the resolved record for a conflict under the given strategy.
///
/// The result is stamped with `updated_at = now`; writing it back into
/// the local store and the pending queue is the engine's job.
pub fn resolve_versions(
    conflict: &ConflictRecord,
    strategy: ResolutionStrategy,
    now: i64,
) -> Record {
    let mut resolved = match strategy {
        ResolutionStrategy::KeepLocal => conflict.local_version.clone(),
        ResolutionStrategy::AcceptRemote => conflict.remote_version.clone(),
        ResolutionStrategy::Merge => {
            merge_records(&conflict.local_version, &conflict.remote_version, now)
        }
    };
    resolved.updated_at = now;
    resolved
}

/// Field-level merge of two versions of one record.
///
/// The base is the remote version — remote wins on every scalar field.
/// Sub-records merge position-aligned by index, preferring completed
/// entries so that administration data recorded on either side survives.
pub fn merge_records(local: &Record, remote: &Record, now: i64) -> Record {
    let mut merged = remote.clone();
    merged.sub_records = merge_sub_records(&local.sub_records, &remote.sub_records);
    merged.updated_at = now;
    merged
}

/// Position-aligned sub-record merge.
///
/// At each index: prefer the completed entry over a non-completed one;
/// when both are completed, prefer the later `given_date`; otherwise the
/// remote entry wins. An index present on only one side keeps that
/// side's entry.
fn merge_sub_records(local: &[SubRecord], remote: &[SubRecord]) -> Vec<SubRecord> {
    let len = local.len().max(remote.len());
    let mut merged = Vec::with_capacity(len);

    for index in 0..len {
        let entry = match (local.get(index), remote.get(index)) {
            (Some(l), Some(r)) => pick_entry(l, r),
            (Some(l), None) => l,
            (None, Some(r)) => r,
            (None, None) => unreachable!("index bounded by max length"),
        };
        merged.push(entry.clone());
    }

    merged
}

fn pick_entry<'a>(local: &'a SubRecord, remote: &'a SubRecord) -> &'a SubRecord {
    match (local.is_completed(), remote.is_completed()) {
        (true, false) => local,
        (false, true) => remote,
        (true, true) => {
            // Later administration wins; ties go to remote.
            if local.given_date > remote.given_date {
                local
            } else {
                remote
            }
        }
        (false, false) => remote,
    }
}
