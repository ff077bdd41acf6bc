//! Pending changes awaiting push to the remote store.

use crate::record::Record;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of local mutation a [`PendingChange`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// A new record was created.
    Add,
    /// An existing record was edited.
    Update,
    /// The record was permanently removed.
    Delete,
    /// The record was moved to the archive (reversible).
    SoftDelete,
    /// The record was moved back out of the archive.
    Restore,
}

/// A local mutation not yet confirmed by the remote store.
///
/// At most one pending change exists per record id at any time: a newer
/// mutation for the same record replaces the queued entry wholesale, so
/// only the latest state per record is ever pushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingChange {
    /// Mutation kind.
    pub action: ChangeAction,
    /// Id of the affected record.
    pub record_id: Uuid,
    /// Full record snapshot to push. Absent for [`ChangeAction::Delete`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Record>,
    /// When the mutation happened, epoch milliseconds.
    pub timestamp: i64,
}

impl PendingChange {
    /// Creates an `Add` change carrying the new record.
    pub fn add(record: Record, now: i64) -> Self {
        Self {
            action: ChangeAction::Add,
            record_id: record.id,
            payload: Some(record),
            timestamp: now,
        }
    }

    /// Creates an `Update` change carrying the edited record.
    pub fn update(record: Record, now: i64) -> Self {
        Self {
            action: ChangeAction::Update,
            record_id: record.id,
            payload: Some(record),
            timestamp: now,
        }
    }

    /// Creates a `Delete` change. Carries no payload.
    pub fn delete(record_id: Uuid, now: i64) -> Self {
        Self {
            action: ChangeAction::Delete,
            record_id,
            payload: None,
            timestamp: now,
        }
    }

    /// Creates a `SoftDelete` change carrying the archived record.
    pub fn soft_delete(record: Record, now: i64) -> Self {
        Self {
            action: ChangeAction::SoftDelete,
            record_id: record.id,
            payload: Some(record),
            timestamp: now,
        }
    }

    /// Creates a `Restore` change carrying the restored record.
    pub fn restore(record: Record, now: i64) -> Self {
        Self {
            action: ChangeAction::Restore,
            record_id: record.id,
            payload: Some(record),
            timestamp: now,
        }
    }

    /// True when pushing this change means a remote delete rather than an
    /// upsert.
    pub fn is_delete(&self) -> bool {
        self.action == ChangeAction::Delete
    }
}
