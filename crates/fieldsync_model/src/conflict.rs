//! Conflict records and resolution strategies.

use crate::record::Record;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A detected divergence between the local and remote version of a
/// record.
///
/// Conflict records are never deleted: resolution flips [`resolved`] to
/// true exactly once and the entry stays in the list for audit.
///
/// [`resolved`]: ConflictRecord::resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// Id of this conflict entry.
    pub id: Uuid,
    /// Id of the record both versions share.
    pub record_id: Uuid,
    /// The local version at detection time.
    pub local_version: Record,
    /// The remote version at detection time.
    pub remote_version: Record,
    /// `updated_at` of the local version, epoch milliseconds.
    pub local_timestamp: i64,
    /// `updated_at` of the remote version, epoch milliseconds.
    pub remote_timestamp: i64,
    /// When the divergence was detected, epoch milliseconds.
    pub detected_at: i64,
    /// Whether the conflict has been resolved.
    pub resolved: bool,
}

impl ConflictRecord {
    /// Creates an unresolved conflict between two versions of a record.
    pub fn new(local: Record, remote: Record, detected_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            record_id: local.id,
            local_timestamp: local.effective_timestamp(),
            remote_timestamp: remote.effective_timestamp(),
            local_version: local,
            remote_version: remote,
            detected_at,
            resolved: false,
        }
    }
}

/// One differing tracked field between the two versions of a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDiff {
    /// Field name.
    pub field: String,
    /// Local value. Absent when the field is unset locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_value: Option<String>,
    /// Remote value. Absent when the field is unset remotely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_value: Option<String>,
}

impl FieldDiff {
    /// Creates a diff entry for one field.
    pub fn new(
        field: impl Into<String>,
        local_value: Option<String>,
        remote_value: Option<String>,
    ) -> Self {
        Self {
            field: field.into(),
            local_value,
            remote_value,
        }
    }
}

/// How a conflict should be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Adopt the local version wholesale.
    KeepLocal,
    /// Adopt the remote version wholesale.
    AcceptRemote,
    /// Remote wins every scalar field; sub-records merge
    /// position-aligned, preferring completed entries.
    Merge,
}
