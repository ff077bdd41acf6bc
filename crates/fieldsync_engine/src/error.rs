//! Error types for the sync engine.

use fieldsync_model::ValidationError;
use fieldsync_store::StorageError;
use thiserror::Error;
use uuid::Uuid;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in the sync engine.
///
/// No variant is process-fatal: network failures leave their entry queued
/// for the next drain, and partial failure within a drain is a reported
/// outcome, not an escalation.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Remote store unreachable or rejected one request. The affected
    /// entry stays in the queue and retries on the next drain trigger.
    #[error("network failure: {message}")]
    Network {
        /// Error message from the transport.
        message: String,
    },

    /// Local durable-storage write failed.
    #[error("persistence failure: {0}")]
    Storage(#[from] StorageError),

    /// Rejected at the mutation boundary, before entering the queue.
    #[error("validation failure: {0}")]
    Validation(#[from] ValidationError),

    /// No record with this id in the relevant set.
    #[error("unknown record {0}")]
    UnknownRecord(Uuid),

    /// No sub-record with this name on the record.
    #[error("record {record_id} has no sub-record named `{name}`")]
    UnknownSubRecord {
        /// Parent record id.
        record_id: Uuid,
        /// Missing sub-record name.
        name: String,
    },

    /// No conflict with this id in the work-list.
    #[error("unknown conflict {0}")]
    UnknownConflict(Uuid),

    /// The conflict was already resolved; resolution happens exactly once.
    #[error("conflict {0} is already resolved")]
    AlreadyResolved(Uuid),
}

impl SyncError {
    /// Creates a network failure.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Returns true if the operation will succeed on a later drain once
    /// conditions change.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Network { .. })
    }
}
