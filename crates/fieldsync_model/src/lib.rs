//! # FieldSync Model
//!
//! Domain types for the FieldSync offline-first sync engine.
//!
//! This crate provides:
//! - [`Record`] and [`SubRecord`] for field registry entries
//! - [`PendingChange`] for the durable mutation queue
//! - [`ConflictRecord`] and [`FieldDiff`] for conflict handling
//! - [`SyncProgress`] for the caller-facing status projection
//!
//! This is a pure data crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change;
mod conflict;
mod progress;
mod record;
mod time;

pub use change::{ChangeAction, PendingChange};
pub use conflict::{ConflictRecord, FieldDiff, ResolutionStrategy};
pub use progress::{SyncProgress, SyncStatus};
pub use record::{Record, SubRecord, SubRecordStatus, ValidationError, ValidationResult};
pub use time::now_ms;
