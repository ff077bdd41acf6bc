//! # FieldSync Engine
//!
//! Offline-first synchronization engine for field data collection.
//!
//! This crate provides:
//! - A durable, coalescing pending-change queue
//! - A single-flight sync coordinator with retry-on-next-trigger
//! - A conflict detector distinguishing divergence from clock jitter
//! - A resolver with whole-record and field-level merge strategies
//! - Merge-on-load reconciliation of local and remote snapshots
//!
//! ## Architecture
//!
//! Local mutations write the local store and append to the pending queue
//! within the same call, so a crash between "applied" and "durable" is
//! impossible by construction. The coordinator drains the queue against
//! the remote store on network-regain, manual trigger, or startup; one
//! drain runs at a time and failed entries simply wait for the next
//! trigger.
//!
//! ## Key Invariants
//!
//! - At most one pending change per record id (coalescing)
//! - A record is live or archived, never both
//! - Conflict records are resolved exactly once and never deleted
//! - Remote operations are idempotent under retry

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod conflicts;
mod coordinator;
mod detector;
mod engine;
mod error;
mod local;
mod merge;
mod queue;
mod remote;
mod resolver;

pub use config::EngineConfig;
pub use conflicts::ConflictList;
pub use coordinator::SyncCoordinator;
pub use detector::ConflictDetector;
pub use engine::{DrainReport, LoadReport, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use local::LocalRecordStore;
pub use merge::{merge_snapshots, MergeOutcome};
pub use queue::PendingQueue;
pub use remote::{MockRemoteStore, RemoteStore};
pub use resolver::{merge_records, resolve_versions};
