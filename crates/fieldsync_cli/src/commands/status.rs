//! Status command implementation.

use crate::commands::open_store;
use fieldsync_model::{ConflictRecord, PendingChange, Record, SyncProgress};
use fieldsync_store::StoreKey;
use serde::Serialize;
use std::path::Path;

/// Snapshot of a data directory's sync state.
#[derive(Debug, Serialize)]
pub struct StatusResult {
    /// Data directory path.
    pub path: String,
    /// Completion time of the last drain, epoch milliseconds.
    pub last_sync_time: Option<i64>,
    /// Queued changes awaiting push.
    pub pending_count: usize,
    /// Unresolved conflicts.
    pub unresolved_conflicts: usize,
    /// Live records.
    pub live_records: usize,
    /// Archived records.
    pub archived_records: usize,
}

/// Runs the status command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;

    let progress: Option<SyncProgress> = store.read_value(StoreKey::SyncStatus)?;
    let pending: Vec<PendingChange> = store.read_all(StoreKey::PendingQueue)?;
    let conflicts: Vec<ConflictRecord> = store.read_all(StoreKey::Conflicts)?;
    let live: Vec<Record> = store.read_all(StoreKey::LiveRecords)?;
    let archived: Vec<Record> = store.read_all(StoreKey::ArchivedRecords)?;

    let result = StatusResult {
        path: path.display().to_string(),
        last_sync_time: progress.and_then(|p| p.last_sync_time),
        pending_count: pending.len(),
        unresolved_conflicts: conflicts.iter().filter(|c| !c.resolved).count(),
        live_records: live.len(),
        archived_records: archived.len(),
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }

    Ok(())
}

fn print_text_output(result: &StatusResult) {
    println!("FieldSync Status");
    println!("================");
    println!();
    println!("Path: {}", result.path);
    println!();
    match result.last_sync_time {
        Some(ms) => println!("Last sync: {} (epoch ms)", ms),
        None => println!("Last sync: never"),
    }
    println!();
    println!("Records:");
    println!("  Live:     {}", result.live_records);
    println!("  Archived: {}", result.archived_records);
    println!();
    println!("Queue:");
    println!("  Pending changes:      {}", result.pending_count);
    println!("  Unresolved conflicts: {}", result.unresolved_conflicts);
}
