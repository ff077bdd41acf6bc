//! Pending command implementation.

use crate::commands::open_store;
use fieldsync_model::PendingChange;
use fieldsync_store::StoreKey;
use std::path::Path;

/// Runs the pending command.
pub fn run(
    path: &Path,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;

    let mut entries: Vec<PendingChange> = store.read_all(StoreKey::PendingQueue)?;
    let total = entries.len();
    if let Some(limit) = limit {
        entries.truncate(limit);
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&entries)?),
        _ => print_text_output(&entries, total),
    }

    Ok(())
}

fn print_text_output(entries: &[PendingChange], total: usize) {
    println!("Pending Changes ({} queued)", total);
    println!("===========================");
    println!();
    if entries.is_empty() {
        println!("Queue is empty.");
        return;
    }
    for entry in entries {
        let name = entry
            .payload
            .as_ref()
            .map(|r| r.full_name.as_str())
            .unwrap_or("-");
        println!(
            "  {:?}  {}  {}  (queued at {} ms)",
            entry.action, entry.record_id, name, entry.timestamp
        );
    }
    if entries.len() < total {
        println!();
        println!("... and {} more", total - entries.len());
    }
}
