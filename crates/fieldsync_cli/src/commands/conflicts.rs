//! Conflicts command implementation.

use crate::commands::open_store;
use fieldsync_engine::ConflictDetector;
use fieldsync_model::ConflictRecord;
use fieldsync_store::StoreKey;
use std::path::Path;

/// Runs the conflicts command.
pub fn run(
    path: &Path,
    include_resolved: bool,
    show_diffs: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;

    let mut conflicts: Vec<ConflictRecord> = store.read_all(StoreKey::Conflicts)?;
    if !include_resolved {
        conflicts.retain(|c| !c.resolved);
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&conflicts)?),
        _ => print_text_output(&conflicts, show_diffs),
    }

    Ok(())
}

fn print_text_output(conflicts: &[ConflictRecord], show_diffs: bool) {
    println!("Conflicts ({})", conflicts.len());
    println!("=============");
    println!();
    if conflicts.is_empty() {
        println!("No conflicts.");
        return;
    }

    let detector = ConflictDetector::default();
    for conflict in conflicts {
        let state = if conflict.resolved {
            "resolved"
        } else {
            "unresolved"
        };
        println!(
            "  {}  record {}  [{}]",
            conflict.id, conflict.record_id, state
        );
        println!(
            "    local @ {} ms, remote @ {} ms, detected @ {} ms",
            conflict.local_timestamp, conflict.remote_timestamp, conflict.detected_at
        );
        if show_diffs {
            for diff in detector.diffs(conflict) {
                println!(
                    "    {}: {} -> {}",
                    diff.field,
                    diff.local_value.as_deref().unwrap_or("(unset)"),
                    diff.remote_value.as_deref().unwrap_or("(unset)")
                );
            }
        }
        println!();
    }
}
