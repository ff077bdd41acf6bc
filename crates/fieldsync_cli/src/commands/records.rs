//! Records command implementation.

use crate::commands::open_store;
use fieldsync_model::Record;
use fieldsync_store::StoreKey;
use std::path::Path;
use uuid::Uuid;

/// Runs the records command.
pub fn run(
    path: &Path,
    archived: bool,
    id: Option<Uuid>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;

    let key = if archived {
        StoreKey::ArchivedRecords
    } else {
        StoreKey::LiveRecords
    };
    let records: Vec<Record> = store.read_all(key)?;

    if let Some(id) = id {
        let record = records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| format!("No record {} in the {} set", id, set_name(archived)))?;
        match format {
            "json" => println!("{}", serde_json::to_string_pretty(record)?),
            _ => print_record(record),
        }
        return Ok(());
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&records)?),
        _ => print_text_output(&records, archived),
    }

    Ok(())
}

fn set_name(archived: bool) -> &'static str {
    if archived {
        "archived"
    } else {
        "live"
    }
}

fn print_text_output(records: &[Record], archived: bool) {
    println!(
        "Records ({} {})",
        records.len(),
        set_name(archived)
    );
    println!("=================");
    println!();
    if records.is_empty() {
        println!("No records.");
        return;
    }
    for record in records {
        println!(
            "  {}  {}  {}/{} sub-records completed",
            record.id,
            record.full_name,
            record.completed_sub_records(),
            record.sub_records.len()
        );
    }
}

// Wide enough for the longest label, "Recorded by:".
fn field_row(label: &str, value: &str) -> String {
    format!("  {label:<13}{value}")
}

fn print_record(record: &Record) {
    println!("Record {}", record.id);
    println!();
    println!("{}", field_row("Name:", &record.full_name));
    if let Some(mother) = &record.mother_name {
        println!("{}", field_row("Mother:", mother));
    }
    if let Some(community) = &record.community {
        println!("{}", field_row("Community:", community));
    }
    if let Some(phone) = &record.contact_phone {
        println!("{}", field_row("Phone:", phone));
    }
    if let Some(dob) = &record.date_of_birth {
        println!("{}", field_row("Born:", dob));
    }
    println!("{}", field_row("Facility:", &record.facility_id));
    println!("{}", field_row("Recorded by:", &record.recorded_by));
    println!(
        "{}",
        field_row(
            "Registered:",
            &format!("{} ms, updated: {} ms", record.registered_at, record.updated_at),
        )
    );
    if record.deleted {
        println!(
            "  Deleted at {} ms by {}",
            record.deleted_at.unwrap_or(0),
            record.deleted_by.as_deref().unwrap_or("unknown")
        );
    }
    if !record.sub_records.is_empty() {
        println!();
        println!("  Sub-records:");
        for sub in &record.sub_records {
            match sub.given_date {
                Some(given) => println!(
                    "    {}  {:?}  given at {} ms by {}",
                    sub.name,
                    sub.status,
                    given,
                    sub.administered_by.as_deref().unwrap_or("unknown")
                ),
                None => println!("    {}  {:?}  due {} ms", sub.name, sub.status, sub.due_date),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_rows_align_every_label() {
        let rows = [
            ("Name:", "Amina K."),
            ("Facility:", "facility-1"),
            ("Recorded by:", "chw-7"),
        ];
        let starts: Vec<usize> = rows
            .iter()
            .map(|(label, value)| field_row(label, value).len() - value.len())
            .collect();

        assert!(starts.windows(2).all(|pair| pair[0] == pair[1]));
    }
}
