//! Registry records and their nested sub-records.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Result type for record validation.
pub type ValidationResult = Result<(), ValidationError>;

/// Errors raised at the mutation boundary, before a change may enter
/// the pending queue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The record id is the nil UUID.
    #[error("record id must not be nil")]
    NilId,

    /// A required text field is empty.
    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),

    /// A sub-record has an empty name.
    #[error("sub-record at index {0} has an empty name")]
    UnnamedSubRecord(usize),

    /// A pending sub-record carries a given date.
    #[error("sub-record `{0}` is pending but has a given date")]
    GivenDateOnPending(String),
}

/// Status of a scheduled sub-record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubRecordStatus {
    /// Scheduled, not yet administered.
    Pending,
    /// Administered.
    Completed,
    /// Scheduled, past its due date without being administered.
    Overdue,
}

/// A nested item within a record's ordered collection, keyed by `name`
/// (for example one scheduled dose).
///
/// Absent optional fields serialize as no value at all, never as a
/// default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubRecord {
    /// Key within the parent's collection.
    pub name: String,
    /// Current status.
    pub status: SubRecordStatus,
    /// Scheduled date, epoch milliseconds.
    pub due_date: i64,
    /// Administration date, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_date: Option<i64>,
    /// Batch identifier recorded at administration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<String>,
    /// Actor who administered the item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administered_by: Option<String>,
}

impl SubRecord {
    /// Creates a pending sub-record scheduled for `due_date`.
    pub fn scheduled(name: impl Into<String>, due_date: i64) -> Self {
        Self {
            name: name.into(),
            status: SubRecordStatus::Pending,
            due_date,
            given_date: None,
            batch_number: None,
            administered_by: None,
        }
    }

    /// Returns true if this sub-record has been administered.
    pub fn is_completed(&self) -> bool {
        self.status == SubRecordStatus::Completed
    }
}

/// A top-level registry entry (a tracked person).
///
/// A record lives in exactly one of the live or archived sets. Soft
/// deletion moves it live → archived and is reversible; purging removes
/// it from both sets permanently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable client-generated id. All merge operations key by this.
    pub id: Uuid,
    /// Full name of the tracked person.
    pub full_name: String,
    /// Mother's name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mother_name: Option<String>,
    /// Community or village.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community: Option<String>,
    /// Contact phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    /// Date of birth, ISO `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    /// Ordered collection of scheduled items.
    #[serde(default)]
    pub sub_records: Vec<SubRecord>,
    /// Creation time, epoch milliseconds.
    pub registered_at: i64,
    /// Last local or remote edit time, epoch milliseconds.
    pub updated_at: i64,
    /// Soft-delete flag.
    #[serde(default)]
    pub deleted: bool,
    /// Soft-delete time, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
    /// Actor who soft-deleted the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<String>,
    /// Owning scope (facility / tenant).
    pub facility_id: String,
    /// Actor who registered the record.
    pub recorded_by: String,
}

impl Record {
    /// Creates a new record registered at `now`.
    pub fn new(
        full_name: impl Into<String>,
        facility_id: impl Into<String>,
        recorded_by: impl Into<String>,
        now: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            full_name: full_name.into(),
            mother_name: None,
            community: None,
            contact_phone: None,
            date_of_birth: None,
            sub_records: Vec::new(),
            registered_at: now,
            updated_at: now,
            deleted: false,
            deleted_at: None,
            deleted_by: None,
            facility_id: facility_id.into(),
            recorded_by: recorded_by.into(),
        }
    }

    /// Validates the record at the mutation boundary.
    ///
    /// Invalid records are rejected synchronously, before anything enters
    /// the pending queue.
    pub fn validate(&self) -> ValidationResult {
        if self.id.is_nil() {
            return Err(ValidationError::NilId);
        }
        if self.full_name.trim().is_empty() {
            return Err(ValidationError::EmptyField("full_name"));
        }
        if self.facility_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("facility_id"));
        }
        if self.recorded_by.trim().is_empty() {
            return Err(ValidationError::EmptyField("recorded_by"));
        }
        for (index, sub) in self.sub_records.iter().enumerate() {
            if sub.name.trim().is_empty() {
                return Err(ValidationError::UnnamedSubRecord(index));
            }
            if sub.status == SubRecordStatus::Pending && sub.given_date.is_some() {
                return Err(ValidationError::GivenDateOnPending(sub.name.clone()));
            }
        }
        Ok(())
    }

    /// The timestamp used for merge and conflict decisions: `updated_at`,
    /// falling back to `registered_at` for never-edited records.
    pub fn effective_timestamp(&self) -> i64 {
        if self.updated_at > 0 {
            self.updated_at
        } else {
            self.registered_at
        }
    }

    /// Marks pending sub-records whose due date has passed as overdue.
    ///
    /// Returns the number of sub-records that changed status.
    pub fn refresh_overdue(&mut self, now: i64) -> usize {
        let mut changed = 0;
        for sub in &mut self.sub_records {
            if sub.status == SubRecordStatus::Pending && sub.due_date < now {
                sub.status = SubRecordStatus::Overdue;
                changed += 1;
            }
        }
        changed
    }

    /// Number of completed sub-records.
    pub fn completed_sub_records(&self) -> usize {
        self.sub_records.iter().filter(|s| s.is_completed()).count()
    }

    /// Finds a sub-record by its name key.
    pub fn sub_record(&self, name: &str) -> Option<&SubRecord> {
        self.sub_records.iter().find(|s| s.name == name)
    }

    /// Finds a sub-record by its name key, mutably.
    pub fn sub_record_mut(&mut self, name: &str) -> Option<&mut SubRecord> {
        self.sub_records.iter_mut().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record::new("Amina K.", "facility-1", "chw-7", 1_000)
    }

    #[test]
    fn new_record_is_valid() {
        assert_eq!(record().validate(), Ok(()));
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut r = record();
        r.full_name = "  ".into();
        assert_eq!(r.validate(), Err(ValidationError::EmptyField("full_name")));
    }

    #[test]
    fn nil_id_is_rejected() {
        let mut r = record();
        r.id = Uuid::nil();
        assert_eq!(r.validate(), Err(ValidationError::NilId));
    }

    #[test]
    fn pending_sub_record_with_given_date_is_rejected() {
        let mut r = record();
        let mut sub = SubRecord::scheduled("dose-1", 2_000);
        sub.given_date = Some(1_500);
        r.sub_records.push(sub);
        assert_eq!(
            r.validate(),
            Err(ValidationError::GivenDateOnPending("dose-1".into()))
        );
    }

    #[test]
    fn refresh_overdue_flags_past_due_pending() {
        let mut r = record();
        r.sub_records.push(SubRecord::scheduled("dose-1", 500));
        r.sub_records.push(SubRecord::scheduled("dose-2", 5_000));

        let changed = r.refresh_overdue(1_000);

        assert_eq!(changed, 1);
        assert_eq!(r.sub_records[0].status, SubRecordStatus::Overdue);
        assert_eq!(r.sub_records[1].status, SubRecordStatus::Pending);
    }

    #[test]
    fn refresh_overdue_leaves_completed_alone() {
        let mut r = record();
        let mut sub = SubRecord::scheduled("dose-1", 500);
        sub.status = SubRecordStatus::Completed;
        sub.given_date = Some(600);
        r.sub_records.push(sub);

        assert_eq!(r.refresh_overdue(1_000), 0);
        assert!(r.sub_records[0].is_completed());
    }

    #[test]
    fn absent_optionals_serialize_as_no_value() {
        let sub = SubRecord::scheduled("dose-1", 2_000);
        let json = serde_json::to_value(&sub).unwrap();
        let map = json.as_object().unwrap();
        assert!(!map.contains_key("given_date"));
        assert!(!map.contains_key("batch_number"));
        assert!(!map.contains_key("administered_by"));
    }

    #[test]
    fn effective_timestamp_falls_back_to_registration() {
        let mut r = record();
        r.updated_at = 0;
        assert_eq!(r.effective_timestamp(), 1_000);
        r.updated_at = 2_500;
        assert_eq!(r.effective_timestamp(), 2_500);
    }
}
