//! Daily attendance ledger guard.
//!
//! At most one [`AttendanceRecord`] exists per identity per UTC calendar day.
//! The guard never decides that on its own read: uniqueness is enforced by
//! the store's atomic insert-if-absent, and a lost race is resolved by reading
//! back the winner.

use crate::error::StoreError;
use crate::types::AttendanceRecord;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Result of a conditional insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// Storage for attendance records keyed on (identity, UTC day).
pub trait LedgerStore {
    /// Record for `identity_id` on `day`, if any.
    fn find_record(
        &self,
        identity_id: &str,
        day: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Insert `record` unless one already exists for its (identity, day).
    ///
    /// Must be atomic: two concurrent calls for the same key never both
    /// return [`InsertOutcome::Inserted`].
    fn insert_if_absent(&self, record: &AttendanceRecord) -> Result<InsertOutcome, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "record", rename_all = "snake_case")]
pub enum LedgerOutcome {
    Recorded(AttendanceRecord),
    AlreadyRecorded(AttendanceRecord),
}

impl LedgerOutcome {
    pub fn record(&self) -> &AttendanceRecord {
        match self {
            LedgerOutcome::Recorded(r) | LedgerOutcome::AlreadyRecorded(r) => r,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, LedgerOutcome::Recorded(_))
    }
}

/// Record attendance for `identity_id` unless it is already recorded for the
/// UTC day of `now`. Idempotent and safe to retry.
pub fn record_if_absent<L: LedgerStore + ?Sized>(
    store: &L,
    identity_id: &str,
    now: DateTime<Utc>,
    confidence: f32,
) -> Result<LedgerOutcome, StoreError> {
    let day = now.date_naive();

    if let Some(prior) = store.find_record(identity_id, day)? {
        return Ok(LedgerOutcome::AlreadyRecorded(prior));
    }

    let record = AttendanceRecord {
        identity_id: identity_id.to_string(),
        timestamp: now,
        confidence,
    };

    match store.insert_if_absent(&record)? {
        InsertOutcome::Inserted => Ok(LedgerOutcome::Recorded(record)),
        InsertOutcome::AlreadyExists => store
            .find_record(identity_id, day)?
            .map(LedgerOutcome::AlreadyRecorded)
            .ok_or_else(|| StoreError::Inconsistent {
                identity_id: identity_id.to_string(),
                day: day.to_string(),
            }),
    }
}
