//! rollcall-store — Staff registry and attendance ledger.
//!
//! Two collections: `persons`, keyed by staff code, and `attendance`,
//! indexed by date and unique on (person, date). [`SqliteStore`] is the
//! durable implementation; [`MemoryStore`] has identical semantics and
//! backs tests and ephemeral sessions.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use chrono::NaiveDate;
use rand::Rng;
use rollcall_core::{
    AttendanceEvent, NewAttendance, NewPerson, PersonId, PersonRecord, RecordError, YearMonth,
};
use thiserror::Error;
use uuid::Uuid;

/// Staff code prefix used when none is configured.
pub const DEFAULT_STAFF_PREFIX: &str = "STF";

/// Attempts at drawing an unused staff code before giving up.
const STAFF_CODE_ATTEMPTS: usize = 32;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("attendance already recorded for {person_id} on {date}")]
    DuplicateEntry { person_id: PersonId, date: NaiveDate },
    #[error("unknown person: {0}")]
    InvalidReference(PersonId),
    #[error("staff code already registered: {0}")]
    DuplicatePerson(PersonId),
    #[error("invalid record: {0}")]
    InvalidRecord(#[from] RecordError),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("corrupt stored record: {0}")]
    Corrupt(String),
}

/// Read access to registered people, plus registration.
pub trait Registry: Send + Sync {
    /// Every registered person, in registration order. Empty, not an
    /// error, when nobody is registered.
    fn all_records(&self) -> Result<Vec<PersonRecord>, StoreError>;

    fn get(&self, id: &PersonId) -> Result<Option<PersonRecord>, StoreError>;

    /// Validate and persist a new person under a freshly assigned staff code.
    fn register(&self, person: NewPerson) -> Result<PersonRecord, StoreError>;
}

/// Append-only, date-partitioned attendance store.
pub trait AttendanceLedger: Send + Sync {
    fn already_recorded(&self, person_id: &PersonId, date: NaiveDate) -> Result<bool, StoreError>;

    /// Persist one event. Re-checks uniqueness on (person, date) and the
    /// person reference atomically with the insert.
    fn append(&self, entry: NewAttendance) -> Result<Uuid, StoreError>;

    /// Events on `date`, in insertion order.
    fn events_on_date(&self, date: NaiveDate) -> Result<Vec<AttendanceEvent>, StoreError>;

    /// Events in `month`, in insertion order.
    fn events_in_month(&self, month: YearMonth) -> Result<Vec<AttendanceEvent>, StoreError>;
}

/// Draw staff codes of the form `PREFIX-YEAR-NNNNN` until `taken` rejects one.
pub(crate) fn assign_staff_code(
    prefix: &str,
    year: i32,
    mut taken: impl FnMut(&str) -> Result<bool, StoreError>,
) -> Result<PersonId, StoreError> {
    let mut rng = rand::thread_rng();
    for _ in 0..STAFF_CODE_ATTEMPTS {
        let code = format!("{prefix}-{year}-{:05}", rng.gen_range(0..100_000u32));
        if !taken(&code)? {
            return Ok(PersonId::new(code));
        }
    }
    Err(StoreError::StorageUnavailable(format!(
        "no free staff code for {prefix}-{year} after {STAFF_CODE_ATTEMPTS} attempts"
    )))
}
