//! In-memory store with the same semantics as the SQLite store.

use crate::{assign_staff_code, AttendanceLedger, Registry, StoreError, DEFAULT_STAFF_PREFIX};
use chrono::{Datelike, NaiveDate};
use rollcall_core::{
    AttendanceEvent, NewAttendance, NewPerson, PersonId, PersonRecord, YearMonth,
};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct State {
    persons: Vec<PersonRecord>,
    events: Vec<AttendanceEvent>,
}

/// Mutex-guarded registry + ledger. The lock makes check-then-insert atomic.
pub struct MemoryStore {
    state: Mutex<State>,
    staff_prefix: String,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            staff_prefix: DEFAULT_STAFF_PREFIX.to_string(),
        }
    }

    pub fn with_staff_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.staff_prefix = prefix.into();
        self
    }

    /// Insert a fully formed record, keeping its identifier.
    pub fn insert_person(&self, person: PersonRecord) -> Result<(), StoreError> {
        person.validate()?;
        let mut state = self.lock()?;
        if state.persons.iter().any(|p| p.id == person.id) {
            return Err(StoreError::DuplicatePerson(person.id));
        }
        state.persons.push(person);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::StorageUnavailable("memory store lock poisoned".into()))
    }
}

impl Registry for MemoryStore {
    fn all_records(&self) -> Result<Vec<PersonRecord>, StoreError> {
        Ok(self.lock()?.persons.clone())
    }

    fn get(&self, id: &PersonId) -> Result<Option<PersonRecord>, StoreError> {
        Ok(self.lock()?.persons.iter().find(|p| &p.id == id).cloned())
    }

    fn register(&self, person: NewPerson) -> Result<PersonRecord, StoreError> {
        person.validate()?;
        let registered_at = chrono::Local::now().naive_local();
        let mut state = self.lock()?;
        let id = assign_staff_code(&self.staff_prefix, registered_at.year(), |code| {
            Ok(state.persons.iter().any(|p| p.id.as_str() == code))
        })?;
        let record = PersonRecord {
            id,
            name: person.name.trim().to_string(),
            role: person.role.filter(|r| !r.trim().is_empty()),
            signatures: person.signatures,
            registered_at,
        };
        state.persons.push(record.clone());
        tracing::info!(person = %record.id, name = %record.name, "person registered");
        Ok(record)
    }
}

impl AttendanceLedger for MemoryStore {
    fn already_recorded(&self, person_id: &PersonId, date: NaiveDate) -> Result<bool, StoreError> {
        Ok(self
            .lock()?
            .events
            .iter()
            .any(|e| &e.person_id == person_id && e.date == date))
    }

    fn append(&self, entry: NewAttendance) -> Result<Uuid, StoreError> {
        let mut state = self.lock()?;
        if !state.persons.iter().any(|p| p.id == entry.person_id) {
            return Err(StoreError::InvalidReference(entry.person_id));
        }
        let date = entry.date();
        if state
            .events
            .iter()
            .any(|e| e.person_id == entry.person_id && e.date == date)
        {
            return Err(StoreError::DuplicateEntry {
                person_id: entry.person_id,
                date,
            });
        }
        let id = Uuid::new_v4();
        state.events.push(AttendanceEvent {
            id,
            person_id: entry.person_id,
            date,
            time: entry.captured_at.time(),
            status: entry.status,
            snapshot: entry.snapshot,
            created_at: chrono::Local::now().naive_local(),
        });
        Ok(id)
    }

    fn events_on_date(&self, date: NaiveDate) -> Result<Vec<AttendanceEvent>, StoreError> {
        Ok(self
            .lock()?
            .events
            .iter()
            .filter(|e| e.date == date)
            .cloned()
            .collect())
    }

    fn events_in_month(&self, month: YearMonth) -> Result<Vec<AttendanceEvent>, StoreError> {
        Ok(self
            .lock()?
            .events
            .iter()
            .filter(|e| month.contains(e.date))
            .cloned()
            .collect())
    }
}
