//! SQLite-backed registry and ledger.
//!
//! # Schema
//!
//! `persons`: `id` (staff code, primary key), `name`, `role`,
//! `signatures` (JSON array of arrays), `registered_at`.
//!
//! `attendance`: `id` (UUID), `person_id`, `date` (`YYYY-MM-DD`),
//! `time` (`HH:MM:SS`), `status`, `snapshot` (BLOB), `created_at`.
//! `UNIQUE(person_id, date)` backs the one-event-per-day rule across
//! processes sharing the database file.

use crate::{assign_staff_code, AttendanceLedger, Registry, StoreError, DEFAULT_STAFF_PREFIX};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use rollcall_core::{
    AttendanceEvent, NewAttendance, NewPerson, PersonId, PersonRecord, Signature, YearMonth,
};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M:%S";
const DATETIME_FMT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS persons (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    role TEXT,
    signatures TEXT NOT NULL,
    registered_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS attendance (
    id TEXT PRIMARY KEY,
    person_id TEXT NOT NULL,
    date TEXT NOT NULL,
    time TEXT NOT NULL,
    status TEXT NOT NULL,
    snapshot BLOB,
    created_at TEXT NOT NULL,
    UNIQUE (person_id, date)
);
CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date);
";

/// Durable store over a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    staff_prefix: String,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::StorageUnavailable(format!("create {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(path).map_err(unavailable)?;
        tracing::info!(path = %path.display(), "opened attendance database");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory().map_err(unavailable)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(unavailable)?;
        Ok(Self {
            conn: Mutex::new(conn),
            staff_prefix: DEFAULT_STAFF_PREFIX.to_string(),
        })
    }

    pub fn with_staff_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.staff_prefix = prefix.into();
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::StorageUnavailable("connection lock poisoned".into()))
    }

    fn query_events(
        &self,
        sql: &str,
        param: &str,
    ) -> Result<Vec<AttendanceEvent>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(unavailable)?;
        let rows = stmt
            .query_map(params![param], |row| {
                Ok(RawEvent {
                    id: row.get(0)?,
                    person_id: row.get(1)?,
                    date: row.get(2)?,
                    time: row.get(3)?,
                    status: row.get(4)?,
                    snapshot: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })
            .map_err(unavailable)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(unavailable)?;
        rows.into_iter().map(RawEvent::into_event).collect()
    }
}

fn unavailable(e: rusqlite::Error) -> StoreError {
    StoreError::StorageUnavailable(e.to_string())
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation
    )
}

struct RawPerson {
    id: String,
    name: String,
    role: Option<String>,
    signatures: String,
    registered_at: String,
}

impl RawPerson {
    fn into_record(self) -> Result<PersonRecord, StoreError> {
        let signatures: Vec<Signature> = serde_json::from_str(&self.signatures)
            .map_err(|e| StoreError::Corrupt(format!("signatures of {}: {e}", self.id)))?;
        Ok(PersonRecord {
            registered_at: parse_datetime(&self.registered_at)?,
            id: PersonId::new(self.id),
            name: self.name,
            role: self.role,
            signatures,
        })
    }
}

struct RawEvent {
    id: String,
    person_id: String,
    date: String,
    time: String,
    status: String,
    snapshot: Option<Vec<u8>>,
    created_at: String,
}

impl RawEvent {
    fn into_event(self) -> Result<AttendanceEvent, StoreError> {
        Ok(AttendanceEvent {
            id: Uuid::parse_str(&self.id)
                .map_err(|e| StoreError::Corrupt(format!("event id {}: {e}", self.id)))?,
            person_id: PersonId::new(self.person_id),
            date: NaiveDate::parse_from_str(&self.date, DATE_FMT)
                .map_err(|e| StoreError::Corrupt(format!("date {}: {e}", self.date)))?,
            time: NaiveTime::parse_from_str(&self.time, TIME_FMT)
                .map_err(|e| StoreError::Corrupt(format!("time {}: {e}", self.time)))?,
            status: self.status.parse().map_err(StoreError::Corrupt)?,
            snapshot: self.snapshot,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn parse_datetime(s: &str) -> Result<NaiveDateTime, StoreError> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT)
        .map_err(|e| StoreError::Corrupt(format!("timestamp {s}: {e}")))
}

fn read_person(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawPerson> {
    Ok(RawPerson {
        id: row.get(0)?,
        name: row.get(1)?,
        role: row.get(2)?,
        signatures: row.get(3)?,
        registered_at: row.get(4)?,
    })
}

impl Registry for SqliteStore {
    fn all_records(&self) -> Result<Vec<PersonRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, role, signatures, registered_at FROM persons ORDER BY rowid",
            )
            .map_err(unavailable)?;
        let raw = stmt
            .query_map([], read_person)
            .map_err(unavailable)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(unavailable)?;
        raw.into_iter().map(RawPerson::into_record).collect()
    }

    fn get(&self, id: &PersonId) -> Result<Option<PersonRecord>, StoreError> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                "SELECT id, name, role, signatures, registered_at FROM persons WHERE id = ?1",
                params![id.as_str()],
                read_person,
            )
            .optional()
            .map_err(unavailable)?;
        raw.map(RawPerson::into_record).transpose()
    }

    fn register(&self, person: NewPerson) -> Result<PersonRecord, StoreError> {
        person.validate()?;
        let registered_at = chrono::Local::now().naive_local();
        let signatures = serde_json::to_string(&person.signatures)
            .map_err(|e| StoreError::StorageUnavailable(format!("encode signatures: {e}")))?;

        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(unavailable)?;
        let id = assign_staff_code(&self.staff_prefix, registered_at.year(), |code| {
            tx.query_row("SELECT 1 FROM persons WHERE id = ?1", params![code], |_| Ok(()))
                .optional()
                .map(|hit| hit.is_some())
                .map_err(unavailable)
        })?;
        let record = PersonRecord {
            id,
            name: person.name.trim().to_string(),
            role: person.role.filter(|r| !r.trim().is_empty()),
            signatures: person.signatures,
            registered_at,
        };
        tx.execute(
            "INSERT INTO persons (id, name, role, signatures, registered_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id.as_str(),
                &record.name,
                &record.role,
                &signatures,
                record.registered_at.format(DATETIME_FMT).to_string(),
            ],
        )
        .map_err(unavailable)?;
        tx.commit().map_err(unavailable)?;

        tracing::info!(person = %record.id, name = %record.name, "person registered");
        Ok(record)
    }
}

impl AttendanceLedger for SqliteStore {
    fn already_recorded(&self, person_id: &PersonId, date: NaiveDate) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let hit = conn
            .query_row(
                "SELECT 1 FROM attendance WHERE person_id = ?1 AND date = ?2",
                params![person_id.as_str(), date.format(DATE_FMT).to_string()],
                |_| Ok(()),
            )
            .optional()
            .map_err(unavailable)?;
        Ok(hit.is_some())
    }

    fn append(&self, entry: NewAttendance) -> Result<Uuid, StoreError> {
        let date = entry.date();
        let date_str = date.format(DATE_FMT).to_string();

        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(unavailable)?;

        let known = tx
            .query_row(
                "SELECT 1 FROM persons WHERE id = ?1",
                params![entry.person_id.as_str()],
                |_| Ok(()),
            )
            .optional()
            .map_err(unavailable)?;
        if known.is_none() {
            return Err(StoreError::InvalidReference(entry.person_id));
        }

        let id = Uuid::new_v4();
        let inserted = tx.execute(
            "INSERT INTO attendance (id, person_id, date, time, status, snapshot, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.to_string(),
                entry.person_id.as_str(),
                &date_str,
                entry.time().format(TIME_FMT).to_string(),
                entry.status.as_str(),
                &entry.snapshot,
                chrono::Local::now().naive_local().format(DATETIME_FMT).to_string(),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(StoreError::DuplicateEntry {
                    person_id: entry.person_id,
                    date,
                });
            }
            Err(e) => return Err(unavailable(e)),
        }
        tx.commit().map_err(unavailable)?;
        Ok(id)
    }

    fn events_on_date(&self, date: NaiveDate) -> Result<Vec<AttendanceEvent>, StoreError> {
        self.query_events(
            "SELECT id, person_id, date, time, status, snapshot, created_at
             FROM attendance WHERE date = ?1 ORDER BY rowid",
            &date.format(DATE_FMT).to_string(),
        )
    }

    fn events_in_month(&self, month: YearMonth) -> Result<Vec<AttendanceEvent>, StoreError> {
        self.query_events(
            "SELECT id, person_id, date, time, status, snapshot, created_at
             FROM attendance WHERE substr(date, 1, 7) = ?1 ORDER BY rowid",
            &month.to_string(),
        )
    }
}
