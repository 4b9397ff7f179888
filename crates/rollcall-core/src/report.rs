//! Monthly attendance summary.

use crate::types::{AttendanceEvent, PersonId, PersonRecord, Punctuality, YearMonth};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-person attendance counts for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyRow {
    pub person_id: PersonId,
    /// Empty when the person is no longer in the registry.
    pub name: String,
    pub present: u32,
    pub early: u32,
    pub on_time: u32,
    pub late: u32,
}

/// Summarise `events` falling in `month`, optionally for a single person.
///
/// Rows are ordered by person id. Only people with at least one event
/// in the month appear.
pub fn monthly_summary(
    events: &[AttendanceEvent],
    persons: &[PersonRecord],
    month: YearMonth,
    only: Option<&PersonId>,
) -> Vec<MonthlyRow> {
    let names: BTreeMap<&PersonId, &str> = persons.iter().map(|p| (&p.id, p.name.as_str())).collect();
    let mut rows: BTreeMap<&PersonId, MonthlyRow> = BTreeMap::new();

    for event in events {
        if !month.contains(event.date) {
            continue;
        }
        if only.is_some_and(|id| *id != event.person_id) {
            continue;
        }
        let row = rows.entry(&event.person_id).or_insert_with(|| MonthlyRow {
            person_id: event.person_id.clone(),
            name: names.get(&event.person_id).copied().unwrap_or_default().to_string(),
            present: 0,
            early: 0,
            on_time: 0,
            late: 0,
        });
        row.present += 1;
        match event.status {
            Punctuality::Early => row.early += 1,
            Punctuality::OnTime => row.on_time += 1,
            Punctuality::Late => row.late += 1,
        }
    }

    rows.into_values().collect()
}
