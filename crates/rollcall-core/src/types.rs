use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Upper bound on reference signatures kept per person.
pub const MAX_SIGNATURES_PER_PERSON: usize = 10;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("display name must not be empty")]
    EmptyName,
    #[error("person has no reference signatures")]
    NoSignatures,
    #[error("too many reference signatures: {0} (max {MAX_SIGNATURES_PER_PERSON})")]
    TooManySignatures(usize),
    #[error("signature is empty")]
    EmptySignature,
    #[error("signature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("signature contains non-finite values")]
    NonFiniteSignature,
    #[error("invalid year-month {0:?} (expected YYYY-MM)")]
    InvalidYearMonth(String),
}

/// Fixed-length face signature produced by the recognition model
/// (128 values for the reference descriptor model).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature {
    pub values: Vec<f32>,
}

impl Signature {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Compute Euclidean distance between two signatures.
    ///
    /// Callers are responsible for comparing equal-length signatures;
    /// extra trailing values on the longer side are ignored.
    pub fn euclidean_distance(&self, other: &Signature) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }

    /// Reject empty signatures and NaN/infinite components.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.values.is_empty() {
            return Err(RecordError::EmptySignature);
        }
        if self.values.iter().any(|v| !v.is_finite()) {
            return Err(RecordError::NonFiniteSignature);
        }
        Ok(())
    }
}

/// Stable staff identifier, assigned once at registration and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(String);

impl PersonId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersonId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A registered person with one or more reference signatures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub id: PersonId,
    pub name: String,
    pub role: Option<String>,
    pub signatures: Vec<Signature>,
    pub registered_at: NaiveDateTime,
}

impl PersonRecord {
    /// Signature length shared by every reference signature.
    pub fn dimension(&self) -> Option<usize> {
        self.signatures.first().map(Signature::len)
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        validate_profile(&self.name, &self.signatures)
    }
}

/// Registration request; the registry assigns the identifier and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPerson {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    pub signatures: Vec<Signature>,
}

impl NewPerson {
    pub fn validate(&self) -> Result<(), RecordError> {
        validate_profile(&self.name, &self.signatures)
    }
}

fn validate_profile(name: &str, signatures: &[Signature]) -> Result<(), RecordError> {
    if name.trim().is_empty() {
        return Err(RecordError::EmptyName);
    }
    let first = signatures.first().ok_or(RecordError::NoSignatures)?;
    if signatures.len() > MAX_SIGNATURES_PER_PERSON {
        return Err(RecordError::TooManySignatures(signatures.len()));
    }
    let expected = first.len();
    for sig in signatures {
        sig.validate()?;
        if sig.len() != expected {
            return Err(RecordError::DimensionMismatch {
                expected,
                actual: sig.len(),
            });
        }
    }
    Ok(())
}

/// Punctuality category derived from arrival time and the configured cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Punctuality {
    Early,
    OnTime,
    Late,
}

impl Punctuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Punctuality::Early => "Early",
            Punctuality::OnTime => "OnTime",
            Punctuality::Late => "Late",
        }
    }
}

impl fmt::Display for Punctuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Punctuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Early" => Ok(Punctuality::Early),
            "OnTime" => Ok(Punctuality::OnTime),
            "Late" => Ok(Punctuality::Late),
            other => Err(format!("unknown punctuality status: {other}")),
        }
    }
}

/// Attendance entry handed to the ledger; the ledger assigns id and creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendance {
    pub person_id: PersonId,
    /// Local wall-clock time of the capture.
    pub captured_at: NaiveDateTime,
    pub status: Punctuality,
    /// Opaque snapshot of the matching frame.
    pub snapshot: Option<Vec<u8>>,
}

impl NewAttendance {
    pub fn date(&self) -> NaiveDate {
        self.captured_at.date()
    }

    pub fn time(&self) -> NaiveTime {
        self.captured_at.time()
    }
}

/// A persisted attendance event. At most one exists per (person, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub id: Uuid,
    pub person_id: PersonId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: Punctuality,
    #[serde(skip)]
    pub snapshot: Option<Vec<u8>>,
    pub created_at: NaiveDateTime,
}

/// Calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RecordError::InvalidYearMonth(s.to_string());
        let (y, m) = s.trim().split_once('-').ok_or_else(invalid)?;
        if y.len() != 4 || m.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = y.parse().map_err(|_| invalid())?;
        let month: u32 = m.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self { year, month })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(values: &[f32]) -> Signature {
        Signature::new(values.to_vec())
    }

    #[test]
    fn test_euclidean_distance() {
        let a = sig(&[0.0, 0.0]);
        let b = sig(&[3.0, 4.0]);
        assert!((a.euclidean_distance(&b) - 5.0).abs() < 1e-6);
        assert_eq!(a.euclidean_distance(&a), 0.0);
    }

    #[test]
    fn test_signature_rejects_nan() {
        assert_eq!(
            sig(&[1.0, f32::NAN]).validate(),
            Err(RecordError::NonFiniteSignature)
        );
        assert_eq!(sig(&[]).validate(), Err(RecordError::EmptySignature));
    }

    #[test]
    fn test_new_person_validation() {
        let ok = NewPerson {
            name: "Ada".into(),
            role: None,
            signatures: vec![sig(&[0.1, 0.2]), sig(&[0.3, 0.4])],
        };
        assert!(ok.validate().is_ok());

        let no_sigs = NewPerson { signatures: vec![], ..ok.clone() };
        assert_eq!(no_sigs.validate(), Err(RecordError::NoSignatures));

        let blank = NewPerson { name: "  ".into(), ..ok.clone() };
        assert_eq!(blank.validate(), Err(RecordError::EmptyName));

        let ragged = NewPerson {
            signatures: vec![sig(&[0.1, 0.2]), sig(&[0.3])],
            ..ok
        };
        assert_eq!(
            ragged.validate(),
            Err(RecordError::DimensionMismatch { expected: 2, actual: 1 })
        );
    }

    #[test]
    fn test_too_many_signatures() {
        let p = NewPerson {
            name: "Ada".into(),
            role: None,
            signatures: vec![sig(&[0.0]); MAX_SIGNATURES_PER_PERSON + 1],
        };
        assert_eq!(
            p.validate(),
            Err(RecordError::TooManySignatures(MAX_SIGNATURES_PER_PERSON + 1))
        );
    }

    #[test]
    fn test_year_month_parse() {
        let ym: YearMonth = "2026-03".parse().unwrap();
        assert_eq!(ym, YearMonth { year: 2026, month: 3 });
        assert_eq!(ym.to_string(), "2026-03");
        assert!(ym.contains(NaiveDate::from_ymd_opt(2026, 3, 31).unwrap()));
        assert!(!ym.contains(NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()));
        assert!("2026-13".parse::<YearMonth>().is_err());
        assert!("2026-3".parse::<YearMonth>().is_err());
        assert!("march".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_punctuality_round_trip_str() {
        for p in [Punctuality::Early, Punctuality::OnTime, Punctuality::Late] {
            assert_eq!(p.as_str().parse::<Punctuality>(), Ok(p));
        }
    }
}
