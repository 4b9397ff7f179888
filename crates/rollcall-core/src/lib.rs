//! rollcall-core — Identity resolution and punctuality policy.
//!
//! Holds the data model shared by the store and the capture daemon,
//! exhaustive Euclidean nearest-neighbour matching over registered
//! signatures, and the cutoff-based punctuality classification.

pub mod matcher;
pub mod report;
pub mod source;
pub mod status;
pub mod types;

pub use matcher::{EuclideanMatcher, Match, Matcher, DEFAULT_MATCH_THRESHOLD};
pub use source::{Clock, ExtractError, Frame, FrameError, FrameSource, SignatureSource, SystemClock};
pub use status::{classify, Cutoff, TimeParseError};
pub use types::{
    AttendanceEvent, NewAttendance, NewPerson, PersonId, PersonRecord, Punctuality, RecordError,
    Signature, YearMonth,
};
