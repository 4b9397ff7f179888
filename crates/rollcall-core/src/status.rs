//! Punctuality classification against a configured cutoff.

use crate::types::Punctuality;
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Arrivals up to this many minutes past the cutoff count as on time.
pub const ON_TIME_GRACE_MINUTES: u32 = 15;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid time of day {0:?} (expected HH:MM)")]
pub struct TimeParseError(pub String);

/// Classify an arrival against the cutoff at minute granularity.
///
/// Seconds on either side are ignored. Before the cutoff is `Early`,
/// up to [`ON_TIME_GRACE_MINUTES`] after it is `OnTime`, beyond that `Late`.
pub fn classify(observed: NaiveTime, cutoff: NaiveTime) -> Punctuality {
    let observed = minute_of_day(observed);
    let cutoff = minute_of_day(cutoff);

    if observed < cutoff {
        return Punctuality::Early;
    }
    if observed - cutoff <= ON_TIME_GRACE_MINUTES {
        Punctuality::OnTime
    } else {
        Punctuality::Late
    }
}

fn minute_of_day(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

/// Configured punctuality boundary, written `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cutoff(NaiveTime);

impl Cutoff {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }

    pub fn classify(&self, observed: NaiveTime) -> Punctuality {
        classify(observed, self.0)
    }
}

impl Default for Cutoff {
    /// 08:00, used only when no cutoff is configured.
    fn default() -> Self {
        Self(NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default())
    }
}

impl fmt::Display for Cutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for Cutoff {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (h, m) = trimmed
            .split_once(':')
            .ok_or_else(|| TimeParseError(s.to_string()))?;
        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if h.is_empty() || h.len() > 2 || m.len() != 2 || !digits(h) || !digits(m) {
            return Err(TimeParseError(s.to_string()));
        }
        let hour: u32 = h.parse().map_err(|_| TimeParseError(s.to_string()))?;
        let minute: u32 = m.parse().map_err(|_| TimeParseError(s.to_string()))?;
        Cutoff::new(hour, minute).ok_or_else(|| TimeParseError(s.to_string()))
    }
}

impl Serialize for Cutoff {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cutoff {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
