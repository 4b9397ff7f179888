use chrono::NaiveTime;
use rollcall_core::{
    Clock, Cutoff, EuclideanMatcher, FrameError, FrameSource, Matcher, NewAttendance, PersonId,
    PersonRecord, Punctuality, SignatureSource, DEFAULT_MATCH_THRESHOLD,
};
use rollcall_store::{AttendanceLedger, Registry, StoreError};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),
    #[error("attendance references unknown person {0}")]
    InvalidReference(PersonId),
    #[error("storage error: {0}")]
    Storage(StoreError),
    #[error("capture worker panicked")]
    WorkerPanicked,
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidReference(id) => EngineError::InvalidReference(id),
            other => EngineError::Storage(other),
        }
    }
}

/// Outcome of one recognition attempt, published for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Feedback {
    NoFace,
    Unrecognized,
    AlreadyRecorded {
        person_id: PersonId,
        name: String,
        time: NaiveTime,
    },
    Recorded {
        person_id: PersonId,
        name: String,
        time: NaiveTime,
        status: Punctuality,
        event_id: Uuid,
    },
    /// A transient failure (storage, model); the session carries on.
    AttemptFailed { reason: String },
}

/// What a finished attempt means for the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    Reported(Feedback),
    /// The frame source ended; the session should stop cleanly.
    Closed,
}

/// Matching and punctuality parameters.
#[derive(Debug, Clone, Copy)]
pub struct MatchSettings {
    pub threshold: f32,
    pub cutoff: Cutoff,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            cutoff: Cutoff::default(),
        }
    }
}

/// Runs single frame → signature → match → record attempts.
///
/// Owns the frame source, the signature model and a registry snapshot
/// taken at construction. The snapshot only changes on an explicit
/// [`request_refresh`](Self::request_refresh).
pub struct Resolver<F, S> {
    frames: F,
    signatures: S,
    registry: Arc<dyn Registry>,
    ledger: Arc<dyn AttendanceLedger>,
    clock: Arc<dyn Clock>,
    matcher: Box<dyn Matcher + Send>,
    settings: MatchSettings,
    snapshot: Vec<PersonRecord>,
    refresh_pending: bool,
}

impl<F: FrameSource, S: SignatureSource> Resolver<F, S> {
    pub fn new(
        frames: F,
        signatures: S,
        registry: Arc<dyn Registry>,
        ledger: Arc<dyn AttendanceLedger>,
        clock: Arc<dyn Clock>,
        settings: MatchSettings,
    ) -> Result<Self, EngineError> {
        let snapshot = registry.all_records()?;
        tracing::info!(persons = snapshot.len(), "registry snapshot loaded");
        Ok(Self {
            frames,
            signatures,
            registry,
            ledger,
            clock,
            matcher: Box::new(EuclideanMatcher),
            settings,
            snapshot,
            refresh_pending: false,
        })
    }

    /// Replace the matching strategy.
    pub fn with_matcher(mut self, matcher: Box<dyn Matcher + Send>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Reload the registry snapshot before the next attempt.
    pub fn request_refresh(&mut self) {
        self.refresh_pending = true;
    }

    pub fn registered(&self) -> usize {
        self.snapshot.len()
    }

    /// Run one attempt to completion.
    ///
    /// Only fatal conditions (camera loss, a dangling person reference)
    /// come back as `Err`; everything else is reported as [`Feedback`].
    pub fn attempt(&mut self) -> Result<Attempt, EngineError> {
        if self.refresh_pending {
            match self.registry.all_records() {
                Ok(snapshot) => {
                    tracing::info!(persons = snapshot.len(), "registry snapshot refreshed");
                    self.snapshot = snapshot;
                    self.refresh_pending = false;
                }
                Err(e) => return transient(e),
            }
        }

        let frame = match self.frames.next_frame() {
            Ok(frame) => frame,
            Err(FrameError::Closed) => return Ok(Attempt::Closed),
            Err(FrameError::Unavailable(reason)) => {
                return Err(EngineError::CameraUnavailable(reason))
            }
        };

        let probe = match self.signatures.extract(&frame) {
            Ok(Some(probe)) => probe,
            Ok(None) => {
                tracing::debug!(seq = frame.sequence, "no face detected");
                return Ok(Attempt::Reported(Feedback::NoFace));
            }
            Err(e) => {
                tracing::warn!(seq = frame.sequence, error = %e, "signature extraction failed");
                return Ok(Attempt::Reported(Feedback::AttemptFailed {
                    reason: e.to_string(),
                }));
            }
        };

        let Some(found) = self
            .matcher
            .find_match(&probe, &self.snapshot, self.settings.threshold)
        else {
            tracing::debug!(seq = frame.sequence, "no registered person within threshold");
            return Ok(Attempt::Reported(Feedback::Unrecognized));
        };
        let person_id = found.person.id.clone();
        let name = found.person.name.clone();
        tracing::debug!(person = %person_id, distance = found.distance, "probe matched");

        let now = self.clock.now();
        let time = now.time();

        match self.ledger.already_recorded(&person_id, now.date()) {
            Ok(true) => {
                tracing::debug!(person = %person_id, "already recorded today");
                return Ok(Attempt::Reported(Feedback::AlreadyRecorded {
                    person_id,
                    name,
                    time,
                }));
            }
            Ok(false) => {}
            Err(e) => return transient(e),
        }

        let status = self.settings.cutoff.classify(time);
        let entry = NewAttendance {
            person_id: person_id.clone(),
            captured_at: now,
            status,
            snapshot: Some(frame.data),
        };

        match self.ledger.append(entry) {
            Ok(event_id) => {
                tracing::info!(person = %person_id, name = %name, status = %status, "attendance recorded");
                Ok(Attempt::Reported(Feedback::Recorded {
                    person_id,
                    name,
                    time,
                    status,
                    event_id,
                }))
            }
            // Lost a race with another writer; the day is covered either way.
            Err(StoreError::DuplicateEntry { .. }) => {
                Ok(Attempt::Reported(Feedback::AlreadyRecorded {
                    person_id,
                    name,
                    time,
                }))
            }
            Err(e) => transient(e),
        }
    }
}

/// Report a storage failure as a failed attempt, except dangling
/// references, which end the session.
fn transient(e: StoreError) -> Result<Attempt, EngineError> {
    match e {
        StoreError::InvalidReference(id) => Err(EngineError::InvalidReference(id)),
        other => {
            tracing::warn!(error = %other, "attempt failed on storage");
            Ok(Attempt::Reported(Feedback::AttemptFailed {
                reason: other.to_string(),
            }))
        }
    }
}
