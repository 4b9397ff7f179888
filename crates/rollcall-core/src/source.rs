//! Boundaries to the camera, the signature model and the wall clock.

use crate::types::Signature;
use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameError {
    /// The camera is gone; the capture session cannot continue.
    #[error("camera unavailable: {0}")]
    Unavailable(String),
    /// The frame stream ended normally.
    #[error("frame stream closed")]
    Closed,
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("signature model failed: {0}")]
    ModelFailed(String),
}

/// A captured camera frame. The engine never interprets the pixel data;
/// it is handed to the signature model and kept as the attendance snapshot.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub sequence: u32,
}

/// Source of camera frames.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Frame, FrameError>;
}

/// Face signature model.
pub trait SignatureSource: Send {
    /// Extract the signature of the single face in `frame`.
    ///
    /// Returns `Ok(None)` when no face is detectable; that is an ordinary
    /// outcome, not an error.
    fn extract(&mut self, frame: &Frame) -> Result<Option<Signature>, ExtractError>;
}

/// Local wall clock used to stamp attendance.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// [`Clock`] backed by the system's local time zone.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}
