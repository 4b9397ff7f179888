//! JSON-lines probe feed.
//!
//! Stands in for camera + signature model when the daemon is driven by an
//! upstream recogniser: each line is one frame, carrying the signature
//! that recogniser produced, e.g. `{"signature": [0.01, -0.2, ...]}`, or
//! `{"signature": null}` when it saw no face. End of input closes the
//! session.

use rollcall_core::{ExtractError, Frame, FrameError, FrameSource, Signature, SignatureSource};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Longest accepted probe line. Longer lines are cut off and handed on as
/// an empty, undecodable frame.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Line-oriented frame source. Frame data is the raw line, undecoded.
pub struct ProbeFeed {
    reader: Box<dyn BufRead + Send>,
    sequence: u32,
}

impl ProbeFeed {
    /// Open `path`, or stdin when `None`.
    pub fn open(path: Option<&Path>) -> std::io::Result<Self> {
        let reader: Box<dyn BufRead + Send> = match path {
            Some(p) => {
                tracing::info!(path = %p.display(), "reading probes from file");
                Box::new(BufReader::new(File::open(p)?))
            }
            None => {
                tracing::info!("reading probes from stdin");
                Box::new(BufReader::new(std::io::stdin()))
            }
        };
        Ok(Self::from_reader(reader))
    }

    pub fn from_reader(reader: Box<dyn BufRead + Send>) -> Self {
        Self { reader, sequence: 0 }
    }
}

impl FrameSource for ProbeFeed {
    fn next_frame(&mut self) -> Result<Frame, FrameError> {
        loop {
            let mut line = Vec::new();
            let read = (&mut self.reader)
                .take(MAX_LINE_BYTES as u64 + 1)
                .read_until(b'\n', &mut line)
                .map_err(unavailable)?;
            if read == 0 {
                return Err(FrameError::Closed);
            }

            let data = if line.len() > MAX_LINE_BYTES && line.last() != Some(&b'\n') {
                skip_rest_of_line(self.reader.as_mut())?;
                tracing::warn!(seq = self.sequence, "probe line over {MAX_LINE_BYTES} bytes discarded");
                Vec::new()
            } else {
                let trimmed = trim_ascii(&line);
                if trimmed.is_empty() {
                    continue;
                }
                trimmed.to_vec()
            };

            let sequence = self.sequence;
            self.sequence = self.sequence.wrapping_add(1);
            return Ok(Frame {
                data,
                width: 0,
                height: 0,
                sequence,
            });
        }
    }
}

fn unavailable(e: std::io::Error) -> FrameError {
    FrameError::Unavailable(format!("probe feed: {e}"))
}

fn skip_rest_of_line(reader: &mut (dyn BufRead + Send)) -> Result<(), FrameError> {
    loop {
        let buf = reader.fill_buf().map_err(unavailable)?;
        if buf.is_empty() {
            return Ok(());
        }
        match buf.iter().position(|&b| b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(());
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace());
    let end = bytes.iter().rposition(|b| !b.is_ascii_whitespace());
    match (start, end) {
        (Some(start), Some(end)) => &bytes[start..=end],
        _ => &[],
    }
}

#[derive(Deserialize)]
struct ProbeLine {
    signature: Option<Vec<f32>>,
}

/// Decodes the signature carried in a [`ProbeFeed`] frame.
pub struct ProbeDecoder;

impl SignatureSource for ProbeDecoder {
    fn extract(&mut self, frame: &Frame) -> Result<Option<Signature>, ExtractError> {
        let probe: ProbeLine = serde_json::from_slice(&frame.data)
            .map_err(|e| ExtractError::ModelFailed(format!("malformed probe line: {e}")))?;
        let Some(values) = probe.signature else {
            return Ok(None);
        };
        let signature = Signature::new(values);
        signature
            .validate()
            .map_err(|e| ExtractError::ModelFailed(e.to_string()))?;
        Ok(Some(signature))
    }
}
