//! Line-delimited JSON codec for pimon readings.
//!
//! Wire format:
//! ```text
//! {"temperature_c":"45.0","core_volts":"1.2","arm_clock_mhz":"700","core_clock_mhz":"400","arm_mem_mb":"128","iteration":1}\n
//! ```
//! One reading per line, UTF-8, no length prefix and no checksum.  The
//! serialized object never contains a raw newline, so `\n` is an exact frame
//! boundary.
//!
//! # Reassembly (for beginners)
//!
//! TCP is a byte stream, not a message stream.  A single `read` may return
//! half a frame, exactly one frame, or three and a half frames.
//! [`FrameDecoder`] keeps the bytes it has not yet been able to frame and
//! only hands out a reading once its terminating newline has arrived:
//!
//! ```text
//! read #1: {"temperature_c":"45.0","core_vo
//! read #2: lts":"1.2",...,"iteration":1}\n{"temperature_c":"45.
//!                                        ^ frame 1 complete here
//! read #3: 1",...,"iteration":2}\n
//!                               ^ frame 2 complete here
//! ```

use serde_json::Value;
use thiserror::Error;

use crate::protocol::reading::Reading;

/// Byte that terminates every frame.
pub const FRAME_DELIMITER: u8 = b'\n';

/// Errors that can occur while encoding or decoding a frame.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The line contains bytes that are not valid UTF-8.
    #[error("frame is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    /// The line is not a JSON object matching the reading schema (bad JSON,
    /// missing field, unparseable value, zero iteration, ...).
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The reading could not be serialized.
    #[error("failed to serialize reading: {0}")]
    Serialize(String),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes one [`Reading`] as exactly one newline-terminated frame.
///
/// # Errors
///
/// Returns [`FrameError::Serialize`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use std::num::NonZeroU64;
/// use pimon_core::{decode_frame, encode_frame, Reading, Tenths};
///
/// let reading = Reading::new(
///     Tenths::from_tenths(450),
///     Tenths::from_tenths(12),
///     700,
///     400,
///     128,
///     NonZeroU64::new(1).unwrap(),
/// );
/// let bytes = encode_frame(&reading).unwrap();
/// assert_eq!(bytes.last(), Some(&b'\n'));
///
/// let line = std::str::from_utf8(&bytes).unwrap();
/// assert_eq!(decode_frame(line).unwrap(), reading);
/// ```
pub fn encode_frame(reading: &Reading) -> Result<Vec<u8>, FrameError> {
    let mut buf =
        serde_json::to_vec(reading).map_err(|e| FrameError::Serialize(e.to_string()))?;
    buf.push(FRAME_DELIMITER);
    Ok(buf)
}

/// Decodes one line (without or with its trailing newline) into a [`Reading`].
///
/// Surrounding whitespace is ignored.  Unknown keys are ignored; every known
/// key must be present and well-formed.
///
/// # Errors
///
/// Returns [`FrameError::Malformed`] if the line is not a JSON object, a
/// field is missing or unparseable, or `iteration` is zero.
pub fn decode_frame(line: &str) -> Result<Reading, FrameError> {
    let value: Value =
        serde_json::from_str(line.trim()).map_err(|e| FrameError::Malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(FrameError::Malformed(format!(
            "expected a JSON object, found {}",
            json_kind(&value)
        )));
    }
    serde_json::from_value(value).map_err(|e| FrameError::Malformed(e.to_string()))
}

/// Incremental frame reassembler.
///
/// Bytes are appended with [`push`](Self::push); complete frames are taken
/// out with [`next_frame`](Self::next_frame) or [`frames`](Self::frames).
/// Bytes after the last newline stay buffered until more data arrives.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends newly received bytes to the reassembly buffer.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Takes the next complete frame out of the buffer.
    ///
    /// Returns `None` when no newline-terminated line is buffered.  Lines
    /// that are empty after trimming are discarded silently.  A malformed
    /// line is removed from the buffer before its error is returned, so a
    /// caller that chooses to continue will not see it again.
    pub fn next_frame(&mut self) -> Option<Result<Reading, FrameError>> {
        loop {
            let end = self.buffer.iter().position(|b| *b == FRAME_DELIMITER)?;
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            let text = match std::str::from_utf8(&line[..end]) {
                Ok(text) => text,
                Err(e) => return Some(Err(FrameError::InvalidUtf8(e.to_string()))),
            };
            if text.trim().is_empty() {
                continue;
            }
            return Some(decode_frame(text));
        }
    }

    /// Returns an iterator over all complete frames currently buffered.
    pub fn frames(&mut self) -> Frames<'_> {
        Frames { decoder: self }
    }

    /// Number of bytes waiting for a terminating newline.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Iterator returned by [`FrameDecoder::frames`].
pub struct Frames<'a> {
    decoder: &'a mut FrameDecoder,
}

impl Iterator for Frames<'_> {
    type Item = Result<Reading, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.next_frame()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
