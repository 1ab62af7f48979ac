//! Core types for the racecar log decoder library
//!
//! This module defines the raw frame read from a log and the error types used
//! throughout the decoder. Frames are kept close to the log representation
//! (hex payload string, textual ID) so that a single bad field only affects the
//! frame it belongs to.

use std::fmt;

/// Timestamp type used throughout the decoder (milliseconds since log start)
pub type Timestamp = i64;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Raw CAN frame from a log file
///
/// This represents a single log row as read from the file, before any
/// field extraction or physical-unit conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Timestamp in milliseconds
    pub timestamp: Timestamp,
    /// Arbitration ID token as it appears in the log (e.g. "0x0A5")
    pub id: String,
    /// Payload as hex digits, two per byte
    pub payload: String,
    /// Data length in bytes
    pub length: usize,
    /// True if the logger flagged this as an extended (29-bit) ID
    pub extended: bool,
}

impl RawFrame {
    /// Create a frame; the length is derived from the payload
    pub fn new(timestamp: Timestamp, id: impl Into<String>, payload: impl Into<String>) -> Self {
        let payload = payload.into();
        let length = payload.len() / 2;
        Self {
            timestamp,
            id: id.into(),
            payload,
            length,
            extended: false,
        }
    }

    /// Builder method: mark the frame as extended
    pub fn with_extended(mut self, extended: bool) -> Self {
        self.extended = extended;
        self
    }
}

impl fmt::Display for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{}] {}", self.timestamp, self.id, self.length, self.payload)
    }
}

/// Errors raised while extracting a field from a hex payload
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Field bytes {offset}..{end} out of range for {available}-byte payload")]
    OutOfRange {
        offset: usize,
        end: usize,
        available: usize,
    },

    #[error("Invalid hex digits {0:?}")]
    InvalidHex(String),

    #[error("Unsupported field width: {0} bytes")]
    UnsupportedWidth(usize),
}

/// Errors that can occur during decoding
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Malformed frame at line {line}: {reason}")]
    MalformedFrame { line: usize, reason: String },

    #[error("Field decode failed: {0}")]
    Codec(#[from] CodecError),

    #[error("Invalid decoder configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DecoderError {
    /// True for errors that only affect a single frame
    ///
    /// Everything else aborts the decode pass.
    pub fn is_frame_local(&self) -> bool {
        matches!(self, DecoderError::MalformedFrame { .. } | DecoderError::Codec(_))
    }
}
