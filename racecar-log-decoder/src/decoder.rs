//! Main decoder API
//!
//! This module provides the primary interface for the decoder library.
//! A [`Decoder`] turns a log into a [`Dataset`] in one synchronous pass.
//! Every call builds an independent dataset; nothing is shared between passes.

use crate::config::DecoderConfig;
use crate::dataset::Dataset;
use crate::formats::{CsvParser, LogFileParser};
use crate::messages::{MessageKind, Outcome, Prior};
use crate::state::CarryState;
use crate::types::{DecoderError, RawFrame, Result};
use serde::Serialize;
use std::io::BufRead;
use std::path::Path;

/// The main decoder struct - entry point for all decoding operations
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

/// Counters collected during a decode pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecodeStats {
    /// Data records read (header excluded)
    pub records: usize,
    /// Frames whose rule produced an update
    pub decoded: usize,
    /// Frames with an ID the decoder does not know
    pub unknown: usize,
    /// Frames excluded by the message filter
    pub filtered: usize,
    /// Records or payloads that could not be parsed
    pub malformed: usize,
    /// Frames dropped by a rate limiter
    pub debounced: usize,
    /// Timestamp of the first and last decoded record
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
}

impl DecodeStats {
    /// Time covered by the log in milliseconds
    pub fn span_ms(&self) -> Option<i64> {
        Some(self.last_timestamp?.saturating_sub(self.first_timestamp?))
    }
}

/// Output of a decode pass
#[derive(Debug, Clone)]
pub struct DecodedLog {
    pub dataset: Dataset,
    pub stats: DecodeStats,
}

impl Decoder {
    /// Create a new decoder instance with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with a custom configuration
    pub fn with_config(config: DecoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode a CSV log file
    ///
    /// A missing path yields an empty, fully shaped dataset. A file that exists
    /// but cannot be opened or read is an error.
    ///
    /// # Example
    /// ```no_run
    /// use racecar_log_decoder::{ChannelId, Decoder};
    /// use std::path::Path;
    ///
    /// let decoded = Decoder::new().decode_file(Path::new("endurance.csv")).unwrap();
    /// let speed = decoded.dataset.channel(ChannelId::Speed);
    /// println!("{} speed samples", speed.len());
    /// ```
    pub fn decode_file(&self, path: &Path) -> Result<DecodedLog> {
        self.decode_with::<CsvParser>(path)
    }

    /// Decode a log file with a specific parser
    pub fn decode_with<P: LogFileParser>(&self, path: &Path) -> Result<DecodedLog> {
        if !path.is_file() {
            log::warn!("Log not found, returning empty dataset: {:?}", path);
            return Ok(DecodedLog {
                dataset: Dataset::new(),
                stats: DecodeStats::default(),
            });
        }

        log::info!("Decoding log file: {:?}", path);
        let frames = P::open(path, self.config.skip_header)?;
        self.decode_frames(frames)
    }

    /// Decode CSV records from any buffered reader
    pub fn decode_reader<R: BufRead>(&self, reader: R) -> Result<DecodedLog> {
        self.decode_frames(crate::formats::CsvFrameIterator::new(reader, self.config.skip_header))
    }

    /// Decode a sequence of frames
    ///
    /// Frame-local errors are counted and skipped; any other error aborts the
    /// pass and is returned.
    pub fn decode_frames<I>(&self, frames: I) -> Result<DecodedLog>
    where
        I: IntoIterator<Item = Result<RawFrame>>,
    {
        let mut pass = DecodePass::new(&self.config);

        for item in frames {
            if self.config.max_frames.is_some_and(|max| pass.stats.records >= max) {
                log::info!("Reached frame limit of {}", pass.stats.records);
                break;
            }

            match item {
                Ok(frame) => pass.process_frame(&frame),
                Err(e) if e.is_frame_local() => {
                    log::debug!("Skipping record: {}", e);
                    pass.stats.records += 1;
                    pass.stats.malformed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        let stats = pass.stats;
        log::info!(
            "Decoded {} of {} records ({} unknown, {} malformed, {} debounced)",
            stats.decoded,
            stats.records,
            stats.unknown,
            stats.malformed,
            stats.debounced
        );

        Ok(DecodedLog {
            dataset: pass.dataset,
            stats,
        })
    }
}

/// State of one decode pass
struct DecodePass<'a> {
    config: &'a DecoderConfig,
    dataset: Dataset,
    carry: CarryState,
    stats: DecodeStats,
}

impl<'a> DecodePass<'a> {
    fn new(config: &'a DecoderConfig) -> Self {
        Self {
            config,
            dataset: Dataset::new(),
            carry: CarryState::new(),
            stats: DecodeStats::default(),
        }
    }

    /// Process a single frame and apply its update
    fn process_frame(&mut self, frame: &RawFrame) {
        self.stats.records += 1;
        self.stats.first_timestamp.get_or_insert(frame.timestamp);
        self.stats.last_timestamp = Some(frame.timestamp);

        if !self.config.should_process_message(&frame.id) {
            self.stats.filtered += 1;
            return;
        }

        let Some(kind) = MessageKind::from_id(&frame.id) else {
            log::trace!("Unknown ID: {}", frame.id);
            self.stats.unknown += 1;
            return;
        };

        let prior = Prior {
            carry: &self.carry,
            dataset: &self.dataset,
            debounce_ms: self.config.debounce_ms,
        };

        match kind.decode(frame, &prior) {
            Ok(Outcome::Update(update)) => {
                for sample in update.samples {
                    self.dataset.append(frame.timestamp, sample);
                }
                self.carry = update.carry;
                self.stats.decoded += 1;
            }
            Ok(Outcome::Debounced) => {
                self.stats.debounced += 1;
            }
            Err(e) => {
                log::debug!("Skipping frame {}: {}", frame, DecoderError::from(e));
                self.stats.malformed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelId;

    #[test]
    fn test_decoder_creation() {
        let decoder = Decoder::new();
        assert_eq!(decoder.config().debounce_ms, 100);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DecoderConfig::new().with_max_frames(0);
        assert!(Decoder::with_config(config).is_err());
    }

    #[test]
    fn test_missing_file_yields_empty_dataset() {
        let decoded = Decoder::new()
            .decode_file(Path::new("definitely/not/here.csv"))
            .unwrap();
        assert!(decoded.dataset.is_empty());
        assert_eq!(decoded.stats, DecodeStats::default());
    }

    #[test]
    fn test_decode_frames_counts() {
        let frames = vec![
            Ok(RawFrame::new(0, "0x0A7", "E803F401")),
            Ok(RawFrame::new(5, "0x7FF", "00")),
            Ok(RawFrame::new(10, "0x0A7", "E8")),
            Err(DecoderError::MalformedFrame {
                line: 4,
                reason: "bad".to_string(),
            }),
            Ok(RawFrame::new(20, "0x4EC", "000000000000")),
            Ok(RawFrame::new(30, "0x4EC", "000000000000")),
        ];

        let decoded = Decoder::new().decode_frames(frames).unwrap();
        let stats = decoded.stats;
        assert_eq!(stats.records, 6);
        assert_eq!(stats.decoded, 2);
        assert_eq!(stats.unknown, 1);
        assert_eq!(stats.malformed, 2);
        assert_eq!(stats.debounced, 1);
        assert_eq!(stats.span_ms(), Some(30));
        assert_eq!(decoded.dataset.channel(ChannelId::DcVoltage).len(), 1);
    }

    #[test]
    fn test_extreme_timestamps_do_not_abort_the_pass() {
        let payload = "0000A8FD00000000";
        let frames = vec![
            Ok(RawFrame::new(i64::MIN + 1, "0x0A5", payload)),
            Ok(RawFrame::new(i64::MAX, "0x0A5", payload)),
            Ok(RawFrame::new(i64::MIN, "0x4EC", "000000000000")),
            Ok(RawFrame::new(0, "0x4EC", "000000000000")),
        ];

        let decoded = Decoder::new().decode_frames(frames).unwrap();
        assert_eq!(decoded.stats.decoded, 4);
        assert_eq!(decoded.stats.span_ms(), Some(i64::MAX));

        let distance = decoded.dataset.channel(ChannelId::Distance).values();
        assert_eq!(distance.len(), 2);
        assert!(distance[1].is_finite() && distance[1] > 0.0);
        assert_eq!(decoded.dataset.channel(ChannelId::GyroAngX).timestamps(), &[i64::MIN, 0]);

        let stats = DecodeStats {
            first_timestamp: Some(i64::MIN),
            last_timestamp: Some(i64::MAX),
            ..DecodeStats::default()
        };
        assert_eq!(stats.span_ms(), Some(i64::MAX));
    }

    #[test]
    fn test_malformed_gyro_frames_leave_limiter_alone() {
        let valid = "00640032FFCE";
        let frames = vec![
            Ok(RawFrame::new(0, "0x4EC", "0064")),
            Ok(RawFrame::new(50, "0x4EC", valid)),
            Ok(RawFrame::new(160, "0x4EC", "ZZ640032FFCE")),
            Ok(RawFrame::new(200, "0x4EC", valid)),
        ];

        let decoded = Decoder::new().decode_frames(frames).unwrap();
        assert_eq!(decoded.stats.malformed, 2);
        assert_eq!(decoded.stats.debounced, 0);
        assert_eq!(decoded.dataset.channel(ChannelId::GyroAngX).timestamps(), &[50, 200]);
    }

    #[test]
    fn test_io_error_aborts() {
        let frames = vec![
            Ok(RawFrame::new(0, "0x0A7", "E803F401")),
            Err(DecoderError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk gone",
            ))),
        ];
        assert!(Decoder::new().decode_frames(frames).is_err());
    }

    #[test]
    fn test_message_filter_and_limit() {
        let config = DecoderConfig::new()
            .with_message_filter(["0x0A1"])
            .with_max_frames(2);
        let decoder = Decoder::with_config(config).unwrap();
        let frames = vec![
            Ok(RawFrame::new(0, "0x0A1", "6400")),
            Ok(RawFrame::new(1, "0x0A7", "E803F401")),
            Ok(RawFrame::new(2, "0x0A1", "6400")),
        ];
        let decoded = decoder.decode_frames(frames).unwrap();
        assert_eq!(decoded.stats.records, 2);
        assert_eq!(decoded.stats.filtered, 1);
        assert_eq!(decoded.dataset.channel(ChannelId::ControlBoardTemperature).len(), 1);
    }
}
