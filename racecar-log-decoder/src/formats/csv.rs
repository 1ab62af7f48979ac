//! CSV log parser
//!
//! Parses the comma-separated export of the car's data logger. Each record has
//! five ordered fields:
//!
//! ```text
//! Timestamp,ID,Extended,Length,Data
//! 1200,0x0A7,False,8,E803F40100000000
//! ```
//!
//! The timestamp is in milliseconds, the ID is kept as the literal token, and
//! the payload is a hex string with two digits per byte. The first non-blank
//! record is a header and is skipped.

use crate::types::{DecoderError, RawFrame, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Fields every record must carry
const FIELD_COUNT: usize = 5;

/// CSV log parser
pub struct CsvParser;

impl CsvParser {
    /// Open a CSV log and return an iterator over its frames
    ///
    /// The caller is responsible for deciding what a missing file means; this
    /// only fails if the file cannot be opened.
    pub fn parse(path: &Path, skip_header: bool) -> Result<CsvFrameIterator<BufReader<File>>> {
        log::info!("Parsing CSV log: {:?}", path);

        let file = File::open(path)?;
        Ok(CsvFrameIterator::new(BufReader::new(file), skip_header))
    }
}

/// Iterator over frames from any buffered CSV source
///
/// Yields `Err(DecoderError::MalformedFrame)` for records that cannot be
/// parsed (the pass may continue) and `Err(DecoderError::IoError)` when
/// reading fails (the pass should stop).
pub struct CsvFrameIterator<R> {
    reader: R,
    buffer: Vec<u8>,
    line: usize,
    header_pending: bool,
    finished: bool,
}

impl<R: BufRead> CsvFrameIterator<R> {
    pub fn new(reader: R, skip_header: bool) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            line: 0,
            header_pending: skip_header,
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for CsvFrameIterator<R> {
    type Item = Result<RawFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            self.buffer.clear();
            match self.reader.read_until(b'\n', &mut self.buffer) {
                Ok(0) => {
                    self.finished = true;
                    return None;
                }
                Ok(_) => self.line += 1,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(DecoderError::IoError(e)));
                }
            }

            if self.buffer.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            if self.header_pending {
                self.header_pending = false;
                log::trace!("Skipping header record");
                continue;
            }

            let text = match std::str::from_utf8(&self.buffer) {
                Ok(text) => text.trim_end_matches(['\r', '\n']),
                Err(_) => {
                    return Some(Err(DecoderError::MalformedFrame {
                        line: self.line,
                        reason: "record is not valid UTF-8".to_string(),
                    }))
                }
            };

            return Some(parse_record(text, self.line));
        }
    }
}

/// Parse one CSV record into a frame
pub fn parse_record(text: &str, line: usize) -> Result<RawFrame> {
    let malformed = |reason: String| DecoderError::MalformedFrame { line, reason };

    let fields: Vec<&str> = text.split(',').map(clean_field).collect();
    if fields.len() < FIELD_COUNT {
        return Err(malformed(format!(
            "expected {} fields, found {}",
            FIELD_COUNT,
            fields.len()
        )));
    }

    let timestamp = fields[0]
        .parse::<i64>()
        .map_err(|e| malformed(format!("invalid timestamp {:?}: {}", fields[0], e)))?;

    let id = fields[1];
    if id.is_empty() {
        return Err(malformed("empty arbitration ID".to_string()));
    }

    let payload = fields[4];
    let length = fields[3].parse::<usize>().unwrap_or(payload.len() / 2);

    Ok(RawFrame {
        timestamp,
        id: id.to_string(),
        payload: payload.to_string(),
        length,
        extended: parse_flag(fields[2]),
    })
}

fn clean_field(field: &str) -> &str {
    field.trim().trim_matches('"').trim()
}

fn parse_flag(field: &str) -> bool {
    matches!(field.to_ascii_lowercase().as_str(), "1" | "true" | "x")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn frames(text: &str) -> Vec<Result<RawFrame>> {
        CsvFrameIterator::new(Cursor::new(text.as_bytes().to_vec()), true).collect()
    }

    #[test]
    fn test_csv_file_not_found() {
        let result = CsvParser::parse(Path::new("nonexistent.csv"), true);
        assert!(matches!(result, Err(DecoderError::IoError(_))));
    }

    #[test]
    fn test_header_only() {
        assert!(frames("Timestamp,ID,Extended,Length,Data\n").is_empty());
        assert!(frames("").is_empty());
    }

    #[test]
    fn test_parse_rows() {
        let log = "Timestamp,ID,Extended,Length,Data\r\n\
                   0,0x0A7,False,8,E803F40100000000\r\n\
                   \r\n\
                   15,0x12905301,True,8,0000A00FA10FA20F";
        let parsed: Vec<RawFrame> = frames(log).into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(parsed.len(), 2);

        assert_eq!(parsed[0].timestamp, 0);
        assert_eq!(parsed[0].id, "0x0A7");
        assert_eq!(parsed[0].length, 8);
        assert!(!parsed[0].extended);
        assert_eq!(parsed[0].payload, "E803F40100000000");

        assert_eq!(parsed[1].timestamp, 15);
        assert!(parsed[1].extended);
    }

    #[test]
    fn test_malformed_rows_are_reported_and_iteration_continues() {
        let log = "header\n\
                   abc,0x0A7,0,8,E803F40100000000\n\
                   5,0x0A7\n\
                   6,,0,8,00\n\
                   7,0x0A1,0,2,6400\n";
        let results = frames(log);
        assert_eq!(results.len(), 4);
        assert!(matches!(results[0], Err(DecoderError::MalformedFrame { line: 2, .. })));
        assert!(matches!(results[1], Err(DecoderError::MalformedFrame { line: 3, .. })));
        assert!(matches!(results[2], Err(DecoderError::MalformedFrame { line: 4, .. })));
        assert_eq!(results[3].as_ref().unwrap().id, "0x0A1");
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let mut bytes = b"header\n".to_vec();
        bytes.extend_from_slice(&[0xFF, 0xFE, b'\n']);
        bytes.extend_from_slice(b"1,0x0A1,0,2,6400\n");
        let results: Vec<_> = CsvFrameIterator::new(Cursor::new(bytes), true).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert!(results[1].is_ok());
    }

    #[test]
    fn test_leading_blank_lines_before_header() {
        let log = "\n\r\nTimestamp,ID,Extended,Length,Data\n\n7,0x0A1,0,2,6400\n";
        let results = frames(log);
        assert_eq!(results.len(), 1);
        let frame = results[0].as_ref().unwrap();
        assert_eq!(frame.timestamp, 7);
        assert_eq!(frame.id, "0x0A1");
    }

    #[test]
    fn test_lenient_fields() {
        let frame = parse_record(" 42 , \"0x0A1\" ,X,,6400", 1).unwrap();
        assert_eq!(frame.timestamp, 42);
        assert_eq!(frame.id, "0x0A1");
        assert!(frame.extended);
        // Length falls back to the payload size
        assert_eq!(frame.length, 2);
    }

    #[test]
    fn test_no_header_skip() {
        let results: Vec<_> =
            CsvFrameIterator::new(Cursor::new(b"1,0x0A1,0,2,6400\n".to_vec()), false).collect();
        assert_eq!(results.len(), 1);
    }
}
