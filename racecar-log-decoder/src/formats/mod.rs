//! Log file format parsers
//!
//! Each parser implements an iterator pattern over [`RawFrame`] objects.

use crate::types::{RawFrame, Result};
use std::path::Path;

pub mod csv;

// Re-export parser types
pub use self::csv::{CsvFrameIterator, CsvParser};

/// Common trait for all log file parsers
///
/// Parsers yield frames lazily, in file order.
pub trait LogFileParser {
    type Frames: Iterator<Item = Result<RawFrame>>;

    /// Open a log file and return an iterator over its frames
    fn open(path: &Path, skip_header: bool) -> Result<Self::Frames>;
}

impl LogFileParser for CsvParser {
    type Frames = CsvFrameIterator<std::io::BufReader<std::fs::File>>;

    fn open(path: &Path, skip_header: bool) -> Result<Self::Frames> {
        CsvParser::parse(path, skip_header)
    }
}
