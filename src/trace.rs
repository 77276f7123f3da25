//! Memory trace reader
//!
//! One record per line: `<kind> <hex-address>`, where kind is
//! 0 (data read), 1 (data write) or 2 (instruction fetch).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{SimulatorError, SimulatorResult, TraceError};
use crate::memory::AccessClass;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceRecord {
    pub class: AccessClass,
    pub address: u64,
}

/// Parse one non-empty trace line. `line` is 1-based and only used
/// for error reporting.
pub fn parse_record(text: &str, line: usize) -> Result<TraceRecord, TraceError> {
    let malformed = |reason: String| TraceError::MalformedRecord { line, reason };

    let parts: Vec<&str> = text.split_whitespace().collect();
    if parts.len() != 2 {
        return Err(malformed(format!(
            "expected '<kind> <hex-address>', got {} fields",
            parts.len()
        )));
    }

    let kind: u8 = parts[0]
        .parse()
        .map_err(|_| malformed(format!("invalid access kind '{}'", parts[0])))?;
    let class = AccessClass::try_from(kind)
        .map_err(|kind| TraceError::UnknownKind { line, kind })?;

    let digits = parts[1]
        .strip_prefix("0x")
        .or_else(|| parts[1].strip_prefix("0X"))
        .unwrap_or(parts[1]);
    let address = u64::from_str_radix(digits, 16)
        .map_err(|_| malformed(format!("invalid hexadecimal address '{}'", parts[1])))?;

    Ok(TraceRecord { class, address })
}

/// Lazily yields the records of a trace, one line at a time.
/// Blank lines are skipped.
pub struct TraceReader<R> {
    lines: std::io::Lines<R>,
    line: usize,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl TraceReader<BufReader<File>> {
    /// Open a trace file for reading
    pub fn open(path: impl AsRef<Path>) -> SimulatorResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| SimulatorError::TraceOpenError(path.to_path_buf(), e))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<TraceRecord, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line += 1;
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(source) => {
                    return Some(Err(TraceError::Read {
                        line: self.line,
                        source,
                    }))
                }
            };
            if text.trim().is_empty() {
                continue;
            }
            return Some(parse_record(&text, self.line));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_parse_kinds() {
        assert_eq!(
            parse_record("0 7fffed80", 1).unwrap(),
            TraceRecord { class: AccessClass::DataRead, address: 0x7fffed80 }
        );
        assert_eq!(
            parse_record("1 10010000", 1).unwrap(),
            TraceRecord { class: AccessClass::DataWrite, address: 0x10010000 }
        );
        assert_eq!(
            parse_record("2 0x400100", 1).unwrap(),
            TraceRecord { class: AccessClass::InstructionFetch, address: 0x400100 }
        );
        assert_eq!(parse_record("  2\tABCDEF  ", 1).unwrap().address, 0xabcdef);
    }

    #[test]
    fn test_unknown_kind() {
        assert!(matches!(
            parse_record("3 1000", 7),
            Err(TraceError::UnknownKind { line: 7, kind: 3 })
        ));
    }

    #[test]
    fn test_malformed_records() {
        for text in ["2", "2 100 extra", "x 100", "-1 100", "0 0xzz", "0 0x"] {
            assert!(
                matches!(
                    parse_record(text, 4),
                    Err(TraceError::MalformedRecord { line: 4, .. })
                ),
                "accepted '{}'",
                text
            );
        }
    }

    #[test]
    fn test_reader_skips_blank_lines_and_counts_lines() {
        let input = "2 0\n\n0 20\n   \n5 40\n";
        let records: Vec<_> = TraceReader::new(Cursor::new(input)).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[1].as_ref().unwrap(),
            &TraceRecord { class: AccessClass::DataRead, address: 0x20 }
        );
        assert!(matches!(
            records[2],
            Err(TraceError::UnknownKind { line: 5, kind: 5 })
        ));
    }

    #[test]
    fn test_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "2 400").unwrap();
        writeln!(file, "1 7ffc").unwrap();
        let records: Vec<TraceRecord> = TraceReader::open(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].class, AccessClass::DataWrite);
    }

    #[test]
    fn test_open_missing_file() {
        assert!(matches!(
            TraceReader::open("/nonexistent/trace.din"),
            Err(SimulatorError::TraceOpenError(..))
        ));
    }
}
