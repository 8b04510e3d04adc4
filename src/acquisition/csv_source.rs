//! Delimited-text telemetry reader
//!
//! Flight computers dump altitude logs in whatever dialect their firmware
//! prefers: comma or semicolon separated, tab separated, pipe separated or
//! aligned columns. The reader sniffs the delimiter from the first non-blank
//! line, skips a header row if there is one, and reads the first two columns
//! of every row as `(time, altitude)`. Further columns are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use tracing::{debug, info};

use super::source::{SourceError, TelemetrySource};
use crate::types::RawSample;

/// Delimiters tried in order; ties go to the earlier one.
const CANDIDATES: [char; 4] = [',', ';', '\t', '|'];

// ============================================================================
// Delimiter Sniffing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Char(char),
    /// Runs of spaces or tabs
    Whitespace,
}

impl Delimiter {
    /// Pick the candidate that occurs most often outside quotes. Falls back
    /// to whitespace when that still yields two columns.
    pub fn sniff(line: &str) -> Option<Self> {
        let mut best: Option<(usize, char)> = None;
        for c in CANDIDATES {
            let count = count_unquoted(line, c);
            if count > 0 && best.map_or(true, |(n, _)| count > n) {
                best = Some((count, c));
            }
        }

        match best {
            Some((_, c)) => Some(Delimiter::Char(c)),
            None if line.split_whitespace().count() >= 2 => Some(Delimiter::Whitespace),
            None => None,
        }
    }

    /// Split one line into unquoted fields.
    pub fn split(self, line: &str) -> Vec<String> {
        match self {
            Delimiter::Char(c) => split_quoted(line, c),
            Delimiter::Whitespace => line
                .split_whitespace()
                .map(|f| f.trim_matches('"').to_string())
                .collect(),
        }
    }
}

impl std::fmt::Display for Delimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Delimiter::Char('\t') => write!(f, "tab"),
            Delimiter::Char(c) => write!(f, "'{c}'"),
            Delimiter::Whitespace => write!(f, "whitespace"),
        }
    }
}

fn count_unquoted(line: &str, delimiter: char) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for ch in line.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if ch == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Split a line respecting quoted fields (delimiters inside quotes, `""`
/// escapes).
fn split_quoted(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

// ============================================================================
// CSV Source
// ============================================================================

/// Streams `(time, altitude)` rows from delimited text.
pub struct CsvSource<R> {
    lines: Lines<R>,
    name: String,
    delimiter: Delimiter,
    line_no: usize,
    /// First data row, read while sniffing
    pending: Option<RawSample>,
}

impl CsvSource<BufReader<File>> {
    /// Open a telemetry file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), path.display().to_string())
    }
}

impl<R: BufRead> CsvSource<R> {
    /// Wrap any buffered reader. Reads up to the first data row.
    pub fn from_reader(reader: R, name: impl Into<String>) -> Result<Self, SourceError> {
        let mut source = Self {
            lines: reader.lines(),
            name: name.into(),
            delimiter: Delimiter::Char(','),
            line_no: 0,
            pending: None,
        };

        let Some(first) = source.read_line()? else {
            info!(source = %source.name, "Telemetry source is empty");
            return Ok(source);
        };
        let first = first.trim_start_matches('\u{feff}');

        source.delimiter = Delimiter::sniff(first).ok_or_else(|| SourceError::Format {
            line: source.line_no,
            message: "cannot detect a delimiter; expected at least two columns".to_string(),
        })?;

        match source.parse_row(first) {
            Ok(sample) => source.pending = Some(sample),
            Err(_) if is_header(&source.delimiter.split(first)) => {
                debug!(line = source.line_no, header = first, "Skipping header row");
            }
            Err(e) => return Err(e),
        }

        info!(
            source = %source.name,
            delimiter = %source.delimiter,
            "Telemetry source opened"
        );
        Ok(source)
    }

    pub fn delimiter(&self) -> Delimiter {
        self.delimiter
    }

    /// Number of the last line read (1-based, blank lines counted).
    pub fn line_number(&self) -> usize {
        self.line_no
    }

    /// Next non-blank line.
    fn read_line(&mut self) -> Result<Option<String>, SourceError> {
        loop {
            match self.lines.next() {
                None => return Ok(None),
                Some(Err(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
                    self.line_no += 1;
                    return Err(SourceError::Format {
                        line: self.line_no,
                        message: "not valid UTF-8 text".to_string(),
                    });
                }
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(line)) => {
                    self.line_no += 1;
                    if !line.trim().is_empty() {
                        return Ok(Some(line));
                    }
                }
            }
        }
    }

    fn parse_row(&self, line: &str) -> Result<RawSample, SourceError> {
        let fields = self.delimiter.split(line);
        if fields.len() < 2 {
            return Err(SourceError::Format {
                line: self.line_no,
                message: format!("expected at least two columns, found {}", fields.len()),
            });
        }
        let time = self.parse_field(&fields[0], "time")?;
        let altitude = self.parse_field(&fields[1], "altitude")?;
        Ok(RawSample::new(time, altitude))
    }

    fn parse_field(&self, field: &str, what: &str) -> Result<f64, SourceError> {
        let trimmed = field.trim();
        let value = trimmed.parse::<f64>().map_err(|e| SourceError::Format {
            line: self.line_no,
            message: format!("invalid {what} '{trimmed}': {e}"),
        })?;
        // `parse` accepts nan/inf spellings; they are not measurements
        if !value.is_finite() {
            return Err(SourceError::Format {
                line: self.line_no,
                message: format!("non-finite {what} '{trimmed}'"),
            });
        }
        Ok(value)
    }
}

/// A header names its columns: neither of the first two parses as a number.
fn is_header(fields: &[String]) -> bool {
    fields
        .iter()
        .take(2)
        .all(|f| f.trim().parse::<f64>().is_err())
}

impl<R: BufRead> TelemetrySource for CsvSource<R> {
    fn next_sample(&mut self) -> Result<Option<RawSample>, SourceError> {
        if let Some(sample) = self.pending.take() {
            return Ok(Some(sample));
        }
        match self.read_line()? {
            Some(line) => self.parse_row(&line).map(Some),
            None => Ok(None),
        }
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn source(text: &str) -> CsvSource<Cursor<Vec<u8>>> {
        CsvSource::from_reader(Cursor::new(text.as_bytes().to_vec()), "test").unwrap()
    }

    fn drain<R: BufRead>(src: &mut CsvSource<R>) -> Vec<(f64, f64)> {
        let mut out = Vec::new();
        while let Some(s) = src.next_sample().unwrap() {
            out.push((s.time, s.altitude));
        }
        out
    }

    #[test]
    fn test_sniff_candidates() {
        assert_eq!(Delimiter::sniff("1,2"), Some(Delimiter::Char(',')));
        assert_eq!(Delimiter::sniff("1;2;3"), Some(Delimiter::Char(';')));
        assert_eq!(Delimiter::sniff("1\t2"), Some(Delimiter::Char('\t')));
        assert_eq!(Delimiter::sniff("1|2"), Some(Delimiter::Char('|')));
        assert_eq!(Delimiter::sniff("  1   2  "), Some(Delimiter::Whitespace));
        assert_eq!(Delimiter::sniff("12"), None);
    }

    #[test]
    fn test_sniff_prefers_most_frequent_unquoted() {
        // Decimal commas inside quotes must not win over the semicolons
        assert_eq!(
            Delimiter::sniff("\"1,5\";\"2,5\";\"x\""),
            Some(Delimiter::Char(';'))
        );
    }

    #[test]
    fn test_split_quoted_fields() {
        let fields = Delimiter::Char(',').split("\"a,b\",\"say \"\"hi\"\"\",3");
        assert_eq!(fields, vec!["a,b", "say \"hi\"", "3"]);
    }

    #[test]
    fn test_header_is_skipped() {
        let mut src = source("time,altitude\n0,0\n1,10\n");
        assert_eq!(drain(&mut src), vec![(0.0, 0.0), (1.0, 10.0)]);
    }

    #[test]
    fn test_headerless_semicolon_with_extra_columns() {
        let mut src = source("0;0;x\n0.5;12.5;y\n");
        assert_eq!(src.delimiter(), Delimiter::Char(';'));
        assert_eq!(drain(&mut src), vec![(0.0, 0.0), (0.5, 12.5)]);
    }

    #[test]
    fn test_whitespace_columns_and_blank_lines() {
        let mut src = source("\n  0   1.5\n\n  1   3.0\n");
        assert_eq!(src.delimiter(), Delimiter::Whitespace);
        assert_eq!(drain(&mut src), vec![(0.0, 1.5), (1.0, 3.0)]);
    }

    #[test]
    fn test_crlf_and_bom() {
        let mut src = source("\u{feff}t,alt\r\n0,1\r\n2,3\r\n");
        assert_eq!(drain(&mut src), vec![(0.0, 1.0), (2.0, 3.0)]);
    }

    #[test]
    fn test_malformed_row_reports_line_number() {
        let mut src = source("t,alt\n0,0\n\n1,abc\n");
        assert!(src.next_sample().unwrap().is_some());
        match src.next_sample() {
            Err(SourceError::Format { line, message }) => {
                assert_eq!(line, 4);
                assert!(message.contains("altitude"), "{message}");
            }
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_finite_fields_are_format_errors() {
        let mut src = source("0,0\n1,10\n2,nan\n3,inf\n-infinity,4\n");
        assert!(src.next_sample().unwrap().is_some());
        assert!(src.next_sample().unwrap().is_some());
        match src.next_sample() {
            Err(SourceError::Format { line, message }) => {
                assert_eq!(line, 3);
                assert!(message.contains("altitude"), "{message}");
            }
            other => panic!("expected format error, got {other:?}"),
        }
        assert!(matches!(
            src.next_sample(),
            Err(SourceError::Format { line: 4, .. })
        ));
        match src.next_sample() {
            Err(SourceError::Format { line, message }) => {
                assert_eq!(line, 5);
                assert!(message.contains("time"), "{message}");
            }
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn test_short_row_is_error() {
        let mut src = source("0,0\n1\n");
        assert!(src.next_sample().unwrap().is_some());
        assert!(matches!(
            src.next_sample(),
            Err(SourceError::Format { line: 2, .. })
        ));
    }

    #[test]
    fn test_single_column_first_line_is_error() {
        let result = CsvSource::from_reader(Cursor::new(b"12\n13\n".to_vec()), "test");
        assert!(matches!(result, Err(SourceError::Format { line: 1, .. })));
    }

    #[test]
    fn test_half_numeric_first_line_is_error_not_header() {
        let result = CsvSource::from_reader(Cursor::new(b"1.0,abc\n".to_vec()), "test");
        assert!(matches!(result, Err(SourceError::Format { line: 1, .. })));
    }

    #[test]
    fn test_non_utf8_is_format_error() {
        let bytes = vec![0xff, 0xfe, b',', b'1', b'\n'];
        let result = CsvSource::from_reader(Cursor::new(bytes), "binary");
        assert!(matches!(result, Err(SourceError::Format { line: 1, .. })));
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let mut src = source("\n\n");
        assert!(src.next_sample().unwrap().is_none());
    }

    #[test]
    fn test_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flight.csv");
        std::fs::write(&path, "time|altitude\n0|0\n1|5\n").unwrap();

        let mut src = CsvSource::open(&path).unwrap();
        assert_eq!(src.source_name(), path.display().to_string());
        assert_eq!(drain(&mut src), vec![(0.0, 0.0), (1.0, 5.0)]);
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = CsvSource::open(dir.path().join("missing.csv"));
        assert!(matches!(result, Err(SourceError::Io(_))));
    }
}
