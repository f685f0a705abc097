//! Streaming BEDPE file parser.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during parsing and classification.
#[derive(Error, Debug)]
pub enum BedpeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("chromosome '{0}' not present in restriction site index")]
    UnknownChromosome(String),

    #[error("missing partial output file: {0}")]
    MissingPartial(PathBuf),

    #[error("worker thread panicked")]
    WorkerPanic,

    #[error("run cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, BedpeError>;

/// A paired-interval BEDPE record.
///
/// Six required fields plus any trailing fields, which are preserved
/// verbatim and re-emitted on output. Coordinates are 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairRecord {
    pub chrom1: String,
    pub start1: u64,
    pub end1: u64,
    pub chrom2: String,
    pub start2: u64,
    pub end2: u64,
    /// Additional fields beyond the six required ones.
    pub extra: Vec<String>,
}

impl PairRecord {
    /// Create a minimal six-field record.
    pub fn new(
        chrom1: impl Into<String>,
        start1: u64,
        end1: u64,
        chrom2: impl Into<String>,
        start2: u64,
        end2: u64,
    ) -> Self {
        Self {
            chrom1: chrom1.into(),
            start1,
            end1,
            chrom2: chrom2.into(),
            start2,
            end2,
            extra: Vec::new(),
        }
    }

    /// True when the two ends map to different chromosomes.
    #[inline]
    pub fn is_trans(&self) -> bool {
        self.chrom1 != self.chrom2
    }

    /// Absolute distance between the two ends' start coordinates.
    #[inline]
    pub fn span(&self) -> u64 {
        self.start1.abs_diff(self.start2)
    }
}

impl fmt::Display for PairRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.chrom1, self.start1, self.end1, self.chrom2, self.start2, self.end2
        )?;
        for field in &self.extra {
            write!(f, "\t{}", field)?;
        }
        Ok(())
    }
}

/// A streaming BEDPE reader.
pub struct BedpeReader<R: Read> {
    reader: BufReader<R>,
    line_number: usize,
    buffer: String,
}

impl BedpeReader<File> {
    /// Open a BEDPE file from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file))
    }
}

impl<R: Read> BedpeReader<R> {
    /// Create a new BEDPE reader from any readable source.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_number: 0,
            buffer: String::with_capacity(1024),
        }
    }

    /// Create a BEDPE reader with custom buffer capacity.
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(capacity, reader),
            line_number: 0,
            buffer: String::with_capacity(1024),
        }
    }

    /// Read the next record, skipping blank lines and comments.
    pub fn read_record(&mut self) -> Result<Option<PairRecord>> {
        loop {
            self.buffer.clear();
            let bytes_read = self.reader.read_line(&mut self.buffer)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = self.buffer.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            return self.parse_line(line).map(Some);
        }
    }

    /// Parse a single BEDPE line.
    fn parse_line(&self, line: &str) -> Result<PairRecord> {
        let fields: Vec<&str> = line.split('\t').collect();

        if fields.len() < 6 {
            return Err(BedpeError::Parse {
                line: self.line_number,
                message: format!("Expected at least 6 fields, got {}", fields.len()),
            });
        }

        let record = PairRecord {
            chrom1: fields[0].to_string(),
            start1: self.parse_position(fields[1], "start1")?,
            end1: self.parse_position(fields[2], "end1")?,
            chrom2: fields[3].to_string(),
            start2: self.parse_position(fields[4], "start2")?,
            end2: self.parse_position(fields[5], "end2")?,
            extra: fields[6..].iter().map(|s| s.to_string()).collect(),
        };

        Ok(record)
    }

    fn parse_position(&self, s: &str, field_name: &str) -> Result<u64> {
        s.parse().map_err(|_| BedpeError::Parse {
            line: self.line_number,
            message: format!("Invalid {} position: '{}'", field_name, s),
        })
    }

    /// Get an iterator over all records.
    pub fn records(self) -> PairRecordIter<R> {
        PairRecordIter { reader: self }
    }
}

/// Iterator over BEDPE records.
pub struct PairRecordIter<R: Read> {
    reader: BedpeReader<R>,
}

impl<R: Read> Iterator for PairRecordIter<R> {
    type Item = Result<PairRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Read all records from a BEDPE file.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<PairRecord>> {
    let reader = BedpeReader::from_path(path)?;
    reader.records().collect()
}

/// Parse records from a string (useful for testing).
pub fn parse_records(content: &str) -> Result<Vec<PairRecord>> {
    let reader = BedpeReader::new(content.as_bytes());
    reader.records().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_six_fields() {
        let content = "chr1\t100\t200\tchr1\t300\t400\nchr2\t10\t20\tchr3\t30\t40\n";
        let records = parse_records(content).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].chrom1, "chr1");
        assert_eq!(records[0].start1, 100);
        assert_eq!(records[0].end2, 400);
        assert!(!records[0].is_trans());
        assert!(records[1].is_trans());
    }

    #[test]
    fn test_extra_fields_preserved() {
        let content = "chr1\t100\t200\tchr1\t300\t400\tread1\t60\t+\t-\n";
        let records = parse_records(content).unwrap();

        assert_eq!(records[0].extra, vec!["read1", "60", "+", "-"]);
        assert_eq!(
            records[0].to_string(),
            "chr1\t100\t200\tchr1\t300\t400\tread1\t60\t+\t-"
        );
    }

    #[test]
    fn test_skip_comments_and_blank_lines() {
        let content = "# header\n\nchr1\t100\t200\tchr1\t300\t400\n";
        let records = parse_records(content).unwrap();

        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_too_few_fields() {
        let content = "chr1\t100\t200\tchr1\t300\n";
        let result = parse_records(content);
        assert!(matches!(
            result,
            Err(BedpeError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_non_integer_coordinate() {
        let content = "chr1\t100\t200\tchr1\tx\t400\n";
        let err = parse_records(content).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("start2"), "unexpected message: {}", msg);
    }

    #[test]
    fn test_span() {
        let rec = PairRecord::new("chr1", 500, 600, "chr1", 100, 200);
        assert_eq!(rec.span(), 400);
    }
}
