//! Buffered output writer for classified pair records.
//!
//! Uses itoa for integer formatting to avoid allocation in the hot path.

use crate::bedpe::{BedpeError, PairRecord, Result};
use crate::sites::FragmentRef;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Buffer size for PairWriter (256KB).
const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

/// Writes pair records with optional appended fragment columns.
pub struct PairWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
}

impl PairWriter<File> {
    /// Create (truncate) an output file.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write> PairWriter<W> {
    /// Create a new writer with the default buffer size.
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, output)
    }

    /// Create a new writer with a specified buffer size.
    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            itoa_buf: itoa::Buffer::new(),
        }
    }

    /// Write one record: the original fields tab-joined, plus
    /// `"{index}-{side}\t{index}-{side}"` when fragments were computed.
    pub fn write_record(
        &mut self,
        record: &PairRecord,
        frag1: Option<&FragmentRef>,
        frag2: Option<&FragmentRef>,
    ) -> Result<()> {
        self.write_str(&record.chrom1)?;
        self.write_tab()?;
        self.write_int(record.start1)?;
        self.write_tab()?;
        self.write_int(record.end1)?;
        self.write_tab()?;
        self.write_str(&record.chrom2)?;
        self.write_tab()?;
        self.write_int(record.start2)?;
        self.write_tab()?;
        self.write_int(record.end2)?;

        for field in &record.extra {
            self.write_tab()?;
            self.write_str(field)?;
        }

        if let (Some(frag1), Some(frag2)) = (frag1, frag2) {
            self.write_tab()?;
            self.write_fragment(frag1)?;
            self.write_tab()?;
            self.write_fragment(frag2)?;
        }

        self.writer.write_all(b"\n").map_err(BedpeError::Io)
    }

    #[inline]
    fn write_fragment(&mut self, frag: &FragmentRef) -> Result<()> {
        self.write_int(frag.index)?;
        self.writer.write_all(b"-").map_err(BedpeError::Io)?;
        self.write_str(frag.side.as_str())
    }

    #[inline]
    fn write_str(&mut self, s: &str) -> Result<()> {
        self.writer.write_all(s.as_bytes()).map_err(BedpeError::Io)
    }

    #[inline]
    fn write_tab(&mut self) -> Result<()> {
        self.writer.write_all(b"\t").map_err(BedpeError::Io)
    }

    #[inline]
    fn write_int<I: itoa::Integer>(&mut self, n: I) -> Result<()> {
        self.writer
            .write_all(self.itoa_buf.format(n).as_bytes())
            .map_err(BedpeError::Io)
    }

    /// Flush the output buffer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(BedpeError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sites::{FragmentRef, Side};

    #[test]
    fn test_write_record_without_fragments() {
        let mut output = Vec::new();
        {
            let mut writer = PairWriter::new(&mut output);
            let rec = PairRecord::new("chr1", 100, 200, "chr2", 300, 400);
            writer.write_record(&rec, None, None).unwrap();
            writer.flush().unwrap();
        }
        assert_eq!(output, b"chr1\t100\t200\tchr2\t300\t400\n");
    }

    #[test]
    fn test_write_record_with_fragments_and_extra() {
        let mut output = Vec::new();
        {
            let mut writer = PairWriter::new(&mut output);
            let mut rec = PairRecord::new("chr1", 90, 95, "chr1", 190, 195);
            rec.extra = vec!["read1".to_string(), "+".to_string()];
            let f1 = FragmentRef { index: 0, side: Side::End };
            let f2 = FragmentRef { index: 1, side: Side::Start };
            writer.write_record(&rec, Some(&f1), Some(&f2)).unwrap();
            writer.flush().unwrap();
        }
        assert_eq!(
            output,
            b"chr1\t90\t95\tchr1\t190\t195\tread1\t+\t0-e\t1-s\n"
        );
    }
}
