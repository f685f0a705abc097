//! Zero-allocation BEDPE parsing utilities.
//!
//! These functions parse paired-interval records from raw bytes without
//! heap allocation, for the memory-mapped dispatch path.

use crate::bedpe::PairRecord;
use memchr::memchr;

/// Fast u64 parsing - no allocation, no error formatting.
///
/// Returns None if the input is empty or contains non-digit characters.
#[inline(always)]
pub fn parse_u64_fast(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    let mut n: u64 = 0;
    for &b in bytes {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return None;
        }
        n = n.wrapping_mul(10).wrapping_add(d as u64);
    }
    Some(n)
}

/// A borrowed view of one parsed BEDPE line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedPair<'a> {
    pub chrom1: &'a [u8],
    pub start1: u64,
    pub end1: u64,
    pub chrom2: &'a [u8],
    pub start2: u64,
    pub end2: u64,
    /// Trailing fields after the sixth column, still tab-joined. Empty
    /// when the record has exactly six fields.
    pub rest: &'a [u8],
}

impl ParsedPair<'_> {
    /// Materialize an owned record; fails on non-UTF-8 chromosome names.
    pub fn to_record(&self) -> Option<PairRecord> {
        let chrom1 = std::str::from_utf8(self.chrom1).ok()?;
        let chrom2 = std::str::from_utf8(self.chrom2).ok()?;
        let extra = if self.rest.is_empty() {
            Vec::new()
        } else {
            let rest = std::str::from_utf8(self.rest).ok()?;
            rest.split('\t').map(|s| s.to_string()).collect()
        };
        Some(PairRecord {
            chrom1: chrom1.to_string(),
            start1: self.start1,
            end1: self.end1,
            chrom2: chrom2.to_string(),
            start2: self.start2,
            end2: self.end2,
            extra,
        })
    }
}

/// Parse the six required BEDPE fields using memchr - zero allocation.
///
/// The caller must strip the trailing newline. Returns None when fewer
/// than six fields are present or a coordinate is not an integer.
#[inline(always)]
pub fn parse_bedpe_bytes(line: &[u8]) -> Option<ParsedPair<'_>> {
    let tab = memchr(b'\t', line)?;
    let chrom1 = &line[..tab];
    let rest = &line[tab + 1..];

    let tab = memchr(b'\t', rest)?;
    let start1 = parse_u64_fast(&rest[..tab])?;
    let rest = &rest[tab + 1..];

    let tab = memchr(b'\t', rest)?;
    let end1 = parse_u64_fast(&rest[..tab])?;
    let rest = &rest[tab + 1..];

    let tab = memchr(b'\t', rest)?;
    let chrom2 = &rest[..tab];
    let rest = &rest[tab + 1..];

    let tab = memchr(b'\t', rest)?;
    let start2 = parse_u64_fast(&rest[..tab])?;
    let rest = &rest[tab + 1..];

    let end_len = memchr(b'\t', rest).unwrap_or(rest.len());
    let end2 = parse_u64_fast(&rest[..end_len])?;
    let rest = if end_len < rest.len() {
        &rest[end_len + 1..]
    } else {
        &rest[rest.len()..]
    };

    Some(ParsedPair {
        chrom1,
        start1,
        end1,
        chrom2,
        start2,
        end2,
        rest,
    })
}

/// Check if a line should be skipped (empty or comment).
#[inline(always)]
pub fn should_skip_line(line: &[u8]) -> bool {
    line.is_empty() || line[0] == b'#'
}
