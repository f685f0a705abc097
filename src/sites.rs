//! Restriction-site index and fragment lookup.
//!
//! Holds one sorted array of cut-site positions per chromosome and assigns
//! genomic intervals to restriction fragments by binary search on the
//! interval midpoint. The index is immutable after construction and is
//! shared read-only across worker threads.

use crate::bedpe::{BedpeError, Result};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Minimum total site count before sorting chromosomes in parallel.
const PARALLEL_THRESHOLD: usize = 10_000;

/// Which fragment boundary the interval midpoint sits closer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Start,
    End,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Start => "s",
            Side::End => "e",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to a restriction fragment.
///
/// `index` is the ordinal of the gap between consecutive sites: 0 means
/// "before the first site", `len(sites)` means "after the last site".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FragmentRef {
    pub index: usize,
    pub side: Side,
}

impl fmt::Display for FragmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.index, self.side)
    }
}

/// Assign an interval to a fragment given one chromosome's sorted sites.
///
/// The midpoint is searched with the rightmost insertion rule (count of
/// positions <= mid). Interior hits compare the spans to the flanking
/// sites; a strictly larger left span yields `Start`, ties go to `End`.
pub fn find_fragment(sites: &[u64], start: u64, end: u64) -> FragmentRef {
    let mid = (start + end) / 2;
    let index = sites.partition_point(|&p| p <= mid);

    let side = if index == 0 {
        Side::End
    } else if index == sites.len() {
        Side::Start
    } else {
        let left_span = mid - sites[index - 1];
        let right_span = sites[index] - mid;
        if left_span > right_span {
            Side::Start
        } else {
            Side::End
        }
    };

    FragmentRef { index, side }
}

/// Per-chromosome restriction-site positions.
#[derive(Debug, Clone, Default)]
pub struct SiteIndex {
    sites: FxHashMap<String, Vec<u64>>,
    site_len: Option<u64>,
}

impl SiteIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from `(chromosome, position)` pairs.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        let mut index = Self::new();
        for (chrom, pos) in pairs {
            index.sites.entry(chrom).or_default().push(pos);
        }
        index.finalize();
        index
    }

    /// Load an index from a BED site table.
    ///
    /// The site position is the start column. The feature length of the
    /// first record (end - start) is recorded as the uniform site length.
    pub fn from_bed_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut index = Self::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 3 {
                return Err(BedpeError::Parse {
                    line: line_num + 1,
                    message: format!(
                        "Site table requires at least 3 fields, got {}",
                        fields.len()
                    ),
                });
            }

            let start: u64 = fields[1].parse().map_err(|_| BedpeError::Parse {
                line: line_num + 1,
                message: format!("Invalid site start: '{}'", fields[1]),
            })?;
            let end: u64 = fields[2].parse().map_err(|_| BedpeError::Parse {
                line: line_num + 1,
                message: format!("Invalid site end: '{}'", fields[2]),
            })?;

            if index.site_len.is_none() {
                index.site_len = Some(end.saturating_sub(start));
            }
            index
                .sites
                .entry(fields[0].to_string())
                .or_default()
                .push(start);
        }

        index.finalize();
        Ok(index)
    }

    /// Sort and dedup each chromosome's positions.
    fn finalize(&mut self) {
        let total: usize = self.sites.values().map(Vec::len).sum();
        if total >= PARALLEL_THRESHOLD {
            let mut groups: Vec<&mut Vec<u64>> = self.sites.values_mut().collect();
            groups.par_iter_mut().for_each(|positions| {
                positions.sort_unstable();
                positions.dedup();
            });
        } else {
            for positions in self.sites.values_mut() {
                positions.sort_unstable();
                positions.dedup();
            }
        }
    }

    /// Locate the fragment enclosing an interval's midpoint.
    ///
    /// A chromosome absent from the index is an error; it must never be
    /// treated as "no sites".
    pub fn locate(&self, chrom: &str, start: u64, end: u64) -> Result<FragmentRef> {
        let sites = self
            .sites
            .get(chrom)
            .ok_or_else(|| BedpeError::UnknownChromosome(chrom.to_string()))?;
        Ok(find_fragment(sites, start, end))
    }

    /// Get one chromosome's sorted positions.
    #[inline]
    pub fn positions(&self, chrom: &str) -> Option<&[u64]> {
        self.sites.get(chrom).map(Vec::as_slice)
    }

    /// Check if a chromosome exists in the index.
    #[inline]
    pub fn has_chrom(&self, chrom: &str) -> bool {
        self.sites.contains_key(chrom)
    }

    /// Uniform site feature length from the source table, when known.
    #[inline]
    pub fn site_len(&self) -> Option<u64> {
        self.site_len
    }

    /// Number of indexed chromosomes.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Check if the index holds no chromosomes.
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Total number of sites across all chromosomes.
    pub fn total_sites(&self) -> usize {
        self.sites.values().map(Vec::len).sum()
    }
}
