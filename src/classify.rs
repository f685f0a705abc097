//! Pair classification policy.
//!
//! Decides whether a read pair is a real interaction or a ligation
//! artifact. Both ends of a self-ligation pair fall inside one restriction
//! fragment; a re-ligation pair straddles exactly one uncut junction, so
//! its ends land in adjacent fragments with the end/start boundary order.

use crate::bedpe::{PairRecord, Result};
use crate::sites::{FragmentRef, Side, SiteIndex};
use std::fmt;

/// Default span threshold in base pairs.
pub const DEFAULT_MAX_SPAN: u64 = 1000;

/// Classification outcome for one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Normal,
    SelfLigation,
    ReLigation,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Normal => "normal",
            Outcome::SelfLigation => "self-ligation",
            Outcome::ReLigation => "re-ligation",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome plus the fragment refs used to decide it.
///
/// Fragment refs are absent only when the span shortcut skipped lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub outcome: Outcome,
    pub frag1: Option<FragmentRef>,
    pub frag2: Option<FragmentRef>,
}

impl Classification {
    fn skipped(outcome: Outcome) -> Self {
        Self {
            outcome,
            frag1: None,
            frag2: None,
        }
    }
}

/// Applies the classification policy to pair records.
#[derive(Debug, Clone)]
pub struct PairClassifier {
    /// Maximum span for which fragment lookup is performed on cis pairs.
    /// `None` forces lookup on every pair (exhaustive auditing mode).
    pub max_span: Option<u64>,
}

impl Default for PairClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl PairClassifier {
    pub fn new() -> Self {
        Self {
            max_span: Some(DEFAULT_MAX_SPAN),
        }
    }

    /// Set the span threshold; `None` disables the shortcut.
    pub fn with_max_span(mut self, max_span: Option<u64>) -> Self {
        self.max_span = max_span;
        self
    }

    /// Classify one record against the site index.
    ///
    /// Trans pairs are always normal; with the shortcut enabled their
    /// fragment lookup is skipped entirely. Cis pairs whose span exceeds
    /// the threshold are normal without lookup. Everything else is located
    /// on the shared chromosome and checked for same-fragment and
    /// adjacent-fragment patterns.
    pub fn classify(&self, record: &PairRecord, sites: &SiteIndex) -> Result<Classification> {
        if record.is_trans() {
            if self.max_span.is_some() {
                return Ok(Classification::skipped(Outcome::Normal));
            }
            let frag1 = sites.locate(&record.chrom1, record.start1, record.end1)?;
            let frag2 = sites.locate(&record.chrom2, record.start2, record.end2)?;
            return Ok(Classification {
                outcome: Outcome::Normal,
                frag1: Some(frag1),
                frag2: Some(frag2),
            });
        }

        if let Some(max_span) = self.max_span {
            if record.span() > max_span {
                return Ok(Classification::skipped(Outcome::Normal));
            }
        }

        let frag1 = sites.locate(&record.chrom1, record.start1, record.end1)?;
        let frag2 = sites.locate(&record.chrom1, record.start2, record.end2)?;

        let outcome = if frag1.index == frag2.index {
            Outcome::SelfLigation
        } else if frag2.index == frag1.index + 1
            && frag1.side == Side::End
            && frag2.side == Side::Start
        {
            Outcome::ReLigation
        } else {
            Outcome::Normal
        };

        Ok(Classification {
            outcome,
            frag1: Some(frag1),
            frag2: Some(frag2),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sites::SiteIndex;

    fn index(pairs: &[(&str, u64)]) -> SiteIndex {
        SiteIndex::from_pairs(pairs.iter().map(|&(c, p)| (c.to_string(), p)))
    }

    #[test]
    fn test_trans_pair_skips_lookup() {
        // chr9 is deliberately absent from the index: the shortcut must
        // return before any lookup happens.
        let sites = index(&[("chr1", 100)]);
        let rec = PairRecord::new("chr1", 10, 20, "chr9", 10, 20);

        let c = PairClassifier::new().classify(&rec, &sites).unwrap();
        assert_eq!(c.outcome, Outcome::Normal);
        assert_eq!(c.frag1, None);
        assert_eq!(c.frag2, None);
    }

    #[test]
    fn test_trans_pair_force_mode_locates_both_ends() {
        let sites = index(&[("chr1", 100), ("chr2", 100)]);
        let rec = PairRecord::new("chr1", 10, 20, "chr2", 150, 160);

        let c = PairClassifier::new()
            .with_max_span(None)
            .classify(&rec, &sites)
            .unwrap();
        assert_eq!(c.outcome, Outcome::Normal);
        assert!(c.frag1.is_some());
        assert!(c.frag2.is_some());
    }

    #[test]
    fn test_cis_wide_span_skips_lookup() {
        let sites = index(&[("chr1", 100)]);
        let rec = PairRecord::new("chr1", 10, 20, "chr1", 5000, 5010);

        let c = PairClassifier::new().classify(&rec, &sites).unwrap();
        assert_eq!(c.outcome, Outcome::Normal);
        assert_eq!(c.frag1, None);
    }

    #[test]
    fn test_span_equal_to_threshold_is_checked() {
        let sites = index(&[("chr1", 5000)]);
        let rec = PairRecord::new("chr1", 10, 20, "chr1", 1010, 1020);
        assert_eq!(rec.span(), 1000);

        let c = PairClassifier::new().classify(&rec, &sites).unwrap();
        // Both midpoints precede the only site: same fragment.
        assert_eq!(c.outcome, Outcome::SelfLigation);
        assert!(c.frag1.is_some());
    }

    #[test]
    fn test_self_ligation_same_fragment() {
        let sites = index(&[("chr1", 100), ("chr1", 1000)]);
        let rec = PairRecord::new("chr1", 200, 210, "chr1", 800, 810);

        let c = PairClassifier::new().classify(&rec, &sites).unwrap();
        assert_eq!(c.outcome, Outcome::SelfLigation);
        assert_eq!(c.frag1.unwrap().index, 1);
        assert_eq!(c.frag2.unwrap().index, 1);
    }

    #[test]
    fn test_re_ligation_adjacent_end_start() {
        // Sites at 100, 200, 300: mid1 = 92 -> (0, e), mid2 = 192 -> (1, s)
        let sites = index(&[("chr1", 100), ("chr1", 200), ("chr1", 300)]);
        let rec = PairRecord::new("chr1", 90, 95, "chr1", 190, 195);

        let c = PairClassifier::new().classify(&rec, &sites).unwrap();
        assert_eq!(c.outcome, Outcome::ReLigation);
    }

    #[test]
    fn test_adjacent_wrong_sides_is_normal() {
        // mid1 = 110 -> (1, e), mid2 = 210 -> (2, e): adjacent fragments
        // but the second end sits near its fragment's end boundary.
        let sites = index(&[("chr1", 100), ("chr1", 200), ("chr1", 300)]);
        let rec = PairRecord::new("chr1", 105, 115, "chr1", 205, 215);

        let c = PairClassifier::new().classify(&rec, &sites).unwrap();
        assert_eq!(c.outcome, Outcome::Normal);
        assert!(c.frag1.is_some());
    }

    #[test]
    fn test_reversed_fragment_order_is_normal() {
        // frag1 downstream of frag2: adjacency rule is directional.
        let sites = index(&[("chr1", 100), ("chr1", 200), ("chr1", 300)]);
        let rec = PairRecord::new("chr1", 205, 215, "chr1", 190, 195);

        let c = PairClassifier::new().classify(&rec, &sites).unwrap();
        assert_eq!(c.outcome, Outcome::Normal);
    }

    #[test]
    fn test_cis_unknown_chromosome_surfaces() {
        let sites = index(&[("chr1", 100)]);
        let rec = PairRecord::new("chrUn", 10, 20, "chrUn", 30, 40);

        let err = PairClassifier::new().classify(&rec, &sites).unwrap_err();
        assert!(err.to_string().contains("chrUn"));
    }

    #[test]
    fn test_force_mode_still_classifies_cis_artifacts() {
        let sites = index(&[("chr1", 100), ("chr1", 1000)]);
        // Span 5000 would be skipped under any finite threshold; forced
        // lookup gives (1, e) and (2, s): an adjacent uncut junction.
        let rec = PairRecord::new("chr1", 200, 210, "chr1", 5200, 5210);

        let c = PairClassifier::new()
            .with_max_span(None)
            .classify(&rec, &sites)
            .unwrap();
        assert_eq!(c.outcome, Outcome::ReLigation);
        assert_eq!(c.frag1.unwrap().index, 1);
        assert_eq!(c.frag2.unwrap().index, 2);
    }
}
