//! pairsift: streaming ligation-artifact removal for BEDPE interaction pairs.
//!
//! This library classifies paired-end interaction records against a
//! restriction-site index and splits them into three streams: real
//! interactions, self-ligation artifacts, and re-ligation artifacts.
//!
//! # Features
//!
//! - **Parallel classification**: a dispatcher/worker pipeline over a
//!   crossbeam channel, with per-worker output files merged at the end
//! - **Streaming I/O**: batched reading with mmap for large inputs
//! - **Exact fragment assignment**: midpoint binary search with the
//!   historical side tie-break, byte-compatible with existing outputs
//!
//! # Example
//!
//! ```rust,no_run
//! use pairsift::{NoiseReduceCommand, SiteIndex};
//!
//! let sites = SiteIndex::from_bed_path("rest_sites.bed").unwrap();
//! let cmd = NoiseReduceCommand::new().with_workers(4);
//! let stats = cmd.run("pairs.bedpe", "pairs.clean", &sites).unwrap();
//! eprintln!("{}", stats);
//! ```

pub mod bedpe;
pub mod classify;
pub mod commands;
pub mod sites;
pub mod streaming;

// Re-export commonly used types
pub use bedpe::{parse_records, read_records, BedpeError, BedpeReader, PairRecord};
pub use classify::{Classification, Outcome, PairClassifier};
pub use commands::{CancelToken, NoiseReduceCommand, NoiseReduceStats};
pub use sites::{find_fragment, FragmentRef, Side, SiteIndex};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bedpe::{parse_records, read_records, BedpeReader, PairRecord};
    pub use crate::classify::{Classification, Outcome, PairClassifier};
    pub use crate::commands::{CancelToken, NoiseReduceCommand, NoiseReduceStats};
    pub use crate::sites::{FragmentRef, Side, SiteIndex};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_basic_workflow() {
        use crate::classify::{Outcome, PairClassifier};
        use crate::sites::{Side, SiteIndex};

        let sites = SiteIndex::from_pairs(vec![
            ("chr1".to_string(), 100),
            ("chr1".to_string(), 200),
            ("chr1".to_string(), 300),
        ]);

        let records =
            crate::bedpe::parse_records("chr1\t90\t95\tchr1\t190\t195\n").unwrap();
        let c = PairClassifier::new().classify(&records[0], &sites).unwrap();

        // mid1 = 92 precedes every site; mid2 = 192 sits 92bp past the
        // first site and 8bp before the second. Adjacent fragments with
        // the end/start boundary order: an uncut junction.
        let frag1 = c.frag1.unwrap();
        let frag2 = c.frag2.unwrap();
        assert_eq!((frag1.index, frag1.side), (0, Side::End));
        assert_eq!((frag2.index, frag2.side), (1, Side::Start));
        assert_eq!(c.outcome, Outcome::ReLigation);
    }
}
