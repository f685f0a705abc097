//! Shared streaming utilities.
//!
//! Zero-allocation BEDPE field parsing for the dispatcher's mmap path and
//! a buffered, itoa-backed writer for the workers' output files.

pub mod output;
pub mod parsing;

pub use output::PairWriter;
pub use parsing::{parse_bedpe_bytes, parse_u64_fast, should_skip_line, ParsedPair};
