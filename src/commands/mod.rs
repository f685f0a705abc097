//! Command implementations for pairsift.

pub mod noise_reduce;

pub use noise_reduce::{CancelToken, NoiseReduceCommand, NoiseReduceStats, DEFAULT_CHUNK_SIZE};
