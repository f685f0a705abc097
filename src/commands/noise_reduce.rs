//! Streaming noise-reduce pipeline.
//!
//! Removes self-ligation and re-ligation pairs from a BEDPE stream. A
//! single-threaded dispatcher batches records onto a work queue; a fixed
//! pool of workers classifies each batch against the shared site index and
//! appends lines to per-worker partial files; after all workers join, the
//! partials are concatenated per category into the three final outputs
//! (`<output>`, `<output>.sel`, `<output>.re`).
//!
//! # Ordering
//!
//! Records keep their relative order within a batch and within one
//! worker's stream of batches, but batches are consumed by whichever
//! worker is free, so the merged output is grouped by worker rather than
//! by input order. Callers that need global input order must run a single
//! worker or re-sort downstream.

use crate::bedpe::{BedpeError, BedpeReader, PairRecord, Result};
use crate::classify::{Outcome, PairClassifier, DEFAULT_MAX_SPAN};
use crate::sites::SiteIndex;
use crate::streaming::output::PairWriter;
use crate::streaming::parsing::{parse_bedpe_bytes, should_skip_line};
use crossbeam_channel::{unbounded, Receiver, Sender};
use memchr::memchr;
use memmap2::Mmap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Records per work batch.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Minimum file size to use mmap (smaller inputs use buffered I/O).
const MMAP_THRESHOLD: usize = 64 * 1024;

/// Output category tags, in merge order: normal, self-ligation, re-ligation.
const CATEGORY_TAGS: [&str; 3] = ["", ".sel", ".re"];

/// Shared flag observed at batch boundaries by the dispatcher and workers.
///
/// Cancelling makes the run shut down cleanly: in-flight batches are
/// abandoned, partial files are closed and removed, and `run` returns
/// [`BedpeError::Cancelled`] instead of merging.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Statistics from a noise-reduce run.
#[derive(Debug, Default, Clone)]
pub struct NoiseReduceStats {
    pub records_read: u64,
    pub batches: u64,
    pub normal: u64,
    pub self_ligation: u64,
    pub re_ligation: u64,
}

impl fmt::Display for NoiseReduceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Records: {}, Batches: {}, Normal: {}, Self-ligation: {}, Re-ligation: {}",
            self.records_read, self.batches, self.normal, self.self_ligation, self.re_ligation
        )
    }
}

/// Per-worker output tallies, folded into the final stats.
#[derive(Debug, Default, Clone, Copy)]
struct WorkerTally {
    normal: u64,
    self_ligation: u64,
    re_ligation: u64,
}

/// The three partial output files owned by one worker.
struct WorkerPaths {
    normal: PathBuf,
    self_ligation: PathBuf,
    re_ligation: PathBuf,
}

impl WorkerPaths {
    fn new(output: &Path, worker: usize) -> Self {
        Self {
            normal: partial_path(output, CATEGORY_TAGS[0], worker),
            self_ligation: partial_path(output, CATEGORY_TAGS[1], worker),
            re_ligation: partial_path(output, CATEGORY_TAGS[2], worker),
        }
    }
}

fn partial_path(output: &Path, tag: &str, worker: usize) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(format!(".tmp{}.{}", tag, worker));
    PathBuf::from(name)
}

fn final_path(output: &Path, tag: &str) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(tag);
    PathBuf::from(name)
}

/// Noise-reduce command configuration.
#[derive(Debug, Clone)]
pub struct NoiseReduceCommand {
    /// Number of worker threads (>= 1).
    pub workers: usize,
    /// Records per batch handed to the work queue.
    pub chunk_size: usize,
    /// Span threshold; `None` forces fragment lookup on every pair.
    pub max_span: Option<u64>,
    cancel: CancelToken,
}

impl Default for NoiseReduceCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl NoiseReduceCommand {
    pub fn new() -> Self {
        Self {
            workers: 1,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_span: Some(DEFAULT_MAX_SPAN),
            cancel: CancelToken::new(),
        }
    }

    /// Set the worker count (clamped to at least 1).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the batch size (clamped to at least 1).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the span threshold; `None` disables the shortcut.
    pub fn with_max_span(mut self, max_span: Option<u64>) -> Self {
        self.max_span = max_span;
        self
    }

    /// Get a handle that can cancel this run from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run the pipeline on an input file.
    ///
    /// Large inputs are memory-mapped and walked with memchr; small ones
    /// go through the buffered reader.
    pub fn run<P, Q>(&self, input: P, output: Q, sites: &SiteIndex) -> Result<NoiseReduceStats>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let file = File::open(input.as_ref())?;
        let file_size = file.metadata()?.len() as usize;

        if file_size >= MMAP_THRESHOLD {
            let mmap = unsafe { Mmap::map(&file)? };
            self.execute(output.as_ref(), sites, |tx| self.dispatch_bytes(&mmap, tx))
        } else {
            self.execute(output.as_ref(), sites, |tx| {
                self.dispatch_reader(BedpeReader::new(file), tx)
            })
        }
    }

    /// Run the pipeline on any readable source (stdin, test buffers).
    pub fn run_reader<R, Q>(&self, reader: R, output: Q, sites: &SiteIndex) -> Result<NoiseReduceStats>
    where
        R: Read,
        Q: AsRef<Path>,
    {
        self.execute(output.as_ref(), sites, |tx| {
            self.dispatch_reader(BedpeReader::new(reader), tx)
        })
    }

    /// Fan out batches to workers, join them all, then merge partials.
    fn execute<F>(&self, output: &Path, sites: &SiteIndex, dispatch: F) -> Result<NoiseReduceStats>
    where
        F: FnOnce(&Sender<Vec<PairRecord>>) -> Result<(u64, u64)>,
    {
        let classifier = PairClassifier::new().with_max_span(self.max_span);
        let (tx, rx) = unbounded::<Vec<PairRecord>>();

        let (dispatched, worker_results) = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.workers);
            for worker in 0..self.workers {
                let rx = rx.clone();
                let cancel = self.cancel.clone();
                let classifier = classifier.clone();
                let paths = WorkerPaths::new(output, worker);
                handles.push(scope.spawn(move || {
                    let result = worker_loop(&rx, sites, &classifier, &paths, &cancel);
                    if result.is_err() {
                        // Make the dispatcher stop feeding a failed pool.
                        cancel.cancel();
                    }
                    result
                }));
            }
            drop(rx);

            let dispatched = dispatch(&tx);
            // Closing the channel is the shutdown signal.
            drop(tx);

            let worker_results: Vec<Result<WorkerTally>> = handles
                .into_iter()
                .map(|h| h.join().unwrap_or(Err(BedpeError::WorkerPanic)))
                .collect();
            (dispatched, worker_results)
        });

        let mut stats = NoiseReduceStats::default();
        let mut failure: Option<BedpeError> = None;
        for result in worker_results {
            match result {
                Ok(tally) => {
                    stats.normal += tally.normal;
                    stats.self_ligation += tally.self_ligation;
                    stats.re_ligation += tally.re_ligation;
                }
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }

        if let Some(e) = failure {
            self.remove_partials(output);
            return Err(e);
        }

        let (records_read, batches) = match dispatched {
            Ok(counts) => counts,
            Err(e) => {
                self.remove_partials(output);
                return Err(e);
            }
        };

        if self.cancel.is_cancelled() {
            self.remove_partials(output);
            return Err(BedpeError::Cancelled);
        }

        stats.records_read = records_read;
        stats.batches = batches;

        self.merge_partials(output)?;
        Ok(stats)
    }

    /// Dispatch from a memory-mapped byte buffer.
    fn dispatch_bytes(&self, data: &[u8], tx: &Sender<Vec<PairRecord>>) -> Result<(u64, u64)> {
        let mut batch: Vec<PairRecord> = Vec::with_capacity(self.chunk_size);
        let mut records = 0u64;
        let mut batches = 0u64;
        let mut line_number = 0usize;
        let mut pos = 0usize;

        while pos < data.len() {
            let line_end = memchr(b'\n', &data[pos..])
                .map(|i| pos + i)
                .unwrap_or(data.len());
            let mut line = &data[pos..line_end];
            if line.ends_with(b"\r") {
                line = &line[..line.len() - 1];
            }
            pos = line_end + 1;
            line_number += 1;

            if should_skip_line(line) {
                continue;
            }

            let record = parse_bedpe_bytes(line)
                .and_then(|p| p.to_record())
                .ok_or_else(|| BedpeError::Parse {
                    line: line_number,
                    message: format!(
                        "malformed BEDPE record: '{}'",
                        String::from_utf8_lossy(line)
                    ),
                })?;
            batch.push(record);
            records += 1;

            if batch.len() >= self.chunk_size
                && !self.flush_batch(&mut batch, tx, &mut batches)?
            {
                return Ok((records, batches));
            }
        }

        if !batch.is_empty() {
            self.flush_batch(&mut batch, tx, &mut batches)?;
        }
        Ok((records, batches))
    }

    /// Dispatch from a streaming reader.
    fn dispatch_reader<R: Read>(
        &self,
        mut reader: BedpeReader<R>,
        tx: &Sender<Vec<PairRecord>>,
    ) -> Result<(u64, u64)> {
        let mut batch: Vec<PairRecord> = Vec::with_capacity(self.chunk_size);
        let mut records = 0u64;
        let mut batches = 0u64;

        while let Some(record) = reader.read_record()? {
            batch.push(record);
            records += 1;

            if batch.len() >= self.chunk_size
                && !self.flush_batch(&mut batch, tx, &mut batches)?
            {
                return Ok((records, batches));
            }
        }

        if !batch.is_empty() {
            self.flush_batch(&mut batch, tx, &mut batches)?;
        }
        Ok((records, batches))
    }

    /// Hand the accumulated batch to the queue. Returns false when the
    /// dispatcher should stop (cancelled, or every worker is gone).
    fn flush_batch(
        &self,
        batch: &mut Vec<PairRecord>,
        tx: &Sender<Vec<PairRecord>>,
        batches: &mut u64,
    ) -> Result<bool> {
        if self.cancel.is_cancelled() {
            batch.clear();
            return Ok(false);
        }
        let full = std::mem::replace(batch, Vec::with_capacity(self.chunk_size));
        if tx.send(full).is_err() {
            return Ok(false);
        }
        *batches += 1;
        Ok(true)
    }

    /// Concatenate per-worker partials into the three final outputs, in
    /// ascending worker order, then delete the partials. Runs only after
    /// every worker has been joined.
    fn merge_partials(&self, output: &Path) -> Result<()> {
        for tag in CATEGORY_TAGS {
            let mut merged = BufWriter::new(File::create(final_path(output, tag))?);
            for worker in 0..self.workers {
                let part = partial_path(output, tag, worker);
                if !part.exists() {
                    return Err(BedpeError::MissingPartial(part));
                }
                let mut file = File::open(&part)?;
                io::copy(&mut file, &mut merged)?;
            }
            merged.flush()?;
            for worker in 0..self.workers {
                fs::remove_file(partial_path(output, tag, worker))?;
            }
        }
        Ok(())
    }

    /// Best-effort cleanup on failure paths.
    fn remove_partials(&self, output: &Path) {
        for tag in CATEGORY_TAGS {
            for worker in 0..self.workers {
                let _ = fs::remove_file(partial_path(output, tag, worker));
            }
        }
    }
}

/// Worker body: drain the queue until it closes, classifying every record
/// and appending it to the matching partial file.
fn worker_loop(
    rx: &Receiver<Vec<PairRecord>>,
    sites: &SiteIndex,
    classifier: &PairClassifier,
    paths: &WorkerPaths,
    cancel: &CancelToken,
) -> Result<WorkerTally> {
    let mut normal = PairWriter::create(&paths.normal)?;
    let mut self_ligation = PairWriter::create(&paths.self_ligation)?;
    let mut re_ligation = PairWriter::create(&paths.re_ligation)?;
    let mut tally = WorkerTally::default();

    for batch in rx.iter() {
        if cancel.is_cancelled() {
            break;
        }
        for record in &batch {
            let classification = classifier.classify(record, sites)?;
            let writer = match classification.outcome {
                Outcome::Normal => {
                    tally.normal += 1;
                    &mut normal
                }
                Outcome::SelfLigation => {
                    tally.self_ligation += 1;
                    &mut self_ligation
                }
                Outcome::ReLigation => {
                    tally.re_ligation += 1;
                    &mut re_ligation
                }
            };
            writer.write_record(
                record,
                classification.frag1.as_ref(),
                classification.frag2.as_ref(),
            )?;
        }
    }

    normal.flush()?;
    self_ligation.flush()?;
    re_ligation.flush()?;
    Ok(tally)
}
