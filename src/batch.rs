//! Batch extraction: output root, per-file pipeline, and the bounded worker pool.
//!
//! Each source file runs Extract → Name → Write to completion on one worker.
//! Failures are returned as values in [`FileOutcome`]; they never reach the
//! other files or the scheduler.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use rayon::prelude::*;

use crate::error::{ExtractError, Result};
use crate::export::attachment::{copy_original, write_attachments, DirMode, WriteReport};
use crate::naming::Namer;
use crate::parser::eml;

/// The run-scoped directory under which every destination is created.
///
/// Created once, before any worker starts, and never modified afterwards
/// except by adding subdirectories.
#[derive(Debug, Clone)]
pub struct OutputRoot {
    path: PathBuf,
}

impl OutputRoot {
    /// Create `<parent>/<YYYYMMDDHHMMSS>_<suffix>` using the current local time.
    pub fn create(parent: &Path, suffix: &str) -> Result<Self> {
        Self::create_at(parent, suffix, Local::now())
    }

    /// Create the output root for a given timestamp.
    ///
    /// An existing directory of the same name is an error: two runs must
    /// never share an output root.
    pub fn create_at(parent: &Path, suffix: &str, now: DateTime<Local>) -> Result<Self> {
        let path = parent.join(format!("{}_{suffix}", now.format("%Y%m%d%H%M%S")));
        let root_failed = |source: std::io::Error| ExtractError::OutputRootCreateFailed {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(parent).map_err(root_failed)?;
        std::fs::create_dir(&path).map_err(root_failed)?;
        tracing::info!(path = %path.display(), "Created output root");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// What happened to one source file that made it through extraction.
#[derive(Debug)]
pub struct FileReport {
    /// The source file.
    pub source: PathBuf,
    /// Number of attachments found in the message.
    pub attachments: usize,
    /// One report per destination that could be created.
    pub destinations: Vec<WriteReport>,
    /// Destination and copy failures that did not stop the other destinations.
    pub failures: Vec<ExtractError>,
}

impl FileReport {
    /// Files written across all destinations.
    pub fn files_written(&self) -> usize {
        self.destinations.iter().map(|d| d.written.len()).sum()
    }

    /// Bytes written across all destinations.
    pub fn bytes_written(&self) -> u64 {
        self.destinations.iter().map(|d| d.bytes).sum()
    }

    /// Every non-fatal failure recorded for this file.
    pub fn failures(&self) -> impl Iterator<Item = &ExtractError> {
        self.failures
            .iter()
            .chain(self.destinations.iter().flat_map(|d| d.failures.iter()))
    }

    /// `true` if every attachment and copy reached every destination.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.destinations.iter().all(WriteReport::is_complete)
    }
}

/// Final state of one source file's pipeline.
#[derive(Debug)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub result: Result<FileReport>,
}

/// The per-file Extract → Name → Write pipeline, shared read-only by all workers.
#[derive(Debug)]
pub struct Pipeline {
    root: OutputRoot,
    namer: Namer,
    original_name: Option<String>,
}

impl Pipeline {
    /// `original_name` enables copying each source message into its destinations.
    pub fn new(root: OutputRoot, namer: Namer, original_name: Option<String>) -> Self {
        Self {
            root,
            namer,
            original_name,
        }
    }

    pub fn root(&self) -> &OutputRoot {
        &self.root
    }

    /// Run one source file through the whole pipeline.
    ///
    /// Returns `Err` when the file produced nothing on disk: it could not be
    /// read or parsed, had no attachments, or none of its destinations could
    /// be created. Partial failures are kept in the returned report.
    pub fn process(&self, source: &Path) -> Result<FileReport> {
        let _span = tracing::debug_span!("file", path = %source.display()).entered();

        tracing::trace!("extracting");
        let message = eml::extract(source)?;

        if message.meta.has_sentinel_date() {
            tracing::debug!("no usable Date header, using sentinel date");
        }

        tracing::trace!("naming");
        let destinations = self.namer.destinations(source, &message.meta);
        let mode = if self.namer.policy.shares_destinations() {
            DirMode::Shared
        } else {
            DirMode::Exclusive
        };

        tracing::trace!(
            destinations = destinations.len(),
            bytes = message.attachment_bytes(),
            "writing"
        );
        let mut written = Vec::with_capacity(destinations.len());
        let mut failures = Vec::new();
        for relative in destinations {
            let dir = self.root.path().join(relative);
            match write_attachments(&dir, &message.attachments, mode) {
                Ok(report) => {
                    if let Some(name) = &self.original_name {
                        if let Err(e) = copy_original(source, &dir, name) {
                            failures.push(e);
                        }
                    }
                    written.push(report);
                }
                Err(e) => failures.push(e),
            }
        }

        if written.is_empty() && !failures.is_empty() {
            return Err(failures.swap_remove(0));
        }

        Ok(FileReport {
            source: source.to_path_buf(),
            attachments: message.attachments.len(),
            destinations: written,
            failures,
        })
    }
}

/// Aggregated results of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// One outcome per input file, in input order.
    pub outcomes: Vec<FileOutcome>,
}

impl BatchSummary {
    pub fn files(&self) -> usize {
        self.outcomes.len()
    }

    /// Files whose attachments were written (at least partly).
    pub fn extracted(&self) -> usize {
        self.reports().count()
    }

    /// Files that were valid messages without attachments.
    pub fn without_attachments(&self) -> usize {
        self.errors().filter(|e| e.is_benign()).count()
    }

    /// Files that failed for any other reason.
    pub fn failed(&self) -> usize {
        self.errors().filter(|e| !e.is_benign()).count()
    }

    /// Failures inside otherwise successful files (a single attachment, a copy…).
    pub fn partial_failures(&self) -> usize {
        self.reports().map(|r| r.failures().count()).sum()
    }

    pub fn attachments_written(&self) -> usize {
        self.reports().map(FileReport::files_written).sum()
    }

    pub fn bytes_written(&self) -> u64 {
        self.reports().map(FileReport::bytes_written).sum()
    }

    /// `true` if anything other than "no attachments" went wrong.
    pub fn has_failures(&self) -> bool {
        self.failed() > 0 || self.partial_failures() > 0
    }

    fn reports(&self) -> impl Iterator<Item = &FileReport> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    fn errors(&self) -> impl Iterator<Item = &ExtractError> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }
}

/// Run `f` over `items` with at most `workers` calls in flight.
///
/// The caller blocks until every call has returned. Results keep the order
/// of `items`.
pub fn run_bounded<T, R, F>(items: &[T], workers: usize, f: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("emlex-worker-{i}"))
        .build()
        .map_err(|e| ExtractError::WorkerPool(e.to_string()))?;

    Ok(pool.install(|| items.par_iter().map(&f).collect()))
}

/// Process every file through `pipeline` on a pool of `workers` threads.
///
/// `on_done` is called from the worker as soon as a file finishes, so
/// results can be streamed to the operator while the batch runs.
pub fn run_batch(
    files: &[PathBuf],
    pipeline: &Pipeline,
    workers: usize,
    on_done: &(dyn Fn(&FileOutcome) + Sync),
) -> Result<BatchSummary> {
    tracing::info!(files = files.len(), workers, "Starting batch");

    let outcomes = run_bounded(files, workers, |source| {
        let outcome = FileOutcome {
            source: source.clone(),
            result: pipeline.process(source),
        };
        on_done(&outcome);
        outcome
    })?;

    let summary = BatchSummary { outcomes };
    tracing::info!(
        extracted = summary.extracted(),
        failed = summary.failed(),
        "Batch complete"
    );
    Ok(summary)
}
