//! Centralized error types for emlex.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the emlex library.
///
/// Per-file variants always carry the offending path so they can be
/// reported on their own, without the surrounding batch context.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// A command-line pattern matched nothing or was not a valid glob.
    #[error("failed to resolve '{pattern}': {reason}")]
    InputResolution { pattern: String, reason: String },

    /// The source file could not be opened or read.
    #[error("failed to open '{path}': {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The source file is not a parsable RFC 5322 message.
    #[error("failed to parse '{path}': {reason}")]
    ParseFailed { path: PathBuf, reason: String },

    /// The message parsed fine but carries no attachments.
    #[error("'{path}' does not contain attachments")]
    NoAttachments { path: PathBuf },

    /// A destination directory could not be created.
    #[error("failed to create '{path}': {source}")]
    DirCreateFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A single attachment could not be written.
    #[error("failed to save '{name}' in '{dir}': {source}")]
    WriteFailed {
        name: String,
        dir: PathBuf,
        source: std::io::Error,
    },

    /// The source message could not be copied next to its attachments.
    #[error("failed to copy '{path}' into '{dir}': {source}")]
    CopyFailed {
        path: PathBuf,
        dir: PathBuf,
        source: std::io::Error,
    },

    /// The run-scoped output root could not be created.
    #[error("failed to create output directory '{path}': {source}")]
    OutputRootCreateFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// None of the arguments resolved to a regular file.
    #[error("no valid files were passed")]
    NoInputFiles,

    /// The worker pool could not be started.
    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),
}

/// Convenience alias for `Result<T, ExtractError>`.
pub type Result<T> = std::result::Result<T, ExtractError>;

impl ExtractError {
    /// `true` for outcomes that are expected during normal operation.
    ///
    /// Plain-text or HTML-only messages simply have nothing to extract.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::NoAttachments { .. })
    }
}
