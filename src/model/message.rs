//! Extracted message record.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::attachment::Attachment;

/// Timestamp used when a message has no usable `Date:` header.
pub const SENTINEL_DATE: DateTime<Utc> = DateTime::UNIX_EPOCH;

/// Header-derived metadata used by the naming policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageMeta {
    /// Addresses found in the `To:` header, lowercased, sorted and de-duplicated.
    pub recipients: Vec<String>,

    /// Decoded subject. Never empty: a unique placeholder replaces a missing one.
    pub subject: String,

    /// Parsed `Date:` header, or [`SENTINEL_DATE`].
    pub date: DateTime<Utc>,
}

impl MessageMeta {
    /// `true` when the date could not be parsed.
    pub fn has_sentinel_date(&self) -> bool {
        self.date == SENTINEL_DATE
    }
}

/// Everything extracted from one source file.
///
/// Lives only for the duration of that file's pipeline.
#[derive(Debug, Clone)]
pub struct ExtractedMessage {
    /// The source `.eml` path, as given on the command line.
    pub source: PathBuf,

    /// At least one attachment (messages without any are rejected earlier).
    pub attachments: Vec<Attachment>,

    /// Recipients, subject and date.
    pub meta: MessageMeta,
}

impl ExtractedMessage {
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Total decoded size of all attachments in bytes.
    pub fn attachment_bytes(&self) -> u64 {
        self.attachments.iter().map(Attachment::size).sum()
    }
}
