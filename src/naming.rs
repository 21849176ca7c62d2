//! Destination naming policies.
//!
//! Every function here is pure: it maps a source path and its metadata to
//! one or more destination paths *relative to the output root*. Each path
//! component is passed through [`sanitize_component`], so no destination
//! can name a parent directory or an absolute location.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::message::MessageMeta;

/// Characters that are illegal (or dangerous) in file names on common platforms.
const ILLEGAL_CHARS: [char; 10] = ['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>'];

/// Default maximum length of a sanitized component, in characters.
pub const DEFAULT_COMPONENT_LEN: usize = 150;

/// Placeholder for components that sanitize to nothing.
const EMPTY_COMPONENT: &str = "unknown";

/// How destination directories are derived from each message.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum NamingPolicy {
    /// `<file name>.<hash of full path>`: one folder per source file.
    #[default]
    Source,
    /// `<recipient>/<subject>`: one folder per recipient, shared between messages.
    Recipient,
    /// `<yyyyMMddHHmmss>_<file name>`: one folder per source file, sorted by date.
    Date,
}

impl NamingPolicy {
    /// `true` when several messages may legitimately land in the same folder.
    ///
    /// Shared destinations are created idempotently and merged into;
    /// exclusive ones must not exist beforehand.
    pub fn shares_destinations(self) -> bool {
        matches!(self, Self::Recipient)
    }
}

impl std::fmt::Display for NamingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Source => "source",
            Self::Recipient => "recipient",
            Self::Date => "date",
        };
        f.write_str(name)
    }
}

/// Naming parameters that stay fixed for the whole run.
#[derive(Debug, Clone, Copy)]
pub struct Namer {
    pub policy: NamingPolicy,
    /// Maximum subject length, in characters, before truncation.
    pub subject_max_len: usize,
}

impl Namer {
    pub fn new(policy: NamingPolicy, subject_max_len: usize) -> Self {
        Self {
            policy,
            subject_max_len: subject_max_len.max(1),
        }
    }

    /// Destinations for one message, relative to the output root.
    ///
    /// The recipient policy fans out: a message with three recipients yields
    /// three destinations. All other policies yield exactly one.
    pub fn destinations(&self, source: &Path, meta: &MessageMeta) -> Vec<PathBuf> {
        match self.policy {
            NamingPolicy::Source => vec![PathBuf::from(source_folder_name(source))],
            NamingPolicy::Date => {
                let date = meta.date.format("%Y%m%d%H%M%S");
                let name = format!("{date}_{}", base_name(source));
                vec![PathBuf::from(sanitize_component(&name, DEFAULT_COMPONENT_LEN))]
            }
            NamingPolicy::Recipient => {
                let subject = sanitize_component(&meta.subject, self.subject_max_len);
                if meta.recipients.is_empty() {
                    return vec![Path::new(EMPTY_COMPONENT).join(subject)];
                }
                meta.recipients
                    .iter()
                    .map(|r| {
                        Path::new(&sanitize_component(r, DEFAULT_COMPONENT_LEN)).join(&subject)
                    })
                    .collect()
            }
        }
    }
}

/// `<file name>.<first 4 bytes of SHA-256(full path), hex>`.
///
/// Two inputs with the same file name in different directories get
/// different folders; the same path always maps to the same folder.
pub fn source_folder_name(source: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.to_string_lossy().as_bytes());
    let digest = hasher.finalize();
    let short: String = digest[..4].iter().map(|b| format!("{b:02x}")).collect();
    sanitize_component(
        &format!("{}.{short}", base_name(source)),
        DEFAULT_COMPONENT_LEN,
    )
}

/// Sanitize a string for use as a single path component.
///
/// Replaces illegal and control characters with `_`, truncates to `max_len`
/// characters, and trims trailing whitespace and dots. Names made only of
/// dots (`.`, `..`) become underscores. Empty input becomes `"unknown"`
/// (itself truncated to `max_len`).
///
/// Applying it twice gives the same result as applying it once.
pub fn sanitize_component(s: &str, max_len: usize) -> String {
    let max_len = max_len.max(1);
    let replaced: String = s
        .trim()
        .chars()
        .map(|c| {
            if ILLEGAL_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .take(max_len)
        .collect();
    let trimmed = replaced.trim_end_matches(|c: char| c.is_whitespace() || c == '.');

    if trimmed.is_empty() {
        if replaced.is_empty() {
            return EMPTY_COMPONENT.chars().take(max_len).collect();
        }
        return "_".repeat(replaced.chars().count());
    }
    trimmed.to_string()
}

/// File name of the source, or the whole path when it has none.
fn base_name(source: &Path) -> String {
    source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string_lossy().into_owned())
}
