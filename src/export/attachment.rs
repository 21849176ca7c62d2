//! Write extracted attachments to disk.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{ExtractError, Result};
use crate::model::attachment::Attachment;
use crate::naming::{sanitize_component, DEFAULT_COMPONENT_LEN};

/// Upper bound on `_N` suffixes tried before giving up on a file name.
const MAX_NAME_SUFFIX: usize = 10_000;

/// How a destination directory may relate to existing directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirMode {
    /// The directory belongs to one message and must not exist yet.
    Exclusive,
    /// The directory may already exist (created by another message or worker).
    Shared,
}

/// Outcome of writing one attachment set into one destination.
#[derive(Debug, Default)]
pub struct WriteReport {
    /// The destination directory.
    pub dir: PathBuf,
    /// Files that were written successfully.
    pub written: Vec<PathBuf>,
    /// Total bytes written.
    pub bytes: u64,
    /// Per-attachment failures; the remaining attachments were still attempted.
    pub failures: Vec<ExtractError>,
}

impl WriteReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Write every attachment into `dir`, creating it (and its parents) first.
///
/// A directory that cannot be created fails the whole set and nothing is
/// written. A failing attachment is recorded in the report and the next
/// one is attempted; files already written are left in place.
///
/// Existing files are never overwritten: a clashing name gets a `_1`, `_2`,
/// … suffix before its extension.
pub fn write_attachments(
    dir: &Path,
    attachments: &[Attachment],
    mode: DirMode,
) -> Result<WriteReport> {
    create_destination(dir, mode)?;

    let mut report = WriteReport {
        dir: dir.to_path_buf(),
        ..WriteReport::default()
    };

    for attachment in attachments {
        let name = attachment_file_name(attachment);
        match write_new_file(dir, &name, &attachment.data) {
            Ok(path) => {
                report.bytes += attachment.size();
                report.written.push(path);
            }
            Err(source) => {
                tracing::warn!(name = %name, dir = %dir.display(), error = %source, "Failed to save attachment");
                report.failures.push(ExtractError::WriteFailed {
                    name,
                    dir: dir.to_path_buf(),
                    source,
                });
            }
        }
    }

    Ok(report)
}

/// Copy the source message into `dir` as `name` (or `name_N` if taken).
pub fn copy_original(source: &Path, dir: &Path, name: &str) -> Result<PathBuf> {
    let copy_failed = |source_err: io::Error| ExtractError::CopyFailed {
        path: source.to_path_buf(),
        dir: dir.to_path_buf(),
        source: source_err,
    };

    let mut input = File::open(source).map_err(copy_failed)?;
    let (path, mut output) = create_unique(dir, name).map_err(copy_failed)?;
    io::copy(&mut input, &mut output).map_err(copy_failed)?;
    output.flush().map_err(copy_failed)?;
    Ok(path)
}

/// File name for an attachment on disk.
///
/// Unnamed attachments get a generated `attachment_<uuid>` name; named ones
/// are sanitized so they cannot leave the destination directory.
pub fn attachment_file_name(attachment: &Attachment) -> String {
    if attachment.is_unnamed() {
        return format!("attachment_{}", uuid::Uuid::new_v4().simple());
    }
    sanitize_component(&attachment.name, DEFAULT_COMPONENT_LEN)
}

fn create_destination(dir: &Path, mode: DirMode) -> Result<()> {
    let dir_failed = |source: io::Error| ExtractError::DirCreateFailed {
        path: dir.to_path_buf(),
        source,
    };

    match mode {
        DirMode::Shared => std::fs::create_dir_all(dir).map_err(dir_failed),
        DirMode::Exclusive => {
            if let Some(parent) = dir.parent() {
                std::fs::create_dir_all(parent).map_err(dir_failed)?;
            }
            std::fs::create_dir(dir).map_err(dir_failed)
        }
    }
}

fn write_new_file(dir: &Path, name: &str, data: &[u8]) -> io::Result<PathBuf> {
    let (path, mut file) = create_unique(dir, name)?;
    file.write_all(data)?;
    file.flush()?;
    Ok(path)
}

/// Atomically create a file that did not exist before.
///
/// Concurrent writers into a shared directory each get their own file.
fn create_unique(dir: &Path, name: &str) -> io::Result<(PathBuf, File)> {
    let name_path = Path::new(name);
    let stem = name_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    let ext = name_path.extension().and_then(|e| e.to_str());

    for i in 0..MAX_NAME_SUFFIX {
        let candidate = match (i, ext) {
            (0, _) => dir.join(name),
            (_, Some(ext)) => dir.join(format!("{stem}_{i}.{ext}")),
            (_, None) => dir.join(format!("{stem}_{i}")),
        };
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for '{name}' in '{}'", dir.display()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_preserves_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("msg");
        let attachments = vec![
            Attachment::new("x.png", vec![0x89, b'P', b'N', b'G', 0x00, 0xFF]),
            Attachment::new("notes.txt", b"caf\xe9".to_vec()),
        ];

        let report = write_attachments(&dir, &attachments, DirMode::Exclusive).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.written.len(), 2);
        assert_eq!(report.bytes, 10);
        assert_eq!(std::fs::read(dir.join("x.png")).unwrap(), attachments[0].data);
        assert_eq!(std::fs::read(dir.join("notes.txt")).unwrap(), attachments[1].data);
    }

    #[test]
    fn test_unnamed_attachment_gets_generated_name() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("msg");
        let attachments = vec![Attachment::new("", b"data".to_vec())];

        let report = write_attachments(&dir, &attachments, DirMode::Exclusive).unwrap();
        let name = report.written[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("attachment_"));
        assert!(name.len() > "attachment_".len());
    }

    #[test]
    fn test_duplicate_names_do_not_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("msg");
        let attachments = vec![
            Attachment::new("report.pdf", b"one".to_vec()),
            Attachment::new("report.pdf", b"two".to_vec()),
            Attachment::new("README", b"three".to_vec()),
            Attachment::new("README", b"four".to_vec()),
        ];

        write_attachments(&dir, &attachments, DirMode::Exclusive).unwrap();
        assert_eq!(std::fs::read(dir.join("report.pdf")).unwrap(), b"one");
        assert_eq!(std::fs::read(dir.join("report_1.pdf")).unwrap(), b"two");
        assert_eq!(std::fs::read(dir.join("README")).unwrap(), b"three");
        assert_eq!(std::fs::read(dir.join("README_1")).unwrap(), b"four");
    }

    #[test]
    fn test_exclusive_dir_conflict() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("msg");
        std::fs::create_dir(&dir).unwrap();

        let err = write_attachments(&dir, &[Attachment::new("a", b"a".to_vec())], DirMode::Exclusive)
            .unwrap_err();
        assert!(matches!(err, ExtractError::DirCreateFailed { .. }));
        assert!(!dir.join("a").exists());
    }

    #[test]
    fn test_shared_dir_merges() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("bob@x.com").join("hello");

        write_attachments(&dir, &[Attachment::new("a.txt", b"1".to_vec())], DirMode::Shared).unwrap();
        write_attachments(&dir, &[Attachment::new("a.txt", b"2".to_vec())], DirMode::Shared).unwrap();

        assert_eq!(std::fs::read(dir.join("a.txt")).unwrap(), b"1");
        assert_eq!(std::fs::read(dir.join("a_1.txt")).unwrap(), b"2");
    }

    #[test]
    fn test_traversal_names_stay_inside() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("msg");
        let attachments = vec![Attachment::new("../../escape.sh", b"x".to_vec())];

        let report = write_attachments(&dir, &attachments, DirMode::Exclusive).unwrap();
        assert_eq!(report.written[0].parent().unwrap(), dir);
        assert!(!tmp.path().join("escape.sh").exists());
    }

    #[test]
    fn test_copy_original() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("a.eml");
        std::fs::write(&source, b"Subject: hi\n\nbody\n").unwrap();
        let dir = tmp.path().join("out");
        std::fs::create_dir(&dir).unwrap();

        let first = copy_original(&source, &dir, "original.eml").unwrap();
        let second = copy_original(&source, &dir, "original.eml").unwrap();
        assert_eq!(first, dir.join("original.eml"));
        assert_eq!(second, dir.join("original_1.eml"));
        assert_eq!(std::fs::read(first).unwrap(), b"Subject: hi\n\nbody\n");
    }

    #[test]
    fn test_copy_original_missing_source() {
        let tmp = tempfile::tempdir().unwrap();
        let err = copy_original(&tmp.path().join("nope.eml"), tmp.path(), "original.eml")
            .unwrap_err();
        assert!(matches!(err, ExtractError::CopyFailed { .. }));
    }
}
