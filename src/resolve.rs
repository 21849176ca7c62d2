//! Expand command-line arguments into the list of source files.

use std::path::{Path, PathBuf};

use crate::error::ExtractError;

/// Files found for a set of arguments, plus the arguments that found nothing.
#[derive(Debug, Default)]
pub struct Resolved {
    /// Regular files, in argument order. A file matched by two arguments
    /// appears twice.
    pub files: Vec<PathBuf>,
    /// One `InputResolution` error per argument that was skipped.
    pub unresolved: Vec<ExtractError>,
}

/// Expand every argument as a glob pattern and keep the regular files.
///
/// Directories are skipped silently. An argument that matches nothing and
/// does not name an existing file literally, or that is not a valid
/// pattern, is reported in [`Resolved::unresolved`] and skipped.
pub fn resolve_inputs<S: AsRef<str>>(args: &[S]) -> Resolved {
    let mut resolved = Resolved::default();

    for arg in args {
        let arg = arg.as_ref();
        match expand(arg) {
            Ok(files) if !files.is_empty() => resolved.files.extend(files),
            Ok(_) => resolved.unresolved.push(ExtractError::InputResolution {
                pattern: arg.to_string(),
                reason: "no matching files".to_string(),
            }),
            Err(reason) => resolved.unresolved.push(ExtractError::InputResolution {
                pattern: arg.to_string(),
                reason,
            }),
        }
    }

    tracing::debug!(
        files = resolved.files.len(),
        unresolved = resolved.unresolved.len(),
        "Resolved inputs"
    );
    resolved
}

fn expand(arg: &str) -> Result<Vec<PathBuf>, String> {
    let literal = Path::new(arg);
    let paths = match glob::glob(arg) {
        Ok(paths) => paths,
        // `[` and friends are legal in file names; fall back to the literal path.
        Err(_) if literal.is_file() => return Ok(vec![literal.to_path_buf()]),
        Err(e) => return Err(format!("invalid pattern: {e}")),
    };

    let mut files: Vec<PathBuf> = paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(path = %e.path().display(), error = %e.error(), "Unreadable glob entry");
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();

    if files.is_empty() && literal.is_file() {
        files.push(literal.to_path_buf());
    }
    Ok(files)
}
