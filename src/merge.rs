//! Merger: flattens a staged directory into one text artifact.
//!
//! Walk order is deterministic: within a directory, files come before
//! subdirectories and siblings are ordered by name. This is the same order the
//! collector stages them in.
//!
//! The artifact is never written in place. Content goes to a temporary file next to
//! it, which replaces the artifact only once fully written, so a failed run leaves
//! the previously published artifact untouched.

use std::cmp::Ordering;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::SyncError;

/// Written between every pair of consecutive files.
pub const SEPARATOR: &str = "\n\n";

fn walk_order(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// Concatenate every file under `source_dir` into `output`.
///
/// Every file after the first is preceded by [`SEPARATOR`], written before the file
/// is read. A file that cannot be read as UTF-8 is skipped with a warning and its
/// separator stays in place. Returns how many files made it into the artifact; only
/// failing to write `output` is an error.
pub fn merge(source_dir: &Path, output: &Path) -> Result<usize, SyncError> {
    info!(source = %source_dir.display(), output = %output.display(), "[MERGE] Merging staged files");
    let merged = replace_artifact(output, |writer| write_merged(source_dir, writer))?;
    info!(files = merged, output = %output.display(), "[MERGE] Merge complete");
    Ok(merged)
}

fn write_merged(source_dir: &Path, writer: &mut dyn Write) -> io::Result<usize> {
    let mut seen = 0usize;
    let mut merged = 0usize;

    for entry in WalkDir::new(source_dir).sort_by(walk_order) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "[MERGE] Could not walk staging entry, skipping");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if seen > 0 {
            writer.write_all(SEPARATOR.as_bytes())?;
        }
        seen += 1;
        let content = match fs::read_to_string(entry.path()) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "[MERGE] Unreadable file, skipping");
                continue;
            }
        };
        writer.write_all(content.as_bytes())?;
        merged += 1;
        debug!(path = %entry.path().display(), size = content.len(), "[MERGE] Appended file");
    }
    Ok(merged)
}

/// Remove every leading `'\n'` from the file at `output`, replacing it atomically.
pub fn strip_leading_newlines(output: &Path) -> Result<(), SyncError> {
    let content = fs::read_to_string(output).map_err(|e| SyncError::artifact_io(output, e))?;
    let stripped = content.trim_start_matches('\n');
    if stripped.len() != content.len() {
        debug!(
            removed = content.len() - stripped.len(),
            "[MERGE] Stripped leading newlines"
        );
        replace_artifact(output, |writer| writer.write_all(stripped.as_bytes()))?;
    }
    Ok(())
}

/// Run `write` against a temporary file beside `output`, then move it over `output`.
/// On any error the temporary file is discarded and `output` is left as it was.
fn replace_artifact<T, F>(output: &Path, write: F) -> Result<T, SyncError>
where
    F: FnOnce(&mut dyn Write) -> io::Result<T>,
{
    let io_err = |e| SyncError::artifact_io(output, e);
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    if let Ok(existing) = fs::metadata(output) {
        tmp.as_file()
            .set_permissions(existing.permissions())
            .map_err(io_err)?;
    }
    let value = {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        let value = write(&mut writer).map_err(io_err)?;
        writer.flush().map_err(io_err)?;
        value
    };
    tmp.persist(output).map_err(|e| io_err(e.error))?;
    Ok(value)
}
