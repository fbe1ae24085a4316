//! Filesystem operations module.
//!
//! This module provides low-level operations for:
//! - Enumerating a source tree while pruning hidden entries
//! - Copying files with contents, permissions and timestamps
//! - Creating intermediate directories

use std::ffi::OsStr;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use walkdir::WalkDir;

use crate::error::EngineError;
use crate::model::{BackupPlan, CopyResult, FileItem, SkipReason};

/// Leading character that marks a file or directory as hidden.
pub const HIDDEN_MARKER: char = '.';

const COPY_BUFFER_SIZE: usize = 128 * 1024;

/// Returns true if `name` starts with the hidden marker.
pub fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with(HIDDEN_MARKER)
}

/// Enumerate the regular files under `source`, mirrored onto `destination_root`.
///
/// Hidden entries below the root are pruned together with their subtree and
/// only counted. When the destination lives inside the source tree it is
/// pruned too, so a backup never copies itself. Symlinks are not followed.
/// Unreadable subdirectories become `Failed` items so that the rest of the
/// tree is still visited.
///
/// # Errors
/// Returns `EnumerationFailed` if the source root itself cannot be read.
pub fn enumerate_source(source: &Path, destination_root: &Path) -> Result<BackupPlan, EngineError> {
    let mut plan = BackupPlan::default();
    let mut hidden = 0usize;
    let destination = fs::canonicalize(destination_root).ok();

    let walker = WalkDir::new(source)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            if is_hidden(entry.file_name()) {
                hidden += 1;
                return false;
            }
            if entry.file_type().is_dir() && is_same_dir(entry.path(), destination.as_deref()) {
                tracing::debug!(path = %entry.path().display(), "skipping destination inside source");
                return false;
            }
            true
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(EngineError::EnumerationFailed {
                    path: source.to_path_buf(),
                    os_error: e.io_error().and_then(io::Error::raw_os_error),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                let path = e.path().unwrap_or(source).to_path_buf();
                tracing::debug!(path = %path.display(), error = %e, "walk error");
                plan.items.push(failed_item(source, destination_root, &path, &e));
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }

        let mut item = new_item(source, destination_root, entry.path());
        if file_type.is_file() {
            match entry.metadata() {
                Ok(metadata) => item.file_size = metadata.len(),
                Err(e) => {
                    item.result = Some(CopyResult::Failed {
                        reason: e.to_string(),
                        os_error: e.io_error().and_then(io::Error::raw_os_error),
                    });
                }
            }
        } else {
            item.result = Some(CopyResult::Skipped(SkipReason::NotRegular));
        }
        plan.items.push(item);
    }

    plan.hidden_skipped = hidden;
    Ok(plan)
}

fn is_same_dir(path: &Path, canonical: Option<&Path>) -> bool {
    match canonical {
        Some(canonical) => fs::canonicalize(path).map_or(false, |p| p == canonical),
        None => false,
    }
}

fn new_item(source: &Path, destination_root: &Path, path: &Path) -> FileItem {
    let relative = path
        .strip_prefix(source)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.file_name().map(Into::into).unwrap_or_default());

    FileItem {
        source_root: source.to_path_buf(),
        source_path: path.to_path_buf(),
        destination_path: destination_root.join(&relative),
        relative_path: relative,
        file_size: 0,
        result: None,
    }
}

fn failed_item(source: &Path, destination_root: &Path, path: &Path, err: &walkdir::Error) -> FileItem {
    let mut item = new_item(source, destination_root, path);
    item.result = Some(CopyResult::Failed {
        reason: err.to_string(),
        os_error: err.io_error().and_then(io::Error::raw_os_error),
    });
    item
}

/// Copy a file from source to destination with metadata preservation.
///
/// Contents go to a temporary file next to `dst` first. Permission bits,
/// access time and modification time are applied to it, and it is then
/// renamed over `dst`. On any error the temporary file is removed and `dst`
/// is left as it was.
///
/// # Returns
/// Number of bytes copied
pub fn copy_file_with_metadata(src: &Path, dst: &Path) -> Result<u64, EngineError> {
    ensure_parent_dir_exists(dst)?;

    let read_error = |e: io::Error| EngineError::Read {
        path: src.to_path_buf(),
        source: e,
    };
    let write_error = |e: io::Error| EngineError::Write {
        path: dst.to_path_buf(),
        source: e,
    };

    let mut src_file = fs::File::open(src).map_err(read_error)?;
    let src_metadata = src_file.metadata().map_err(read_error)?;

    let parent = match dst.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = tempfile::Builder::new()
        .prefix(".backup-")
        .suffix(".partial")
        .tempfile_in(parent)
        .map_err(write_error)?;

    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut bytes_copied = 0u64;
    loop {
        let n = match src_file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_error(e)),
        };
        staged.as_file_mut().write_all(&buffer[..n]).map_err(write_error)?;
        bytes_copied += n as u64;
    }

    staged
        .as_file()
        .set_permissions(src_metadata.permissions())
        .map_err(write_error)?;

    let atime = filetime::FileTime::from_last_access_time(&src_metadata);
    let mtime = filetime::FileTime::from_last_modification_time(&src_metadata);
    filetime::set_file_handle_times(staged.as_file(), Some(atime), Some(mtime)).map_err(write_error)?;

    staged.persist(dst).map_err(|e| write_error(e.error))?;

    Ok(bytes_copied)
}

/// Ensure the parent directory of a path exists, creating it if necessary.
///
/// # Errors
/// Returns `DirectoryCreationFailed` if the parent exists as a non-directory
/// or cannot be created.
pub fn ensure_parent_dir_exists(path: &Path) -> Result<(), EngineError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    match fs::metadata(parent) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(EngineError::DirectoryCreationFailed {
            path: parent.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::InvalidInput,
                "Parent path exists but is not a directory",
            ),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(parent).map_err(|e| EngineError::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source: e,
            })
        }
        Err(e) => Err(EngineError::DirectoryCreationFailed {
            path: parent.to_path_buf(),
            source: e,
        }),
    }
}
