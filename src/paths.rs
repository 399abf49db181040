//! Filesystem helpers: base directory validation, directory creation, study size.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::{Error, Result};

/// Validate a study base directory.
///
/// An empty path stands for the current directory.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if nothing exists at the path or it is not a
/// directory.
pub fn check_path(path: &Path) -> Result<()> {
    let path = if path.as_os_str().is_empty() {
        Path::new(".")
    } else {
        path
    };

    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(Error::NotFound(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::NotFound(path.to_path_buf()))
        }
        Err(e) => Err(Error::Io(e)),
    }
}

/// Create `path` and any missing parents. Existing directories are left alone.
///
/// # Errors
///
/// Returns an IO error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Total size in bytes of every regular file below `path`, recursively.
///
/// Entries that vanish or cannot be read mid-walk are skipped.
#[must_use]
pub fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}
