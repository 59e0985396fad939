//! File I/O primitives with consistent error handling.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Read file contents with standardized error handling.
///
/// Wraps `fs::read_to_string` with consistent `Error::internal_io` formatting.
pub fn read_file(path: &Path, operation: &str) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(operation.to_string())))
}

/// Create a directory and all missing parents.
pub fn ensure_dir(path: &Path, operation: &str) -> Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(operation.to_string())))
}

/// Recursively remove a directory. Returns false if it did not exist.
pub fn remove_dir_if_exists(path: &Path, operation: &str) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(operation.to_string())))?;
    Ok(true)
}

/// Recursively copy `src` into `dest`, overwriting existing files.
///
/// Top-level entries of `src` named in `exclude` are skipped; nested entries
/// with the same name are still copied. An empty `exclude` copies everything,
/// `.git` included. Symlinks are followed. Returns the number of files copied.
pub fn copy_tree(src: &Path, dest: &Path, exclude: &[String]) -> std::io::Result<usize> {
    fs::create_dir_all(dest)?;
    let mut copied = 0;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        if exclude.iter().any(|e| name.to_string_lossy() == e.as_str()) {
            continue;
        }

        let src_path = entry.path();
        let dest_path = dest.join(&name);

        if fs::metadata(&src_path)?.is_dir() {
            copied += copy_tree(&src_path, &dest_path, &[])?;
        } else {
            fs::copy(&src_path, &dest_path)?;
            copied += 1;
        }
    }

    Ok(copied)
}
