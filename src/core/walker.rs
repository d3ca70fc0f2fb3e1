//! Recursive enumeration of scan files under the input root.

use std::path::{Path, PathBuf};

use log::warn;
use thiserror::Error;
use walkdir::WalkDir;

/// Errors that can occur while setting up the traversal.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("input root '{0}' does not exist or is not a directory")]
    InvalidRoot(PathBuf),
}

/// Lazily enumerate every regular file under `root`, recursively.
///
/// Filenames exactly matching an entry of `ignore` (system artifacts such as
/// `.DS_Store`) are skipped. Traversal order is filesystem-dependent and not
/// part of the contract. Unreadable entries are logged and skipped rather
/// than aborting the walk.
///
/// # Errors
///
/// Returns [`WalkError::InvalidRoot`] before yielding anything if `root` is
/// missing or not a directory.
pub fn scan_files<'a>(
    root: &Path,
    ignore: &'a [String],
) -> Result<impl Iterator<Item = PathBuf> + 'a, WalkError> {
    if !root.is_dir() {
        return Err(WalkError::InvalidRoot(root.to_path_buf()));
    }

    let iter = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(move |entry| {
            let name = entry.file_name().to_string_lossy();
            !ignore.iter().any(|skip| skip.as_str() == name)
        })
        .map(|entry| entry.into_path());

    Ok(iter)
}
