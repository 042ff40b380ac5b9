//! Shared lockfile discovery helpers
//!
//! Provides utilities for finding files by walking up the directory tree.

use std::path::{Path, PathBuf};

/// Find the nearest matching file by walking up from a start directory.
///
/// `filenames` are checked in order at each directory level.
pub fn find_nearest_file_from(start: &Path, filenames: &[&str]) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        for filename in filenames {
            let path = dir.join(filename);
            if path.is_file() {
                return Some(path);
            }
        }

        match dir.parent() {
            Some(parent) => dir = parent,
            None => break,
        }
    }

    None
}

/// Path of `filename` in the same directory as `package_file`
pub fn sibling_file(package_file: &Path, filename: &str) -> PathBuf {
    match package_file.parent() {
        Some(parent) => parent.join(filename),
        None => PathBuf::from(filename),
    }
}
