//! Pending placeholder discovery.

use std::path::{Path, PathBuf};

use discforge_common::paths::{descriptor_path, is_placeholder};
use tracing::debug;
use walkdir::WalkDir;

/// Every placeholder under `root`, in file-name order per directory.
pub fn find_placeholders(root: &Path, extension: &str) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_placeholder(p, extension))
        .collect()
}

/// Placeholders under `root` that have no descriptor yet.
pub fn discover_pending(root: &Path, extension: &str, suffix: &str) -> Vec<PathBuf> {
    find_placeholders(root, extension)
        .into_iter()
        .filter(|p| !descriptor_path(p, suffix).exists())
        .collect()
}
