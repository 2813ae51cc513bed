//! Remote target mapping for local artifacts.
//!
//! An artifact is placed next to the remote image of the placeholder it
//! belongs to. Three placements are recognised, tried in order:
//!
//! 1. Same directory as a placeholder. When the artifact name starts with the
//!    placeholder stem, the remote image stem replaces it
//!    (`Movie-poster.jpg` next to `Movie.strm -> /r/Movie.BluRay.iso` becomes
//!    `/r/Movie.BluRay-poster.jpg`). Otherwise the name is kept.
//! 2. Below a placeholder's directory (`extras/`), mirrored below the remote
//!    image directory.
//! 3. Above placeholders (show-level `poster.jpg` over season folders),
//!    mapped to the matching ancestor of the remote image directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use discforge_common::paths::{file_stem, is_placeholder, read_placeholder};
use walkdir::WalkDir;

/// How many directory levels are searched up and down for a placeholder.
pub const SEARCH_DEPTH: usize = 2;

/// The configured file type `name` ends with, longest match first.
pub fn matching_type<'a>(name: &str, file_types: &'a [String]) -> Option<&'a str> {
    file_types
        .iter()
        .filter(|t| !t.is_empty())
        .filter(|t| {
            name.len()
                .checked_sub(t.len())
                .and_then(|start| name.get(start..))
                .is_some_and(|tail| tail.eq_ignore_ascii_case(t))
        })
        .max_by_key(|t| t.len())
        .map(String::as_str)
}

fn placeholders_in(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut found: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_placeholder(p, extension))
        .collect();
    found.sort();
    found
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{:?} has no file name", path))
}

fn remote_dir(placeholder: &Path) -> Result<PathBuf> {
    let image = read_placeholder(placeholder)
        .with_context(|| format!("Failed to read placeholder {:?}", placeholder))?;
    image
        .parent()
        .map(Path::to_path_buf)
        .with_context(|| format!("Remote image {:?} has no parent directory", image))
}

/// Map `source` to its path on remote storage.
pub fn map_target(source: &Path, placeholder_extension: &str) -> Result<PathBuf> {
    let name = file_name(source)?;
    let dir = source
        .parent()
        .with_context(|| format!("{:?} has no parent directory", source))?;

    let siblings = placeholders_in(dir, placeholder_extension);
    if let Some(owner) = siblings
        .iter()
        .filter(|p| {
            let stem = file_stem(p);
            !stem.is_empty() && name.starts_with(&stem)
        })
        .max_by_key(|p| file_stem(p).len())
    {
        let image = read_placeholder(owner)
            .with_context(|| format!("Failed to read placeholder {:?}", owner))?;
        let suffix = &name[file_stem(owner).len()..];
        let remote_name = format!("{}{}", file_stem(&image), suffix);
        let parent = image
            .parent()
            .with_context(|| format!("Remote image {:?} has no parent directory", image))?;
        return Ok(parent.join(remote_name));
    }
    if let Some(first) = siblings.first() {
        return Ok(remote_dir(first)?.join(&name));
    }

    // Artifact inside a placeholder's directory tree.
    let mut relative = PathBuf::from(&name);
    let mut current = dir;
    for _ in 0..SEARCH_DEPTH {
        let Some(parent) = current.parent() else {
            break;
        };
        if let Some(dir_name) = current.file_name() {
            relative = Path::new(dir_name).join(relative);
        }
        if let Some(first) = placeholders_in(parent, placeholder_extension).first() {
            return Ok(remote_dir(first)?.join(relative));
        }
        current = parent;
    }

    // Show-level artifact above its placeholders.
    let nearest = WalkDir::new(dir)
        .min_depth(2)
        .max_depth(SEARCH_DEPTH + 1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_placeholder(e.path(), placeholder_extension))
        .min_by_key(|e| e.depth());
    if let Some(entry) = nearest {
        let levels_up = entry.depth() - 1;
        let mut remote = remote_dir(entry.path())?;
        for _ in 0..levels_up {
            remote = remote
                .parent()
                .map(Path::to_path_buf)
                .with_context(|| format!("Remote tree too shallow for {:?}", source))?;
        }
        return Ok(remote.join(&name));
    }

    anyhow::bail!("No placeholder found for {:?}", source)
}
