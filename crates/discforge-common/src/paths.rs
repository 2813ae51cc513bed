//! Placeholder and descriptor path conventions.
//!
//! A placeholder is a small text file whose first line is the absolute path
//! of a disc image on remote storage. Its descriptor lives next to it, named
//! after the placeholder stem plus a configurable suffix.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Default placeholder extension.
pub const DEFAULT_PLACEHOLDER_EXTENSION: &str = "strm";

/// Default descriptor suffix appended to the placeholder stem.
pub const DEFAULT_DESCRIPTOR_SUFFIX: &str = "-mediainfo.json";

/// Check if a path has the given placeholder extension (case-insensitive).
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use discforge_common::paths::is_placeholder;
///
/// assert!(is_placeholder(Path::new("/lib/Movie.strm"), "strm"));
/// assert!(is_placeholder(Path::new("/lib/Movie.STRM"), "strm"));
/// assert!(!is_placeholder(Path::new("/lib/Movie.nfo"), "strm"));
/// ```
pub fn is_placeholder(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Stem of a file name as a `String`, empty when there is none.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Descriptor path for a placeholder: same directory, `<stem><suffix>`.
///
/// # Examples
///
/// ```
/// use std::path::{Path, PathBuf};
/// use discforge_common::paths::descriptor_path;
///
/// assert_eq!(
///     descriptor_path(Path::new("/lib/Movie (2020)/Movie (2020).strm"), "-mediainfo.json"),
///     PathBuf::from("/lib/Movie (2020)/Movie (2020)-mediainfo.json"),
/// );
/// ```
pub fn descriptor_path(placeholder: &Path, suffix: &str) -> PathBuf {
    let name = format!("{}{}", file_stem(placeholder), suffix);
    placeholder.with_file_name(name)
}

/// Parse placeholder content: the first line with CR/LF and surrounding
/// whitespace removed.
pub fn parse_placeholder(content: &str) -> Result<PathBuf> {
    let first = content
        .trim_start_matches('\u{feff}')
        .lines()
        .next()
        .map(|line| line.trim_end_matches(['\r', '\n']).trim())
        .unwrap_or("");

    if first.is_empty() {
        return Err(Error::invalid_input("placeholder is empty"));
    }

    Ok(PathBuf::from(first))
}

/// Read a placeholder file and return the remote image path it names.
pub fn read_placeholder(path: &Path) -> Result<PathBuf> {
    let content = std::fs::read_to_string(path)?;
    parse_placeholder(&content).map_err(|_| {
        Error::invalid_input(format!("placeholder {} is empty", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_placeholder_strips_crlf() {
        let path = parse_placeholder("/mnt/cloud/Movie.iso\r\n").unwrap();
        assert_eq!(path, PathBuf::from("/mnt/cloud/Movie.iso"));
    }

    #[test]
    fn test_parse_placeholder_uses_first_line_only() {
        let path = parse_placeholder("/a/b.iso\n/c/d.iso\n").unwrap();
        assert_eq!(path, PathBuf::from("/a/b.iso"));
    }

    #[test]
    fn test_parse_placeholder_strips_bom() {
        let path = parse_placeholder("\u{feff}/a/b.iso").unwrap();
        assert_eq!(path, PathBuf::from("/a/b.iso"));
    }

    #[test]
    fn test_parse_placeholder_empty() {
        assert!(parse_placeholder("").is_err());
        assert!(parse_placeholder("\r\n").is_err());
    }

    #[test]
    fn test_read_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Movie.strm");
        std::fs::write(&file, "/mnt/cloud/Movie.iso\n").unwrap();

        assert_eq!(
            read_placeholder(&file).unwrap(),
            PathBuf::from("/mnt/cloud/Movie.iso")
        );
        assert!(read_placeholder(&dir.path().join("Missing.strm")).is_err());
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(Path::new("/a/Movie (2020).strm")), "Movie (2020)");
        assert_eq!(file_stem(Path::new("/")), "");
    }
}
