//! Disc protocol detection from filename markers.
//!
//! Classification is a filename heuristic only. Names without any marker
//! default to [`DiscProtocol::Bluray`]; the probe stage falls back to the
//! other protocol when the guess is wrong.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

static BLURAY_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z])(?:blu-?ray|bdmv|bd)\d*(?:[^a-z]|$)").expect("valid regex")
});

static DVD_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z])(?:dvd\d*|video_ts)(?:[^a-z]|$)").expect("valid regex")
});

/// Optical disc protocol used to address an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscProtocol {
    Bluray,
    Dvd,
}

impl DiscProtocol {
    /// The protocol tried when this one is exhausted.
    pub fn other(self) -> Self {
        match self {
            DiscProtocol::Bluray => DiscProtocol::Dvd,
            DiscProtocol::Dvd => DiscProtocol::Bluray,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DiscProtocol::Bluray => "bluray",
            DiscProtocol::Dvd => "dvd",
        }
    }

    /// Value of the descriptor `VideoType` field.
    pub fn video_type(self) -> &'static str {
        match self {
            DiscProtocol::Bluray => "BluRay",
            DiscProtocol::Dvd => "Dvd",
        }
    }
}

impl std::fmt::Display for DiscProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DiscProtocol {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bluray" | "blu-ray" | "bd" => Ok(Self::Bluray),
            "dvd" => Ok(Self::Dvd),
            _ => Err(format!("Unknown disc protocol: {}", s)),
        }
    }
}

/// Look for a protocol marker in a single file name.
pub fn marker_in(name: &str) -> Option<DiscProtocol> {
    if BLURAY_MARKER.is_match(name) {
        Some(DiscProtocol::Bluray)
    } else if DVD_MARKER.is_match(name) {
        Some(DiscProtocol::Dvd)
    } else {
        None
    }
}

/// Classify a placeholder or image path by its file name.
pub fn detect_protocol(path: &Path) -> DiscProtocol {
    detect_protocol_any(&[path])
}

/// Classify using the first path whose file name carries a marker.
///
/// Typically called with the placeholder path and the image path it points at.
pub fn detect_protocol_any(paths: &[&Path]) -> DiscProtocol {
    paths
        .iter()
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
        .find_map(marker_in)
        .unwrap_or(DiscProtocol::Bluray)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bluray_markers() {
        assert_eq!(marker_in("Movie.2019.BluRay.iso"), Some(DiscProtocol::Bluray));
        assert_eq!(marker_in("Movie.2019.Blu-ray.iso"), Some(DiscProtocol::Bluray));
        assert_eq!(marker_in("Movie [BD50].iso"), Some(DiscProtocol::Bluray));
        assert_eq!(marker_in("movie_bdmv.iso"), Some(DiscProtocol::Bluray));
    }

    #[test]
    fn test_dvd_markers() {
        assert_eq!(marker_in("Movie.DVD9.iso"), Some(DiscProtocol::Dvd));
        assert_eq!(marker_in("movie dvd.iso"), Some(DiscProtocol::Dvd));
        assert_eq!(marker_in("VIDEO_TS.iso"), Some(DiscProtocol::Dvd));
    }

    #[test]
    fn test_marker_needs_word_boundary() {
        assert_eq!(marker_in("Abduction (2011).iso"), None);
        assert_eq!(marker_in("Dvdmania.iso"), None);
    }

    #[test]
    fn test_default_is_bluray() {
        assert_eq!(
            detect_protocol(Path::new("/lib/Some Movie (2020).iso")),
            DiscProtocol::Bluray
        );
    }

    #[test]
    fn test_detect_uses_first_marked_path() {
        let placeholder = Path::new("/lib/Some Movie (2020).strm");
        let image = Path::new("/remote/Some.Movie.2020.DVD5.iso");
        assert_eq!(detect_protocol_any(&[placeholder, image]), DiscProtocol::Dvd);
    }

    #[test]
    fn test_directory_names_are_ignored() {
        let path = Path::new("/mnt/bluray-library/Film.DVD.iso");
        assert_eq!(detect_protocol(path), DiscProtocol::Dvd);
    }

    #[test]
    fn test_other_protocol() {
        assert_eq!(DiscProtocol::Bluray.other(), DiscProtocol::Dvd);
        assert_eq!(DiscProtocol::Dvd.other(), DiscProtocol::Bluray);
    }

    #[test]
    fn test_parse_protocol() {
        assert_eq!("BluRay".parse::<DiscProtocol>(), Ok(DiscProtocol::Bluray));
        assert_eq!("dvd".parse::<DiscProtocol>(), Ok(DiscProtocol::Dvd));
        assert!("hddvd".parse::<DiscProtocol>().is_err());
    }
}
