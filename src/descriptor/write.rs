//! Atomic descriptor output.

use std::io::Write;
use std::path::Path;

use discforge_common::{Error, Result};

use super::MediaDescriptor;

/// Write `descriptor` to `path` through a temp file in the same directory
/// and a rename, so readers never see a partial file.
pub fn write_descriptor(path: &Path, descriptor: &MediaDescriptor) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let json = serde_json::to_vec_pretty(descriptor)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".discforge-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(&json)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| Error::Io(e.error))?;

    tracing::debug!("Wrote descriptor {:?} ({} bytes)", path, json.len());
    Ok(())
}

/// Read back a descriptor, failing on anything that is not a complete one.
pub fn read_descriptor(path: &Path) -> Result<MediaDescriptor> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{MediaSourceInfo, MediaDescriptor};

    fn descriptor() -> MediaDescriptor {
        MediaDescriptor {
            media_source_info: MediaSourceInfo {
                protocol: "File".into(),
                video_type: "BluRay".into(),
                path: "/mnt/cloud/Movie.iso".into(),
                container: Some("mpegts".into()),
                size: Some(1),
                run_time_ticks: 10,
                bitrate: None,
                media_streams: Vec::new(),
            },
            chapters: Vec::new(),
        }
    }

    #[test]
    fn test_write_replaces_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Movie-mediainfo.json");
        std::fs::write(&path, "old").unwrap();

        write_descriptor(&path, &descriptor()).unwrap();

        assert_eq!(read_descriptor(&path).unwrap(), descriptor());
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_write_into_missing_dir_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("Movie-mediainfo.json");
        assert!(write_descriptor(&path, &descriptor()).is_err());
        assert!(!path.exists());
    }
}
