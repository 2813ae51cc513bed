//! "Is this path on a remote or virtual filesystem" predicate.
//!
//! This is an environment heuristic, so it sits behind [`RemoteMountDetector`]
//! and tests inject either answer with a closure.

use std::path::Path;

/// Decides whether a path lives on a remote/virtual mount.
pub trait RemoteMountDetector: Send + Sync {
    fn is_remote_mount(&self, path: &Path) -> bool;
}

impl<F> RemoteMountDetector for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn is_remote_mount(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Default path markers of cloud/remote mounts.
pub fn default_remote_markers() -> Vec<String> {
    ["clouddrive", "rclone", "alist", "webdav", "/mnt/cloud", "/remote/"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Path-pattern match first, then the filesystem type of the owning mount.
#[derive(Debug, Clone)]
pub struct MountHeuristic {
    markers: Vec<String>,
    check_fs_type: bool,
}

impl MountHeuristic {
    pub fn new(markers: Vec<String>) -> Self {
        Self {
            markers: markers.into_iter().map(|m| m.to_lowercase()).collect(),
            check_fs_type: true,
        }
    }

    /// Only use path markers, never query the filesystem.
    pub fn markers_only(markers: Vec<String>) -> Self {
        Self {
            check_fs_type: false,
            ..Self::new(markers)
        }
    }

    fn matches_marker(&self, path: &Path) -> bool {
        let lower = path.to_string_lossy().to_lowercase();
        self.markers.iter().any(|m| lower.contains(m.as_str()))
    }
}

impl Default for MountHeuristic {
    fn default() -> Self {
        Self::new(default_remote_markers())
    }
}

impl RemoteMountDetector for MountHeuristic {
    fn is_remote_mount(&self, path: &Path) -> bool {
        if self.matches_marker(path) {
            return true;
        }
        self.check_fs_type && fs_type_is_remote(path)
    }
}

#[cfg(target_os = "linux")]
fn fs_type_is_remote(path: &Path) -> bool {
    use nix::sys::statfs::statfs;

    const NFS_SUPER_MAGIC: i64 = 0x6969;
    const SMB_SUPER_MAGIC: i64 = 0x517B;
    const CIFS_MAGIC_NUMBER: i64 = 0xFF53_4D42;
    const SMB2_MAGIC_NUMBER: i64 = 0xFE53_4D42;
    const FUSE_SUPER_MAGIC: i64 = 0x6573_5546;
    const REMOTE_TYPES: &[i64] = &[
        NFS_SUPER_MAGIC,
        SMB_SUPER_MAGIC,
        CIFS_MAGIC_NUMBER,
        SMB2_MAGIC_NUMBER,
        FUSE_SUPER_MAGIC,
    ];

    // The image itself may not be listed yet; ask the nearest existing ancestor.
    let Some(existing) = path.ancestors().find(|p| p.exists()) else {
        return false;
    };

    match statfs(existing) {
        Ok(stat) => {
            let fs_type = stat.filesystem_type().0 as i64;
            REMOTE_TYPES.contains(&fs_type)
        }
        Err(e) => {
            tracing::debug!("statfs failed for {:?}: {}", existing, e);
            false
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn fs_type_is_remote(_path: &Path) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_match_is_case_insensitive() {
        let heuristic = MountHeuristic::markers_only(vec!["CloudDrive".into()]);
        assert!(heuristic.is_remote_mount(Path::new("/mnt/clouddrive/Movies/a.iso")));
        assert!(!heuristic.is_remote_mount(Path::new("/srv/media/a.iso")));
    }

    #[test]
    fn test_default_markers() {
        let heuristic = MountHeuristic::markers_only(default_remote_markers());
        assert!(heuristic.is_remote_mount(Path::new("/data/rclone/a.iso")));
        assert!(heuristic.is_remote_mount(Path::new("/mnt/cloud/a.iso")));
    }

    #[test]
    fn test_closure_detector() {
        let always: &dyn RemoteMountDetector = &|_: &Path| true;
        assert!(always.is_remote_mount(Path::new("/anything")));
    }

    #[test]
    fn test_local_tempdir_is_not_remote() {
        let dir = tempfile::tempdir().unwrap();
        let heuristic = MountHeuristic::new(Vec::new());
        // tmpfs/ext4/overlay are all local types.
        assert!(!heuristic.is_remote_mount(&dir.path().join("missing.iso")));
    }
}
