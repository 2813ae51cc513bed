//! Loop-mounting disc images and managing per-process mount points.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use discforge_common::{Error, Result};
use sha2::{Digest, Sha256};

use crate::command::ToolCommand;

/// Prefix of every mount point directory this crate creates.
pub const MOUNT_PREFIX: &str = "discforge-";

/// Typed adapter over mount/umount.
#[async_trait]
pub trait Mounter: Send + Sync {
    /// Mount `image` read-only at `target`.
    async fn mount(&self, image: &Path, target: &Path) -> Result<()>;

    /// Unmount `target`; `force` requests a forced lazy unmount.
    async fn unmount(&self, target: &Path, force: bool) -> Result<()>;
}

/// `mount -o loop,ro` / `umount [-f -l]`.
#[derive(Debug, Clone)]
pub struct LoopMounter {
    mount_bin: PathBuf,
    umount_bin: PathBuf,
    timeout: Duration,
}

impl LoopMounter {
    pub fn new(mount_bin: PathBuf, umount_bin: PathBuf, timeout: Duration) -> Self {
        Self {
            mount_bin,
            umount_bin,
            timeout,
        }
    }
}

#[async_trait]
impl Mounter for LoopMounter {
    async fn mount(&self, image: &Path, target: &Path) -> Result<()> {
        ToolCommand::new(self.mount_bin.clone())
            .args(["-o", "loop,ro"])
            .arg(image.to_string_lossy())
            .arg(target.to_string_lossy())
            .timeout(self.timeout)
            .execute()
            .await?;
        Ok(())
    }

    async fn unmount(&self, target: &Path, force: bool) -> Result<()> {
        let mut cmd = ToolCommand::new(self.umount_bin.clone());
        if force {
            cmd.args(["-f", "-l"]);
        }
        cmd.arg(target.to_string_lossy())
            .timeout(self.timeout)
            .execute()
            .await?;
        Ok(())
    }
}

/// Mount point name for `image` owned by process `pid`.
pub fn mount_point_name(pid: u32, image: &Path) -> String {
    let digest = Sha256::digest(image.to_string_lossy().as_bytes());
    let hash = hex::encode(digest);
    format!("{MOUNT_PREFIX}{pid}-{}", &hash[..8])
}

/// Create this process's mount point for `image` under `root`.
///
/// The directory is created exclusively; a leftover empty directory with the
/// same name is removed and recreated.
pub fn create_mount_point(root: &Path, image: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(root)?;
    let target = root.join(mount_point_name(std::process::id(), image));

    match std::fs::create_dir(&target) {
        Ok(()) => Ok(target),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            std::fs::remove_dir(&target).map_err(|e| {
                Error::environment(format!(
                    "mount point {} already exists and is busy: {e}",
                    target.display()
                ))
            })?;
            std::fs::create_dir(&target)?;
            Ok(target)
        }
        Err(e) => Err(e.into()),
    }
}

/// Unmount `target` and remove it. Never fails; leaks are logged at error.
///
/// Graceful unmount is tried `attempts` times with `backoff` between tries,
/// then a forced lazy unmount.
pub async fn release_mount_point(
    mounter: &dyn Mounter,
    target: &Path,
    attempts: u32,
    backoff: Duration,
) -> bool {
    let mut unmounted = false;
    for attempt in 1..=attempts.max(1) {
        match mounter.unmount(target, false).await {
            Ok(()) => {
                unmounted = true;
                break;
            }
            Err(e) => {
                tracing::warn!(
                    "Unmount of {:?} failed (attempt {}/{}): {}",
                    target,
                    attempt,
                    attempts,
                    e
                );
                if attempt < attempts {
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    if !unmounted {
        if let Err(e) = mounter.unmount(target, true).await {
            tracing::warn!("Forced unmount of {:?} failed: {}", target, e);
        }
    }

    match std::fs::remove_dir(target) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            tracing::error!(
                "Leaked mount point {:?}: {} (remove manually after unmounting)",
                target,
                e
            );
            false
        }
    }
}

/// Owner PID encoded in a mount point name.
pub fn owner_pid(name: &str) -> Option<u32> {
    name.strip_prefix(MOUNT_PREFIX)?
        .split('-')
        .next()?
        .parse()
        .ok()
}

#[cfg(target_os = "linux")]
fn pid_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn pid_alive(_pid: u32) -> bool {
    true
}

/// Remove mount points left behind by processes that no longer exist.
///
/// Returns the number of directories removed.
pub async fn cleanup_stale(root: &Path, mounter: &dyn Mounter) -> usize {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
        Err(e) => {
            tracing::warn!("Cannot list mount root {:?}: {}", root, e);
            return 0;
        }
    };

    let own_pid = std::process::id();
    let mut removed = 0;

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        let Some(pid) = owner_pid(&name) else {
            continue;
        };
        if pid == own_pid || pid_alive(pid) {
            continue;
        }

        let path = entry.path();
        tracing::info!("Cleaning up stale mount point {:?} (pid {} is gone)", path, pid);
        if let Err(e) = mounter.unmount(&path, true).await {
            tracing::debug!("Forced unmount of stale {:?}: {}", path, e);
        }
        match std::fs::remove_dir(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::error!("Cannot remove stale mount point {:?}: {}", path, e),
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMounter {
        graceful_failures: Mutex<u32>,
        calls: Mutex<Vec<(PathBuf, bool)>>,
    }

    #[async_trait]
    impl Mounter for RecordingMounter {
        async fn mount(&self, _image: &Path, _target: &Path) -> Result<()> {
            Ok(())
        }

        async fn unmount(&self, target: &Path, force: bool) -> Result<()> {
            self.calls.lock().unwrap().push((target.to_path_buf(), force));
            let mut failures = self.graceful_failures.lock().unwrap();
            if !force && *failures > 0 {
                *failures -= 1;
                return Err(Error::tool("umount", "target is busy"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_mount_point_name() {
        let name = mount_point_name(4242, Path::new("/mnt/cloud/Movie.iso"));
        assert!(name.starts_with("discforge-4242-"));
        assert_eq!(name.len(), "discforge-4242-".len() + 8);
        assert_eq!(owner_pid(&name), Some(4242));
        assert_eq!(owner_pid("lost+found"), None);
    }

    #[test]
    fn test_create_mount_point_is_reusable() {
        let root = tempfile::tempdir().unwrap();
        let image = Path::new("/mnt/cloud/Movie.iso");
        let first = create_mount_point(root.path(), image).unwrap();
        let second = create_mount_point(root.path(), image).unwrap();
        assert_eq!(first, second);
        assert!(second.is_dir());
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_forces_after_graceful_attempts() {
        let root = tempfile::tempdir().unwrap();
        let target = create_mount_point(root.path(), Path::new("/a.iso")).unwrap();
        let mounter = RecordingMounter {
            graceful_failures: Mutex::new(5),
            ..Default::default()
        };

        let start = tokio::time::Instant::now();
        assert!(release_mount_point(&mounter, &target, 3, Duration::from_secs(1)).await);

        let calls = mounter.calls.lock().unwrap();
        assert_eq!(calls.len(), 4);
        assert!(calls[..3].iter().all(|(_, force)| !force));
        assert!(calls[3].1);
        assert_eq!(start.elapsed().as_secs(), 2);
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_cleanup_stale_skips_live_pids() {
        let root = tempfile::tempdir().unwrap();
        let live = root
            .path()
            .join(format!("{MOUNT_PREFIX}{}-deadbeef", std::process::id()));
        // PIDs above the kernel maximum can never be alive.
        let dead = root.path().join(format!("{MOUNT_PREFIX}99999999-deadbeef"));
        let other = root.path().join("unrelated");
        for dir in [&live, &dead, &other] {
            std::fs::create_dir(dir).unwrap();
        }

        let mounter = RecordingMounter::default();
        let removed = cleanup_stale(root.path(), &mounter).await;

        if cfg!(target_os = "linux") {
            assert_eq!(removed, 1);
            assert!(!dead.exists());
        }
        assert!(live.exists());
        assert!(other.exists());
    }
}
