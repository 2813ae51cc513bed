//! Advisory file locks for single-instance scans and serialized uploads.
//!
//! The lock is released when the guard drops, which covers early returns,
//! errors and panics unwinding through the holder.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Held advisory lock.
pub struct LockGuard {
    #[cfg(unix)]
    _lock: nix::fcntl::Flock<File>,
    #[cfg(not(unix))]
    _file: File,
    path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("path", &self.path).finish()
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create lock directory: {:?}", parent))?;
    }
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .with_context(|| format!("Failed to open lock file: {:?}", path))
}

/// Try to take the lock without waiting. `Ok(None)` means another holder
/// has it.
#[cfg(unix)]
pub fn try_lock(path: &Path) -> Result<Option<LockGuard>> {
    use nix::errno::Errno;
    use nix::fcntl::{Flock, FlockArg};

    let file = open_lock_file(path)?;
    match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
        Ok(lock) => Ok(Some(LockGuard {
            _lock: lock,
            path: path.to_path_buf(),
        })),
        Err((_, Errno::EWOULDBLOCK)) => Ok(None),
        Err((_, errno)) => {
            Err(anyhow::anyhow!("Failed to lock {:?}: {}", path, errno))
        }
    }
}

/// Take the lock, waiting for the current holder to release it.
#[cfg(unix)]
pub async fn lock(path: &Path) -> Result<LockGuard> {
    use nix::fcntl::{Flock, FlockArg};

    let file = open_lock_file(path)?;
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        Flock::lock(file, FlockArg::LockExclusive)
            .map(|lock| LockGuard {
                _lock: lock,
                path: owned.clone(),
            })
            .map_err(|(_, errno)| anyhow::anyhow!("Failed to lock {:?}: {}", owned, errno))
    })
    .await
    .context("Lock task panicked")?
}

#[cfg(not(unix))]
pub fn try_lock(path: &Path) -> Result<Option<LockGuard>> {
    Ok(Some(LockGuard {
        _file: open_lock_file(path)?,
        path: path.to_path_buf(),
    }))
}

#[cfg(not(unix))]
pub async fn lock(path: &Path) -> Result<LockGuard> {
    Ok(LockGuard {
        _file: open_lock_file(path)?,
        path: path.to_path_buf(),
    })
}
