//! Environment checks run once before a scan touches any file.

use std::path::{Path, PathBuf};

use discforge_av::require_tool;
use discforge_common::{Error, Result};
use tracing::debug;

/// Required tools and disk space. Any failure is an environment error.
#[derive(Debug, Clone, Default)]
pub struct Preflight {
    pub tools: Vec<PathBuf>,
    pub min_free_bytes: u64,
}

impl Preflight {
    pub fn new(tools: Vec<PathBuf>, min_free_bytes: u64) -> Self {
        Self {
            tools,
            min_free_bytes,
        }
    }

    pub fn run(&self, root: &Path) -> Result<()> {
        for tool in &self.tools {
            let resolved = require_tool(tool)?;
            debug!("Found {:?} at {:?}", tool, resolved);
        }

        if self.min_free_bytes > 0 {
            if let Some(free) = free_bytes(root)? {
                if free < self.min_free_bytes {
                    return Err(Error::environment(format!(
                        "only {} bytes free under {:?}, need {}",
                        free, root, self.min_free_bytes
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Bytes available to unprivileged writers on the filesystem holding `path`.
#[cfg(unix)]
pub fn free_bytes(path: &Path) -> Result<Option<u64>> {
    let stat = nix::sys::statvfs::statvfs(path).map_err(|e| {
        Error::environment(format!("cannot stat filesystem of {:?}: {}", path, e))
    })?;
    #[allow(clippy::unnecessary_cast)]
    let free = stat.blocks_available() as u64 * stat.fragment_size() as u64;
    Ok(Some(free))
}

#[cfg(not(unix))]
pub fn free_bytes(_path: &Path) -> Result<Option<u64>> {
    Ok(None)
}
