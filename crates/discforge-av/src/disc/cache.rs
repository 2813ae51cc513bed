//! On-disk cache of disc language info, keyed by image path hash.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use discforge_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::DiscLanguageInfo;

#[derive(Debug, Serialize, Deserialize)]
struct CachedEntry {
    cached_at: i64,
    image: String,
    info: DiscLanguageInfo,
}

/// JSON files at `<dir>/<sha256(image path)>.json`.
#[derive(Debug, Clone)]
pub struct LanguageCache {
    dir: PathBuf,
    ttl: Duration,
}

impl LanguageCache {
    pub fn new(dir: PathBuf, ttl: Duration) -> Self {
        Self { dir, ttl }
    }

    pub fn entry_path(&self, image: &Path) -> PathBuf {
        let digest = Sha256::digest(image.to_string_lossy().as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    /// Fresh, parseable entry for `image`, if any.
    pub fn get(&self, image: &Path) -> Option<DiscLanguageInfo> {
        let path = self.entry_path(image);
        let content = std::fs::read_to_string(&path).ok()?;
        let entry: CachedEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Ignoring unparseable language cache {:?}: {}", path, e);
                return None;
            }
        };

        let age = chrono::Utc::now().timestamp() - entry.cached_at;
        if age < 0 || age as u64 > self.ttl.as_secs() {
            tracing::debug!("Language cache for {:?} is stale ({}s old)", image, age);
            return None;
        }
        Some(entry.info)
    }

    /// Store `info` for `image`, replacing any previous entry.
    pub fn put(&self, image: &Path, info: &DiscLanguageInfo) -> Result<()> {
        self.put_at(image, info, chrono::Utc::now().timestamp())
    }

    fn put_at(&self, image: &Path, info: &DiscLanguageInfo, cached_at: i64) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let entry = CachedEntry {
            cached_at,
            image: image.to_string_lossy().to_string(),
            info: info.clone(),
        };
        let path = self.entry_path(image);

        let mut tmp = tempfile::Builder::new()
            .prefix(".languages-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;
        tmp.write_all(&serde_json::to_vec_pretty(&entry)?)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}
