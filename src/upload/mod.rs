//! Upload Dispatcher.
//!
//! Copies generated artifacts next to their remote images, one at a time
//! system-wide. Every copy happens under the upload lock and is followed by
//! a fixed pause before the lock is released; that pause is the only rate
//! limit applied to the remote storage.

mod target;

pub use target::{map_target, matching_type, SEARCH_DEPTH};

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use discforge_db::migrations::Store;
use discforge_db::models::{UploadEntry, UploadStats, UploadStatus};
use discforge_db::pool::{get_conn, init_memory_pool, init_pool, DbPool};
use discforge_db::queries::uploads;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::scanner::lock;

/// Totals for a bulk or retry run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct UploadDispatcher {
    pool: DbPool,
    lock_path: PathBuf,
    interval: Duration,
    file_types: Vec<String>,
    placeholder_extension: String,
}

impl UploadDispatcher {
    pub fn new(
        pool: DbPool,
        lock_path: PathBuf,
        interval: Duration,
        file_types: Vec<String>,
        placeholder_extension: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            lock_path,
            interval,
            file_types,
            placeholder_extension: placeholder_extension.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let pool = init_pool(&config.uploads_db_path(), Store::Uploads)
            .context("Failed to open upload cache")?;
        Ok(Self::new(
            pool,
            config.upload_lock_path(),
            config.upload.interval(),
            config.upload.file_types.clone(),
            config.scan.placeholder_extension.clone(),
        ))
    }

    /// Dispatcher backed by an in-memory cache.
    pub fn in_memory(lock_path: PathBuf, interval: Duration, file_types: Vec<String>) -> Result<Self> {
        Ok(Self::new(
            init_memory_pool(Store::Uploads)?,
            lock_path,
            interval,
            file_types,
            discforge_common::paths::DEFAULT_PLACEHOLDER_EXTENSION,
        ))
    }

    fn key(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    /// Whether `path` has one of the configured artifact suffixes.
    pub fn is_artifact(&self, path: &Path) -> bool {
        path.file_name()
            .map(|n| matching_type(&n.to_string_lossy(), &self.file_types).is_some())
            .unwrap_or(false)
    }

    pub fn map_target(&self, source: &Path) -> Result<PathBuf> {
        map_target(source, &self.placeholder_extension)
    }

    pub fn get(&self, source: &Path) -> Result<Option<UploadEntry>> {
        let conn = get_conn(&self.pool)?;
        Ok(uploads::get(&conn, &Self::key(source))?)
    }

    pub fn stats(&self) -> Result<UploadStats> {
        let conn = get_conn(&self.pool)?;
        Ok(uploads::stats(&conn)?)
    }

    /// Forget `source` so the next bulk run uploads it again.
    pub fn reset(&self, source: &Path) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        Ok(uploads::reset(&conn, &Self::key(source))?)
    }

    pub fn list(&self, status: UploadStatus) -> Result<Vec<UploadEntry>> {
        let conn = get_conn(&self.pool)?;
        Ok(uploads::list_by_status(&conn, status)?)
    }

    /// Copy `source` to `target` under the upload lock and record the result.
    ///
    /// The copy outcome is recorded before the pause; a failed copy is
    /// returned as an error after the pause.
    pub async fn upload(&self, source: &Path, target: &Path) -> Result<()> {
        let guard = lock::lock(&self.lock_path).await?;
        debug!("Holding upload lock {:?}", guard.path());

        let key = Self::key(source);
        {
            let conn = get_conn(&self.pool)?;
            uploads::begin_attempt(&conn, &key, &target.to_string_lossy())?;
        }

        let copied = copy_artifact(source, target).await;

        {
            let conn = get_conn(&self.pool)?;
            match &copied {
                Ok(bytes) => {
                    uploads::mark_success(&conn, &key)?;
                    info!("Uploaded {:?} -> {:?} ({} bytes)", source, target, bytes);
                }
                Err(e) => {
                    uploads::mark_failed(&conn, &key, &format!("{:#}", e))?;
                    warn!("Upload of {:?} to {:?} failed: {:#}", source, target, e);
                }
            }
        }

        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
        drop(guard);

        copied.map(|_| ())
    }

    /// Map and upload one artifact.
    pub async fn upload_file(&self, source: &Path) -> Result<PathBuf> {
        let target = self.map_target(source)?;
        self.upload(source, &target).await?;
        Ok(target)
    }

    /// Upload every artifact under `root` that is not already uploaded.
    pub async fn upload_all(&self, root: &Path) -> Result<UploadReport> {
        let mut report = UploadReport::default();

        let artifacts: Vec<PathBuf> = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| self.is_artifact(p))
            .collect();

        for source in artifacts {
            let done = self
                .get(&source)?
                .is_some_and(|entry| entry.status == UploadStatus::Success);
            if done {
                report.skipped += 1;
                continue;
            }

            match self.upload_file(&source).await {
                Ok(_) => report.uploaded += 1,
                Err(e) => {
                    debug!("Bulk upload of {:?} failed: {:#}", source, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Bulk upload under {:?}: {} uploaded, {} already done, {} failed",
            root, report.uploaded, report.skipped, report.failed
        );
        Ok(report)
    }

    /// Re-run every failed upload against its recorded target.
    pub async fn retry_failed(&self) -> Result<UploadReport> {
        let mut report = UploadReport::default();

        for entry in self.list(UploadStatus::Failed)? {
            let source = PathBuf::from(&entry.source_path);
            if !source.exists() {
                warn!("Skipping retry of {:?}: source no longer exists", source);
                report.skipped += 1;
                continue;
            }
            match self
                .upload(&source, Path::new(&entry.target_path))
                .await
            {
                Ok(()) => report.uploaded += 1,
                Err(_) => report.failed += 1,
            }
        }

        Ok(report)
    }
}

async fn copy_artifact(source: &Path, target: &Path) -> Result<u64> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    tokio::fs::copy(source, target)
        .await
        .with_context(|| format!("Failed to copy {:?} to {:?}", source, target))
}
