//! Disc Structure Extractor.
//!
//! Mounts a Blu-ray image, runs the title lister against it and reduces the
//! report to the main title's language tracks. Language order is kept as the
//! lister reports it: position `i` in `audio_languages` describes the `i`-th
//! audio stream of the container.

mod cache;
mod lister;
mod mount;

pub use cache::LanguageCache;
pub use lister::{parse_report, select_main_title, BdListTitles, DiscLister, DiscTitle};
pub use mount::{
    cleanup_stale, create_mount_point, mount_point_name, owner_pid, release_mount_point,
    LoopMounter, Mounter, MOUNT_PREFIX,
};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use discforge_common::{DiscProtocol, Result};
use serde::{Deserialize, Serialize};

/// Authoritative title facts from the disc structure.
///
/// The default value (no main title, empty language lists) is what DVDs and
/// failed mounts produce.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscLanguageInfo {
    pub main_title_index: Option<u32>,
    /// Main title duration in seconds, 0 when unknown.
    pub main_title_duration: f64,
    pub audio_languages: Vec<String>,
    pub subtitle_languages: Vec<String>,
    pub chapter_count: u32,
}

impl DiscLanguageInfo {
    pub fn from_title(title: &DiscTitle) -> Self {
        Self {
            main_title_index: Some(title.index),
            main_title_duration: title.duration_secs,
            audio_languages: title.audio_languages.clone(),
            subtitle_languages: title.subtitle_languages.clone(),
            chapter_count: title.chapters,
        }
    }

    pub fn has_audio_languages(&self) -> bool {
        !self.audio_languages.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DiscSettings {
    pub mount_root: PathBuf,
    pub unmount_attempts: u32,
    pub unmount_backoff: Duration,
}

impl Default for DiscSettings {
    fn default() -> Self {
        Self {
            mount_root: std::env::temp_dir().join("discforge-mounts"),
            unmount_attempts: 3,
            unmount_backoff: Duration::from_secs(1),
        }
    }
}

pub struct DiscStructureExtractor {
    lister: Arc<dyn DiscLister>,
    mounter: Arc<dyn Mounter>,
    cache: Option<LanguageCache>,
    settings: DiscSettings,
}

impl DiscStructureExtractor {
    pub fn new(
        lister: Arc<dyn DiscLister>,
        mounter: Arc<dyn Mounter>,
        cache: Option<LanguageCache>,
        settings: DiscSettings,
    ) -> Self {
        Self {
            lister,
            mounter,
            cache,
            settings,
        }
    }

    pub fn mounter(&self) -> &dyn Mounter {
        self.mounter.as_ref()
    }

    pub fn mount_root(&self) -> &Path {
        &self.settings.mount_root
    }

    /// Remove mount points left by dead processes.
    pub async fn cleanup_stale(&self) -> usize {
        cleanup_stale(&self.settings.mount_root, self.mounter.as_ref()).await
    }

    /// Extract language info for `image`.
    ///
    /// DVDs and failed mounts yield the empty default. Lister failures on a
    /// mounted disc are returned as errors. The mount point is always
    /// released before returning; if the future is dropped mid-extraction
    /// the release runs on a background task instead.
    pub async fn extract(&self, image: &Path, protocol: DiscProtocol) -> Result<DiscLanguageInfo> {
        if protocol == DiscProtocol::Dvd {
            return Ok(DiscLanguageInfo::default());
        }

        if let Some(info) = self.cache.as_ref().and_then(|c| c.get(image)) {
            tracing::debug!("Using cached disc languages for {:?}", image);
            return Ok(info);
        }

        let target = match create_mount_point(&self.settings.mount_root, image) {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!("Cannot create mount point for {:?}: {}", image, e);
                return Ok(DiscLanguageInfo::default());
            }
        };

        let guard = MountGuard {
            mounter: self.mounter.clone(),
            target: Some(target.clone()),
            attempts: self.settings.unmount_attempts,
            backoff: self.settings.unmount_backoff,
        };

        if let Err(e) = self.mounter.mount(image, &target).await {
            tracing::warn!(
                "Mounting {:?} failed, continuing without disc languages: {}",
                image,
                e
            );
            guard.release().await;
            return Ok(DiscLanguageInfo::default());
        }

        let listed = self.lister.list_titles(&target).await;
        guard.release().await;
        let titles = listed?;

        let info = select_main_title(&titles)
            .map(DiscLanguageInfo::from_title)
            .unwrap_or_default();
        tracing::info!(
            "Main title {:?} of {:?}: {:.0}s, audio {:?}, subtitles {:?}",
            info.main_title_index,
            image,
            info.main_title_duration,
            info.audio_languages,
            info.subtitle_languages
        );

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(image, &info) {
                tracing::warn!("Cannot write language cache for {:?}: {}", image, e);
            }
        }
        Ok(info)
    }

}

/// Owns a created mount point until it is released.
struct MountGuard {
    mounter: Arc<dyn Mounter>,
    target: Option<PathBuf>,
    attempts: u32,
    backoff: Duration,
}

impl MountGuard {
    async fn release(mut self) {
        if let Some(target) = self.target.take() {
            release_mount_point(self.mounter.as_ref(), &target, self.attempts, self.backoff)
                .await;
        }
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        let Some(target) = self.target.take() else {
            return;
        };
        let mounter = self.mounter.clone();
        let (attempts, backoff) = (self.attempts, self.backoff);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(
                    "Disc extraction cancelled; releasing {:?} in the background",
                    target
                );
                handle.spawn(async move {
                    release_mount_point(mounter.as_ref(), &target, attempts, backoff).await;
                });
            }
            Err(_) => tracing::error!(
                "Leaked mount point {:?}: no runtime left to release it",
                target
            ),
        }
    }
}
