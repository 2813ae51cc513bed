//! Scan Orchestrator.
//!
//! One scan pass walks the library for placeholders without descriptors and
//! runs the per-file pipeline on a bounded batch of them, strictly one at a
//! time. A second scan started while one is running exits immediately.

pub mod discover;
pub mod lock;
pub mod pipeline;
pub mod preflight;

pub use discover::{discover_pending, find_placeholders};
pub use pipeline::{FilePipeline, ProcessOutcome};
pub use preflight::Preflight;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use discforge_av::{
    BdListTitles, DiscStructureExtractor, FfprobeProber, LanguageCache, LoopMounter,
    MountHeuristic, ProbeExtractor, RemoteMountDetector,
};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::descriptor::TransformSettings;
use crate::failures::FailureCache;
use crate::notifications::NotificationManager;
use crate::upload::UploadDispatcher;

/// Batch and pacing knobs for one scan pass.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub placeholder_extension: String,
    pub batch_size: usize,
    pub item_delay: Duration,
    pub item_timeout: Duration,
    /// How long a finished scan waits for detached notifications.
    pub notify_drain: Duration,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            placeholder_extension: discforge_common::paths::DEFAULT_PLACEHOLDER_EXTENSION.into(),
            batch_size: 10,
            item_delay: Duration::from_secs(5),
            item_timeout: Duration::from_secs(1800),
            notify_drain: Duration::from_secs(10),
        }
    }
}

impl ScanSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            placeholder_extension: config.scan.placeholder_extension.clone(),
            batch_size: config.scan.batch_size,
            item_delay: config.scan.item_delay(),
            item_timeout: config.scan.item_timeout(),
            notify_drain: Duration::from_secs(config.notify.timeout_secs),
        }
    }
}

/// Outcome of one scan pass.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Another scan held the lock; nothing was done.
    pub locked_out: bool,
    pub stale_mounts_removed: usize,
    pub pending: usize,
    /// Pending placeholders at the failure ceiling.
    pub skipped: usize,
    pub processed: Vec<ProcessOutcome>,
    pub failed: Vec<PathBuf>,
}

/// Probe extractor over the configured `ffprobe` and remote-mount markers.
pub fn probe_extractor(config: &Config) -> ProbeExtractor {
    let prober = FfprobeProber::new(
        config.probe.ffprobe_path.clone(),
        Duration::from_secs(config.probe.timeout_secs),
    );
    let remote: Arc<dyn RemoteMountDetector> = if config.probe.check_fs_type {
        Arc::new(MountHeuristic::new(config.probe.remote_markers.clone()))
    } else {
        Arc::new(MountHeuristic::markers_only(config.probe.remote_markers.clone()))
    };
    ProbeExtractor::new(Arc::new(prober), remote, config.probe_settings())
}

pub struct ScanOrchestrator {
    pipeline: FilePipeline,
    failures: FailureCache,
    lock_path: PathBuf,
    settings: ScanSettings,
    preflight: Option<Preflight>,
    notifier: Option<Arc<NotificationManager>>,
    uploader: Option<UploadDispatcher>,
}

impl ScanOrchestrator {
    pub fn new(
        pipeline: FilePipeline,
        failures: FailureCache,
        lock_path: PathBuf,
        settings: ScanSettings,
    ) -> Self {
        Self {
            pipeline,
            failures,
            lock_path,
            settings,
            preflight: None,
            notifier: None,
            uploader: None,
        }
    }

    pub fn with_preflight(mut self, preflight: Preflight) -> Self {
        self.preflight = Some(preflight);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<NotificationManager>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_uploader(mut self, uploader: UploadDispatcher) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// Wire the real external tools from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let probe = probe_extractor(config);

        let tool_timeout = Duration::from_secs(config.disc.mount_timeout_secs);
        let disc = DiscStructureExtractor::new(
            Arc::new(BdListTitles::new(config.disc.lister_path.clone(), tool_timeout)),
            Arc::new(LoopMounter::new(
                config.disc.mount_path.clone(),
                config.disc.umount_path.clone(),
                tool_timeout,
            )),
            Some(LanguageCache::new(
                config.language_cache_dir(),
                Duration::from_secs(config.disc.cache_ttl_hours * 3600),
            )),
            config.disc_settings(),
        );

        let pipeline = FilePipeline::new(
            probe,
            disc,
            config.reconcile_settings(),
            TransformSettings {
                bitrate_anomaly_factor: config.transform.bitrate_anomaly_factor,
            },
            config.scan.descriptor_suffix.clone(),
        );

        let failures = FailureCache::open(&config.failures_db_path(), config.failures.max_retries)
            .context("Failed to open failure cache")?;

        let preflight = Preflight::new(
            vec![
                config.probe.ffprobe_path.clone(),
                config.disc.lister_path.clone(),
                config.disc.mount_path.clone(),
                config.disc.umount_path.clone(),
            ],
            config.scan.min_free_bytes,
        );

        let mut orchestrator = Self::new(
            pipeline,
            failures,
            config.scan_lock_path(),
            ScanSettings::from_config(config),
        )
        .with_preflight(preflight);

        let notifier = NotificationManager::new(config);
        if notifier.has_targets() {
            orchestrator = orchestrator.with_notifier(Arc::new(notifier));
        }
        if config.upload.enabled {
            orchestrator = orchestrator.with_uploader(UploadDispatcher::from_config(config)?);
        }

        Ok(orchestrator)
    }

    pub fn failures(&self) -> &FailureCache {
        &self.failures
    }

    pub fn pipeline(&self) -> &FilePipeline {
        &self.pipeline
    }

    /// Run one scan pass over `root`.
    ///
    /// Only environment problems are returned as errors; per-file failures
    /// go to the failure cache.
    pub async fn scan(&self, root: &Path) -> Result<ScanReport> {
        let Some(_guard) = lock::try_lock(&self.lock_path)? else {
            debug!("Scan lock {:?} is held; a previous scan is still running", self.lock_path);
            return Ok(ScanReport {
                locked_out: true,
                ..Default::default()
            });
        };

        let result = self.run(root).await;

        if let Some(notifier) = &self.notifier {
            notifier.drain(self.settings.notify_drain).await;
        }
        result
    }

    async fn run(&self, root: &Path) -> Result<ScanReport> {
        let mut report = ScanReport::default();

        if let Some(preflight) = &self.preflight {
            if let Err(e) = preflight.run(root) {
                error!("Scan aborted: {}", e);
                return Err(e.into());
            }
        }

        report.stale_mounts_removed = self.pipeline.disc_extractor().cleanup_stale().await;

        let pending = discover_pending(
            root,
            &self.settings.placeholder_extension,
            self.pipeline.descriptor_suffix(),
        );
        report.pending = pending.len();

        let mut batch = Vec::new();
        for placeholder in pending {
            if self.failures.should_skip(&placeholder)? {
                debug!("Skipping {:?}: failure ceiling reached", placeholder);
                report.skipped += 1;
                continue;
            }
            if batch.len() < self.settings.batch_size {
                batch.push(placeholder);
            }
        }

        info!(
            "Scanning {:?}: {} pending, {} at failure ceiling, processing {}",
            root,
            report.pending,
            report.skipped,
            batch.len()
        );

        let total = batch.len();
        for (i, placeholder) in batch.into_iter().enumerate() {
            info!("[{}/{}] {:?}", i + 1, total, placeholder);

            match self.process_item(&placeholder).await {
                Ok(outcome) => {
                    self.after_success(&outcome).await;
                    report.processed.push(outcome);
                }
                Err(e) if e.is_environment() => {
                    error!("Scan aborted while processing {:?}: {}", placeholder, e);
                    return Err(e.into());
                }
                Err(e) => {
                    self.failures.record(&placeholder, &e.to_string())?;
                    report.failed.push(placeholder);
                }
            }

            if i + 1 < total && !self.settings.item_delay.is_zero() {
                tokio::time::sleep(self.settings.item_delay).await;
            }
        }

        info!(
            "Scan finished: {} written, {} failed, {} skipped",
            report.processed.len(),
            report.failed.len(),
            report.skipped
        );
        Ok(report)
    }

    async fn process_item(&self, placeholder: &Path) -> discforge_common::Result<ProcessOutcome> {
        match tokio::time::timeout(self.settings.item_timeout, self.pipeline.process(placeholder))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(discforge_common::Error::timeout(
                "pipeline",
                self.settings.item_timeout,
            )),
        }
    }

    async fn after_success(&self, outcome: &ProcessOutcome) {
        if let Some(notifier) = &self.notifier {
            notifier.notify_descriptor_written(&outcome.descriptor);
        }

        if let Some(uploader) = &self.uploader {
            if uploader.is_artifact(&outcome.descriptor) {
                if let Err(e) = uploader.upload_file(&outcome.descriptor).await {
                    warn!("Descriptor {:?} kept locally; upload failed: {:#}", outcome.descriptor, e);
                }
            }
        }
    }

    /// Run the pipeline for a single placeholder, ignoring the failure
    /// ceiling. Fails if a scan currently holds the lock.
    pub async fn process_one(&self, placeholder: &Path) -> Result<ProcessOutcome> {
        let Some(_guard) = lock::try_lock(&self.lock_path)? else {
            anyhow::bail!("A scan is running (lock {:?} is held)", self.lock_path);
        };

        let result = self.process_item(placeholder).await;
        let outcome = match result {
            Ok(outcome) => {
                self.after_success(&outcome).await;
                Ok(outcome)
            }
            Err(e) => {
                if !e.is_environment() {
                    self.failures.record(placeholder, &e.to_string())?;
                }
                Err(anyhow::Error::from(e)
                    .context(format!("Failed to process {:?}", placeholder)))
            }
        };

        if let Some(notifier) = &self.notifier {
            notifier.drain(self.settings.notify_drain).await;
        }
        outcome
    }
}
