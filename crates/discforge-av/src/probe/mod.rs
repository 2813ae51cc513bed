//! Probe Extractor.
//!
//! Wraps a [`Prober`] with visibility checks, the protocol-aware backoff
//! schedule and the automatic protocol fallback.

mod ffprobe;
pub mod types;

pub use ffprobe::{input_args, parse_output, FfprobeProber};
pub use types::{
    parse_frame_rate, ProbeChapter, ProbeDisposition, ProbeFormat, ProbeResult, ProbeSideData,
    ProbeStream, ProbeTags,
};

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use discforge_common::{DiscProtocol, Error, Result};

use crate::locate::ensure_visible;
use crate::remote::RemoteMountDetector;
use crate::retry::{retry_with_backoff, BackoffSchedule};

/// Typed adapter over an external container prober.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Short tool name for logs.
    fn name(&self) -> &'static str;

    /// Probe `image` through `protocol`. The implementation owns its hard
    /// timeout.
    async fn probe(&self, image: &Path, protocol: DiscProtocol) -> Result<ProbeResult>;
}

/// Retry and fallback tunables for the extractor.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub local: BackoffSchedule,
    pub remote: BackoffSchedule,
    pub missing_image_wait: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            local: BackoffSchedule::from_secs(3, &[30, 20, 10]),
            remote: BackoffSchedule::from_secs(3, &[60, 30, 15]),
            missing_image_wait: Duration::from_secs(10),
        }
    }
}

/// Successful extraction.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub result: ProbeResult,
    /// Protocol whose output was accepted.
    pub protocol: DiscProtocol,
    /// Total prober invocations across both protocols.
    pub attempts: u32,
}

impl ProbeOutcome {
    pub fn used_fallback(&self, requested: DiscProtocol) -> bool {
        self.protocol != requested
    }
}

/// Retrying, protocol-falling-back probe driver.
pub struct ProbeExtractor {
    prober: Arc<dyn Prober>,
    remote: Arc<dyn RemoteMountDetector>,
    settings: ProbeSettings,
}

impl ProbeExtractor {
    pub fn new(
        prober: Arc<dyn Prober>,
        remote: Arc<dyn RemoteMountDetector>,
        settings: ProbeSettings,
    ) -> Self {
        Self {
            prober,
            remote,
            settings,
        }
    }

    fn schedule(&self, is_remote: bool) -> &BackoffSchedule {
        if is_remote {
            &self.settings.remote
        } else {
            &self.settings.local
        }
    }

    /// Probe `image`, first with `primary`, then with the other protocol.
    ///
    /// An attempt fails on timeout, non-zero exit, unparseable output or an
    /// empty stream list. The error of the last fallback attempt is returned
    /// once both protocols are exhausted. Environment errors (a missing
    /// prober) skip the fallback and are returned unchanged.
    pub async fn extract(&self, image: &Path, primary: DiscProtocol) -> Result<ProbeOutcome> {
        let is_remote = self.remote.is_remote_mount(image);
        ensure_visible(image, is_remote, self.settings.missing_image_wait).await?;

        let schedule = self.schedule(is_remote);
        let attempts = AtomicU32::new(0);

        match self.run(image, primary, schedule, &attempts).await {
            Ok(result) => {
                return Ok(ProbeOutcome {
                    result,
                    protocol: primary,
                    attempts: attempts.load(Ordering::Relaxed),
                })
            }
            Err(e) if e.is_environment() => return Err(e),
            Err(e) => {
                let fallback = primary.other();
                let pause = schedule.delay_after(schedule.attempts().saturating_sub(1));
                tracing::warn!(
                    "{} exhausted for {:?} via {} ({}); falling back to {} in {:?}",
                    self.prober.name(),
                    image,
                    primary,
                    e,
                    fallback,
                    pause
                );
                if !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }
            }
        }

        let fallback = primary.other();
        let result = self
            .run(image, fallback, schedule, &attempts)
            .await
            .map_err(|e| {
                if e.is_environment() {
                    return e;
                }
                Error::Probe(format!(
                    "{} failed for {} with both {} and {}: {}",
                    self.prober.name(),
                    image.display(),
                    primary,
                    fallback,
                    e
                ))
            })?;

        tracing::info!(
            "Probe of {:?} succeeded with fallback protocol {}",
            image,
            fallback
        );
        Ok(ProbeOutcome {
            result,
            protocol: fallback,
            attempts: attempts.load(Ordering::Relaxed),
        })
    }

    async fn run(
        &self,
        image: &Path,
        protocol: DiscProtocol,
        schedule: &BackoffSchedule,
        attempts: &AtomicU32,
    ) -> Result<ProbeResult> {
        let label = format!("{} ({})", self.prober.name(), protocol);
        retry_with_backoff(schedule, &label, |_| async move {
            attempts.fetch_add(1, Ordering::Relaxed);
            let result = self.prober.probe(image, protocol).await?;
            if result.streams.is_empty() {
                return Err(Error::Probe(format!(
                    "no streams reported for {} via {}",
                    image.display(),
                    protocol
                )));
            }
            Ok(result)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Fails a fixed number of times per protocol, then returns one stream.
    struct ScriptedProber {
        failures: Mutex<Vec<(DiscProtocol, u32)>>,
        calls: Mutex<Vec<DiscProtocol>>,
    }

    impl ScriptedProber {
        fn new(bluray_failures: u32, dvd_failures: u32) -> Self {
            Self {
                failures: Mutex::new(vec![
                    (DiscProtocol::Bluray, bluray_failures),
                    (DiscProtocol::Dvd, dvd_failures),
                ]),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Prober for ScriptedProber {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn probe(&self, _image: &Path, protocol: DiscProtocol) -> Result<ProbeResult> {
            self.calls.lock().unwrap().push(protocol);
            let mut failures = self.failures.lock().unwrap();
            let entry = failures.iter_mut().find(|(p, _)| *p == protocol).unwrap();
            if entry.1 > 0 {
                entry.1 -= 1;
                return Err(Error::tool("scripted", "exited with status 1"));
            }
            Ok(ProbeResult {
                streams: vec![ProbeStream {
                    codec_type: Some("video".into()),
                    ..Default::default()
                }],
                ..Default::default()
            })
        }
    }

    fn extractor(prober: Arc<ScriptedProber>, remote: bool) -> ProbeExtractor {
        ProbeExtractor::new(
            prober,
            Arc::new(move |_: &Path| remote),
            ProbeSettings::default(),
        )
    }

    fn image() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("Movie.iso");
        std::fs::write(&image, b"iso").unwrap();
        (dir, image)
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_success_first_try() {
        let (_dir, image) = image();
        let prober = Arc::new(ScriptedProber::new(0, 0));
        let start = tokio::time::Instant::now();

        let outcome = extractor(prober.clone(), false)
            .extract(&image, DiscProtocol::Bluray)
            .await
            .unwrap();

        assert_eq!(outcome.protocol, DiscProtocol::Bluray);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(start.elapsed().as_secs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_succeeds_on_second_attempt() {
        let (_dir, image) = image();
        let prober = Arc::new(ScriptedProber::new(3, 1));
        let start = tokio::time::Instant::now();

        let outcome = extractor(prober.clone(), false)
            .extract(&image, DiscProtocol::Bluray)
            .await
            .unwrap();

        assert_eq!(outcome.protocol, DiscProtocol::Dvd);
        assert!(outcome.used_fallback(DiscProtocol::Bluray));
        assert_eq!(outcome.attempts, 5);
        assert_eq!(
            *prober.calls.lock().unwrap(),
            vec![
                DiscProtocol::Bluray,
                DiscProtocol::Bluray,
                DiscProtocol::Bluray,
                DiscProtocol::Dvd,
                DiscProtocol::Dvd,
            ]
        );
        // 30 + 20 between primary attempts, 10 before fallback, 30 before the
        // second fallback attempt.
        assert_eq!(start.elapsed().as_secs(), 90);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_schedule_used_for_remote_paths() {
        let (_dir, image) = image();
        let prober = Arc::new(ScriptedProber::new(1, 0));
        let start = tokio::time::Instant::now();

        let outcome = extractor(prober, true)
            .extract(&image, DiscProtocol::Bluray)
            .await
            .unwrap();

        assert_eq!(outcome.protocol, DiscProtocol::Bluray);
        assert_eq!(start.elapsed().as_secs(), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_protocols_exhausted() {
        let (_dir, image) = image();
        let prober = Arc::new(ScriptedProber::new(10, 10));

        let err = extractor(prober.clone(), false)
            .extract(&image, DiscProtocol::Dvd)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Probe(_)));
        assert_eq!(prober.calls.lock().unwrap().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_prober_fails_fast_without_fallback() {
        struct MissingProber {
            calls: AtomicU32,
        }

        #[async_trait]
        impl Prober for MissingProber {
            fn name(&self) -> &'static str {
                "ffprobe"
            }
            async fn probe(&self, _: &Path, _: DiscProtocol) -> Result<ProbeResult> {
                self.calls.fetch_add(1, Ordering::Relaxed);
                Err(Error::tool_not_found("ffprobe"))
            }
        }

        let (_dir, image) = image();
        let prober = Arc::new(MissingProber {
            calls: AtomicU32::new(0),
        });
        let extractor = ProbeExtractor::new(
            prober.clone(),
            Arc::new(|_: &Path| false),
            ProbeSettings::default(),
        );
        let start = tokio::time::Instant::now();

        let err = extractor
            .extract(&image, DiscProtocol::Bluray)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ToolNotFound { .. }));
        assert!(err.is_environment());
        assert_eq!(prober.calls.load(Ordering::Relaxed), 1);
        assert_eq!(start.elapsed().as_secs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_streams_is_a_failed_attempt() {
        struct EmptyProber;

        #[async_trait]
        impl Prober for EmptyProber {
            fn name(&self) -> &'static str {
                "empty"
            }
            async fn probe(&self, _: &Path, _: DiscProtocol) -> Result<ProbeResult> {
                Ok(ProbeResult::default())
            }
        }

        let (_dir, image) = image();
        let extractor = ProbeExtractor::new(
            Arc::new(EmptyProber),
            Arc::new(|_: &Path| false),
            ProbeSettings::default(),
        );
        assert!(extractor.extract(&image, DiscProtocol::Bluray).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_local_image_is_not_probed() {
        let dir = tempfile::tempdir().unwrap();
        let prober = Arc::new(ScriptedProber::new(0, 0));

        let err = extractor(prober.clone(), false)
            .extract(&dir.path().join("gone.iso"), DiscProtocol::Bluray)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotVisible(_)));
        assert!(prober.calls.lock().unwrap().is_empty());
    }
}
