//! Shared test harness for integration tests.
//!
//! Provides [`Harness`], a scratch library (placeholders plus fake "remote"
//! images) with a state directory, and fake external tools injected through
//! the `Prober`, `DiscLister` and `Mounter` traits.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use discforge::descriptor::TransformSettings;
use discforge::failures::FailureCache;
use discforge::scanner::{FilePipeline, ScanOrchestrator, ScanSettings};
use discforge_av::disc::parse_report;
use discforge_av::{
    BackoffSchedule, DiscLister, DiscSettings, DiscStructureExtractor, DiscTitle, Mounter,
    ProbeExtractor, ProbeResult, ProbeSettings, Prober, ReconcileSettings, RemoteMountDetector,
};
use discforge_common::{DiscProtocol, Error, Result};

/// Lister report for the fixture disc: the 1:31:40 main title carries two
/// audio and three subtitle languages.
pub const LISTER_REPORT: &str = "\
index:  1 duration: 00:02:10.00 chapters:  1 angles:  1 clips:  1 (playlist: 00001.mpls) V:1 A:1 PG:0 IG:0
\t AUDIO: eng
index:  2 duration: 01:31:40.00 chapters: 24 angles:  1 clips:  1 (playlist: 00800.mpls) V:1 A:2 PG:3 IG:0
\t AUDIO: eng fra
\t PG   : eng fra chi
";

/// Main title duration of [`LISTER_REPORT`] in seconds.
pub const MAIN_TITLE_SECS: f64 = 5500.0;

/// Parsed `ffprobe` output of a UHD Blu-ray with a Dolby Vision 8.2 stream.
pub fn probe_fixture() -> ProbeResult {
    serde_json::from_str(include_str!("../fixtures/bluray_probe.json"))
        .expect("fixture parses")
}

/// Prober that fails a scripted number of times per protocol.
///
/// Images whose file name contains one of `broken` always fail.
pub struct ScriptedProber {
    remaining: Mutex<Vec<(DiscProtocol, u32)>>,
    broken: Vec<String>,
    calls: Mutex<Vec<(PathBuf, DiscProtocol)>>,
}

impl ScriptedProber {
    pub fn new(bluray_failures: u32, dvd_failures: u32) -> Self {
        Self {
            remaining: Mutex::new(vec![
                (DiscProtocol::Bluray, bluray_failures),
                (DiscProtocol::Dvd, dvd_failures),
            ]),
            broken: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn healthy() -> Self {
        Self::new(0, 0)
    }

    pub fn broken_for(fragments: &[&str]) -> Self {
        Self {
            broken: fragments.iter().map(|s| s.to_string()).collect(),
            ..Self::healthy()
        }
    }

    pub fn calls(&self) -> Vec<(PathBuf, DiscProtocol)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn probe(&self, image: &Path, protocol: DiscProtocol) -> Result<ProbeResult> {
        self.calls
            .lock()
            .unwrap()
            .push((image.to_path_buf(), protocol));

        let name = image.to_string_lossy();
        if self.broken.iter().any(|b| name.contains(b.as_str())) {
            return Err(Error::tool("scripted", "exited with status 1"));
        }

        let mut remaining = self.remaining.lock().unwrap();
        if let Some(entry) = remaining.iter_mut().find(|(p, _)| *p == protocol) {
            if entry.1 > 0 {
                entry.1 -= 1;
                return Err(Error::timeout("scripted", Duration::from_secs(600)));
            }
        }
        Ok(probe_fixture())
    }
}

/// Lister returning a fixed report.
pub struct FixtureLister(pub &'static str);

#[async_trait]
impl DiscLister for FixtureLister {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn list_titles(&self, _disc_root: &Path) -> Result<Vec<DiscTitle>> {
        parse_report(self.0)
    }
}

/// Mounter that records calls and never touches the system.
#[derive(Default)]
pub struct FakeMounter {
    pub mounts: Mutex<Vec<PathBuf>>,
    pub unmounts: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl Mounter for FakeMounter {
    async fn mount(&self, image: &Path, _target: &Path) -> Result<()> {
        self.mounts.lock().unwrap().push(image.to_path_buf());
        Ok(())
    }

    async fn unmount(&self, target: &Path, _force: bool) -> Result<()> {
        self.unmounts.lock().unwrap().push(target.to_path_buf());
        Ok(())
    }
}

/// Scratch library with a `library/` tree of placeholders, a `remote/`
/// directory standing in for cloud storage and a `state/` directory.
pub struct Harness {
    pub dir: TempDir,
    pub root: PathBuf,
    pub remote: PathBuf,
    pub state: PathBuf,
    pub mounter: Arc<FakeMounter>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("library");
        let remote = dir.path().join("remote");
        let state = dir.path().join("state");
        for d in [&root, &remote, &state] {
            std::fs::create_dir_all(d).expect("create dir");
        }
        Self {
            dir,
            root,
            remote,
            state,
            mounter: Arc::new(FakeMounter::default()),
        }
    }

    /// Create `library/<title>/<title>.strm` pointing at `remote/<image>`,
    /// and the image itself.
    pub fn add_title(&self, title: &str, image: &str) -> PathBuf {
        let placeholder = self.add_placeholder(title, image);
        std::fs::write(self.remote.join(image), b"not really an iso").expect("write image");
        placeholder
    }

    /// Like [`Harness::add_title`] but without creating the image.
    pub fn add_placeholder(&self, title: &str, image: &str) -> PathBuf {
        let dir = self.root.join(title);
        std::fs::create_dir_all(&dir).expect("create title dir");
        let placeholder = dir.join(format!("{}.strm", title));
        std::fs::write(
            &placeholder,
            format!("{}\r\n", self.remote.join(image).display()),
        )
        .expect("write placeholder");
        placeholder
    }

    pub fn descriptor_for(&self, placeholder: &Path) -> PathBuf {
        discforge_common::paths::descriptor_path(placeholder, "-mediainfo.json")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.state.join("scan.lock")
    }

    pub fn pipeline_with(
        &self,
        prober: Arc<dyn Prober>,
        remote: Arc<dyn RemoteMountDetector>,
        missing_image_wait: Duration,
    ) -> FilePipeline {
        let probe = ProbeExtractor::new(
            prober,
            remote,
            ProbeSettings {
                local: BackoffSchedule::immediate(3),
                remote: BackoffSchedule::immediate(3),
                missing_image_wait,
            },
        );
        let disc = DiscStructureExtractor::new(
            Arc::new(FixtureLister(LISTER_REPORT)),
            self.mounter.clone(),
            None,
            DiscSettings {
                mount_root: self.state.join("mounts"),
                unmount_attempts: 3,
                unmount_backoff: Duration::ZERO,
            },
        );
        FilePipeline::new(
            probe,
            disc,
            ReconcileSettings::default(),
            TransformSettings::default(),
            "-mediainfo.json",
        )
    }

    pub fn pipeline(&self, prober: Arc<dyn Prober>) -> FilePipeline {
        self.pipeline_with(prober, Arc::new(|_: &Path| false), Duration::ZERO)
    }

    pub fn settings(&self) -> ScanSettings {
        ScanSettings {
            placeholder_extension: "strm".into(),
            batch_size: 10,
            item_delay: Duration::ZERO,
            item_timeout: Duration::from_secs(60),
            notify_drain: Duration::from_secs(5),
        }
    }

    pub fn orchestrator(&self, prober: Arc<dyn Prober>, failures: FailureCache) -> ScanOrchestrator {
        ScanOrchestrator::new(self.pipeline(prober), failures, self.lock_path(), self.settings())
    }
}
