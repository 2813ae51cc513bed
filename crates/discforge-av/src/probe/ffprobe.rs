//! ffprobe-backed [`Prober`].
//!
//! Shells out to `ffprobe -v error -print_format json -show_format
//! -show_streams -show_chapters`, addressing the image through the disc
//! protocol demuxer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use discforge_common::{DiscProtocol, Error, Result};

use super::types::ProbeResult;
use super::Prober;
use crate::command::ToolCommand;

/// A prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_path: PathBuf,
    timeout: Duration,
}

impl FfprobeProber {
    pub fn new(ffprobe_path: PathBuf, timeout: Duration) -> Self {
        Self {
            ffprobe_path,
            timeout,
        }
    }

    /// Create a prober that finds ffprobe on `PATH`.
    pub fn from_path(timeout: Duration) -> Option<Self> {
        which::which("ffprobe")
            .ok()
            .map(|p| Self::new(p, timeout))
    }

    fn command(&self, image: &Path, protocol: DiscProtocol) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.ffprobe_path.clone());
        cmd.args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
            "-show_chapters",
        ]);
        cmd.args(input_args(image, protocol));
        cmd.timeout(self.timeout);
        cmd
    }
}

/// Input arguments addressing `image` through `protocol`.
pub fn input_args(image: &Path, protocol: DiscProtocol) -> Vec<String> {
    let image = image.to_string_lossy();
    match protocol {
        DiscProtocol::Bluray => vec![format!("bluray:{image}")],
        DiscProtocol::Dvd => vec!["-f".into(), "dvdvideo".into(), image.into_owned()],
    }
}

/// Parse ffprobe's JSON output.
pub fn parse_output(stdout: &str) -> Result<ProbeResult> {
    if stdout.trim().is_empty() {
        return Err(Error::Probe("ffprobe produced no output".into()));
    }
    serde_json::from_str(stdout).map_err(|e| Error::Probe(format!("ffprobe JSON parse error: {e}")))
}

#[async_trait]
impl Prober for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    async fn probe(&self, image: &Path, protocol: DiscProtocol) -> Result<ProbeResult> {
        let output = self.command(image, protocol).execute().await?;
        parse_output(&output.stdout)
    }
}
