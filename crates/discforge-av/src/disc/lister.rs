//! Disc-title lister adapter and report parser.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use discforge_common::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::command::ToolCommand;

static TITLE_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*index:\s*(\d+)").expect("valid regex"));

static TITLE_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"duration:\s*(\d+):(\d{1,2}):(\d{1,2})(\.\d+)?").expect("valid regex")
});

static TITLE_CHAPTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"chapters:\s*(\d+)").expect("valid regex"));

static LANGUAGE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s+(AUDIO|Audio|PG|SUB|Subtitle)\s*:\s*(.*)$").expect("valid regex")
});

/// One title from the lister report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscTitle {
    pub index: u32,
    pub duration_secs: f64,
    pub chapters: u32,
    pub audio_languages: Vec<String>,
    pub subtitle_languages: Vec<String>,
}

/// Typed adapter over the external disc-title lister.
#[async_trait]
pub trait DiscLister: Send + Sync {
    fn name(&self) -> &'static str;

    /// List the titles of the disc mounted at `disc_root`.
    async fn list_titles(&self, disc_root: &Path) -> Result<Vec<DiscTitle>>;
}

/// `bd_list_titles -l <dir>`.
#[derive(Debug, Clone)]
pub struct BdListTitles {
    program: PathBuf,
    timeout: Duration,
}

impl BdListTitles {
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        Self { program, timeout }
    }
}

#[async_trait]
impl DiscLister for BdListTitles {
    fn name(&self) -> &'static str {
        "bd_list_titles"
    }

    async fn list_titles(&self, disc_root: &Path) -> Result<Vec<DiscTitle>> {
        let output = ToolCommand::new(self.program.clone())
            .arg("-l")
            .arg(disc_root.to_string_lossy())
            .timeout(self.timeout)
            .execute()
            .await?;
        parse_report(&output.stdout)
    }
}

/// Parse the line-oriented lister report.
///
/// Language lines attach to the most recent title line. Unknown lines are
/// ignored. A report without any title line is an error.
pub fn parse_report(report: &str) -> Result<Vec<DiscTitle>> {
    let mut titles: Vec<DiscTitle> = Vec::new();

    for line in report.lines() {
        if let Some(caps) = TITLE_INDEX.captures(line) {
            let index = caps[1]
                .parse()
                .map_err(|e| Error::parse("disc title index", format!("{e}: {line}")))?;
            titles.push(DiscTitle {
                index,
                duration_secs: parse_duration(line).unwrap_or(0.0),
                chapters: TITLE_CHAPTERS
                    .captures(line)
                    .and_then(|c| c[1].parse().ok())
                    .unwrap_or(0),
                ..Default::default()
            });
            continue;
        }

        let Some(caps) = LANGUAGE_LINE.captures(line) else {
            continue;
        };
        let Some(title) = titles.last_mut() else {
            continue;
        };

        let languages: Vec<String> = caps[2]
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();

        match &caps[1] {
            "AUDIO" | "Audio" => title.audio_languages.extend(languages),
            _ => title.subtitle_languages.extend(languages),
        }
    }

    if titles.is_empty() {
        return Err(Error::parse(
            "disc title report",
            "no title lines found",
        ));
    }
    Ok(titles)
}

fn parse_duration(line: &str) -> Option<f64> {
    let caps = TITLE_DURATION.captures(line)?;
    let hours: f64 = caps[1].parse().ok()?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    let fraction: f64 = caps
        .get(4)
        .and_then(|m| format!("0{}", m.as_str()).parse().ok())
        .unwrap_or(0.0);
    Some(hours * 3600.0 + minutes * 60.0 + seconds + fraction)
}

/// Longest title; the first one wins ties.
pub fn select_main_title(titles: &[DiscTitle]) -> Option<&DiscTitle> {
    titles.iter().fold(None, |best: Option<&DiscTitle>, t| match best {
        Some(b) if b.duration_secs >= t.duration_secs => Some(b),
        _ => Some(t),
    })
}
