//! Metadata Transformer: raw probe facts plus disc languages into a
//! [`MediaDescriptor`].
//!
//! Every derivation (HDR classification, bitrate reconstruction, labels) is a
//! pure function in its own module; [`build_descriptor`] only wires them.

pub mod bitrate;
pub mod display;
pub mod hdr;
pub mod language;
mod types;
mod write;

pub use types::*;
pub use write::{read_descriptor, write_descriptor};

use std::path::Path;

use discforge_av::probe::{ProbeResult, ProbeStream};
use discforge_av::DiscLanguageInfo;
use discforge_common::{DiscProtocol, Error, Result};

use bitrate::VideoShare;
use hdr::HdrClass;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformSettings {
    pub bitrate_anomaly_factor: f64,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            bitrate_anomaly_factor: 1.5,
        }
    }
}

/// Everything the transformer needs for one image.
#[derive(Debug, Clone, Copy)]
pub struct TransformInput<'a> {
    pub probe: &'a ProbeResult,
    pub disc: &'a DiscLanguageInfo,
    pub image: &'a Path,
    /// Image size in bytes; the prober's format size is used when absent.
    pub file_size: Option<u64>,
    pub protocol: DiscProtocol,
    /// Reconciled runtime in seconds.
    pub duration_secs: f64,
}

/// A kept stream together with its type-relative position.
struct Selected<'a> {
    stream: &'a ProbeStream,
    kind: StreamType,
    type_index: usize,
}

fn select_streams<'a>(probe: &'a ProbeResult, disc: &DiscLanguageInfo, strict: bool) -> Vec<Selected<'a>> {
    let (mut audio, mut subtitle) = (0usize, 0usize);
    let mut selected = Vec::new();

    for stream in &probe.streams {
        let Some(kind) = stream.codec_type.as_deref().and_then(StreamType::from_codec_type) else {
            continue;
        };
        let (type_index, limit) = match kind {
            StreamType::Video => (0, None),
            StreamType::Audio => {
                audio += 1;
                (audio - 1, Some(disc.audio_languages.len()))
            }
            StreamType::Subtitle => {
                subtitle += 1;
                (subtitle - 1, Some(disc.subtitle_languages.len()))
            }
        };

        if strict && limit.is_some_and(|limit| type_index >= limit) {
            tracing::debug!(
                "Dropping {:?} stream #{} (no disc language at position {})",
                kind,
                stream.index,
                type_index
            );
            continue;
        }
        selected.push(Selected {
            stream,
            kind,
            type_index,
        });
    }
    selected
}

/// Build the descriptor for one probed image.
///
/// Fails on input that cannot produce a meaningful descriptor (no streams at
/// all, or an unusable duration). With strict filtering an empty stream list
/// is only logged.
pub fn build_descriptor(input: &TransformInput<'_>, settings: &TransformSettings) -> Result<MediaDescriptor> {
    let probe = input.probe;
    if probe.streams.is_empty() {
        return Err(Error::invalid_input(format!(
            "probe result for {} has no streams",
            input.image.display()
        )));
    }
    if !input.duration_secs.is_finite() || input.duration_secs < 0.0 {
        return Err(Error::invalid_input(format!(
            "invalid duration {} for {}",
            input.duration_secs,
            input.image.display()
        )));
    }

    let strict = input.protocol == DiscProtocol::Bluray && input.disc.has_audio_languages();
    let selected = select_streams(probe, input.disc, strict);

    if selected.is_empty() {
        tracing::warn!(
            "No streams left for {} after {} filtering",
            input.image.display(),
            if strict { "strict" } else { "stream" }
        );
    }

    let videos: Vec<&ProbeStream> = selected
        .iter()
        .filter(|s| s.kind == StreamType::Video)
        .map(|s| s.stream)
        .collect();
    let hdr_classes = hdr::classify_video_streams(&videos);

    let size = input.file_size.or_else(|| probe.format.size());
    let total_bitrate = bitrate::total_bitrate(
        probe.format.bit_rate(),
        size.unwrap_or(0),
        input.duration_secs,
        settings.bitrate_anomaly_factor,
    );
    let other_bitrate: u64 = selected
        .iter()
        .filter(|s| s.kind != StreamType::Video)
        .filter_map(|s| s.stream.bit_rate())
        .sum();
    let shares: Vec<VideoShare> = videos
        .iter()
        .map(|v| VideoShare {
            width: v.width.unwrap_or(0),
            height: v.height.unwrap_or(0),
            frame_rate: v.frame_rate().unwrap_or(0.0),
            reported: v.bit_rate(),
        })
        .collect();
    let video_bitrates = bitrate::allocate_video_bitrates(
        &shares,
        total_bitrate,
        other_bitrate,
        settings.bitrate_anomaly_factor,
    );

    let mut media_streams = Vec::with_capacity(selected.len());
    let mut video_pos = 0usize;
    for (index, sel) in selected.iter().enumerate() {
        let mut out = base_stream(index as u32, sel);
        match sel.kind {
            StreamType::Video => {
                let class = hdr_classes.get(video_pos).copied().unwrap_or(HdrClass::Sdr);
                fill_video(&mut out, sel.stream, &class);
                out.bit_rate = video_bitrates.get(video_pos).copied().flatten();
                video_pos += 1;
            }
            StreamType::Audio => {
                let language =
                    language::resolve_language(&input.disc.audio_languages, sel.type_index, sel.stream.language());
                fill_audio(&mut out, sel.stream, language);
            }
            StreamType::Subtitle => {
                let language = language::resolve_language(
                    &input.disc.subtitle_languages,
                    sel.type_index,
                    sel.stream.language(),
                );
                fill_subtitle(&mut out, sel.stream, language);
            }
        }
        media_streams.push(out);
    }

    let chapters = probe
        .chapters
        .iter()
        .enumerate()
        .map(|(i, ch)| ChapterInfo {
            start_position_ticks: secs_to_ticks(ch.start_secs()),
            name: ch
                .tags
                .title
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| format!("Chapter {:02}", i + 1)),
        })
        .collect();

    Ok(MediaDescriptor {
        media_source_info: MediaSourceInfo {
            protocol: "File".to_string(),
            video_type: input.protocol.video_type().to_string(),
            path: input.image.to_string_lossy().to_string(),
            container: probe.format.format_name.clone(),
            size,
            run_time_ticks: secs_to_ticks(input.duration_secs),
            bitrate: total_bitrate,
            media_streams,
        },
        chapters,
    })
}

fn base_stream(index: u32, sel: &Selected<'_>) -> MediaStream {
    let s = sel.stream;
    let mut out = MediaStream::new(index, sel.kind);
    out.codec = s.codec_name.clone();
    out.codec_tag = s.codec_tag_string.clone().filter(|t| !t.starts_with('['));
    out.title = s.tags.title.clone();
    out.is_default = s.disposition.default == 1;
    out.is_forced = s.disposition.forced == 1;
    out.is_hearing_impaired = s.disposition.hearing_impaired == 1;
    out.bit_rate = s.bit_rate();
    out.profile = s.profile.clone();
    out
}

fn fill_video(out: &mut MediaStream, s: &ProbeStream, class: &HdrClass) {
    out.width = s.width;
    out.height = s.height;
    out.average_frame_rate = s.avg_frame_rate.as_deref().and_then(discforge_av::probe::parse_frame_rate);
    out.real_frame_rate = s.r_frame_rate.as_deref().and_then(discforge_av::probe::parse_frame_rate);
    out.bit_depth = s.bit_depth();
    out.pixel_format = s.pix_fmt.clone();
    out.level = s.level;
    out.color_transfer = s.color_transfer.clone();
    out.color_primaries = s.color_primaries.clone();
    out.color_space = s.color_space.clone();
    out.video_range = Some(class.video_range().to_string());
    out.extended_video_type = Some(class.extended_type().to_string());
    out.extended_video_sub_type = class.sub_type();
    out.extended_video_sub_type_description = class.label();
    out.display_title = Some(display::video_title(
        s.width,
        s.height,
        class,
        s.codec_name.as_deref(),
    ));
}

fn fill_audio(out: &mut MediaStream, s: &ProbeStream, language: String) {
    let display_language = language::display_name(&language);
    out.channels = s.channels;
    out.channel_layout = s.channel_layout.clone();
    out.sample_rate = s.sample_rate();
    out.display_title = Some(display::audio_title(
        &display_language,
        s.codec_name.as_deref(),
        s.profile.as_deref(),
        s.channels,
        out.is_default,
    ));
    out.display_language = Some(display_language);
    out.language = Some(language);
}

fn fill_subtitle(out: &mut MediaStream, s: &ProbeStream, language: String) {
    let display_language = language::display_name(&language);
    out.is_text_subtitle_stream = s
        .codec_name
        .as_deref()
        .map(display::is_text_subtitle)
        .unwrap_or(false);
    out.display_title = Some(display::subtitle_title(
        &display_language,
        s.tags.title.as_deref(),
        out.is_hearing_impaired,
        out.is_default,
        s.codec_name.as_deref(),
    ));
    out.display_language = Some(display_language);
    out.language = Some(language);
}
