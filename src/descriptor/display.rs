//! Human-readable per-stream labels.

use super::hdr::HdrClass;

/// Resolution tier from frame size. Letterboxed encodes are tiered by width.
pub fn resolution_tier(width: u32, height: u32) -> &'static str {
    if height > 1080 || width > 1920 {
        "4K"
    } else if height > 720 || width > 1280 {
        "1080p"
    } else if height > 480 || width > 854 {
        "720p"
    } else if height >= 480 {
        "480p"
    } else {
        "SD"
    }
}

/// e.g. "4K DolbyVision Profile 8.2 HEVC", "1080p H264".
pub fn video_title(width: Option<u32>, height: Option<u32>, hdr: &HdrClass, codec: Option<&str>) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let (Some(w), Some(h)) = (width, height) {
        parts.push(resolution_tier(w, h).to_string());
    }
    if let Some(label) = hdr.label() {
        parts.push(label);
    }
    if let Some(codec) = codec {
        parts.push(codec.to_uppercase());
    }
    parts.join(" ")
}

pub fn channel_layout_word(channels: u32) -> String {
    match channels {
        1 => "Mono".into(),
        2 => "Stereo".into(),
        6 => "5.1".into(),
        8 => "7.1".into(),
        n => format!("{n}ch"),
    }
}

/// Audio codec display name, using the profile to tell DTS variants apart.
pub fn audio_codec_name(codec: &str, profile: Option<&str>) -> String {
    match (codec, profile.unwrap_or("")) {
        ("dts", p) if p.contains("MA") => "DTS-HD MA".into(),
        ("dts", p) if p.contains("HRA") || p.contains("HD") => "DTS-HD HRA".into(),
        ("dts", p) if p.contains("X") => "DTS:X".into(),
        ("eac3", _) => "EAC3".into(),
        ("truehd", _) => "TRUEHD".into(),
        (c, _) if c.starts_with("pcm_") => "PCM".into(),
        (c, _) => c.to_uppercase(),
    }
}

/// e.g. "English TRUEHD 7.1 (Default)".
pub fn audio_title(
    language: &str,
    codec: Option<&str>,
    profile: Option<&str>,
    channels: Option<u32>,
    is_default: bool,
) -> String {
    let mut title = language.to_string();
    if let Some(codec) = codec {
        title.push(' ');
        title.push_str(&audio_codec_name(codec, profile));
    }
    if let Some(channels) = channels.filter(|c| *c > 0) {
        title.push(' ');
        title.push_str(&channel_layout_word(channels));
    }
    if is_default {
        title.push_str(" (Default)");
    }
    title
}

pub fn subtitle_codec_name(codec: &str) -> String {
    match codec {
        "hdmv_pgs_subtitle" => "PGSSUB".into(),
        "dvd_subtitle" => "DVDSUB".into(),
        "subrip" => "SRT".into(),
        c => c.to_uppercase(),
    }
}

/// Script variant for Chinese subtitles, taken from the stream title.
fn chinese_variant(title: &str) -> Option<&'static str> {
    let lower = title.to_lowercase();
    if lower.contains("simplified") || lower.contains("chs") || title.contains('简') {
        Some("Simplified")
    } else if lower.contains("traditional") || lower.contains("cht") || title.contains('繁') {
        Some("Traditional")
    } else {
        None
    }
}

pub fn is_text_subtitle(codec: &str) -> bool {
    matches!(codec, "subrip" | "ass" | "ssa" | "webvtt" | "mov_text" | "text")
}

/// e.g. "English SDH (Default) PGSSUB", "Chinese Simplified PGSSUB".
pub fn subtitle_title(
    language: &str,
    stream_title: Option<&str>,
    hearing_impaired: bool,
    is_default: bool,
    codec: Option<&str>,
) -> String {
    let mut title = language.to_string();
    if let Some(variant) = stream_title.and_then(chinese_variant) {
        title.push(' ');
        title.push_str(variant);
    }
    let sdh = hearing_impaired
        || stream_title
            .map(|t| t.to_uppercase().contains("SDH"))
            .unwrap_or(false);
    if sdh {
        title.push_str(" SDH");
    }
    if is_default {
        title.push_str(" (Default)");
    }
    if let Some(codec) = codec {
        title.push(' ');
        title.push_str(&subtitle_codec_name(codec));
    }
    title
}
