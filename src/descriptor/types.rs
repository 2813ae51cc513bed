//! Media descriptor DTOs, serialized in the media server's PascalCase shape.

use serde::{Deserialize, Serialize};

/// 100ns ticks per second.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

pub fn secs_to_ticks(secs: f64) -> i64 {
    (secs * TICKS_PER_SECOND as f64).round() as i64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaDescriptor {
    pub media_source_info: MediaSourceInfo,
    #[serde(default)]
    pub chapters: Vec<ChapterInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaSourceInfo {
    pub protocol: String,
    pub video_type: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub run_time_ticks: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
    pub media_streams: Vec<MediaStream>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChapterInfo {
    pub start_position_ticks: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamType {
    Video,
    Audio,
    Subtitle,
}

impl StreamType {
    pub fn from_codec_type(codec_type: &str) -> Option<Self> {
        match codec_type {
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            "subtitle" => Some(Self::Subtitle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaStream {
    pub index: u32,
    #[serde(rename = "Type")]
    pub stream_type: StreamType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_title: Option<String>,
    pub is_default: bool,
    pub is_forced: bool,
    pub is_hearing_impaired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_rate: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_frame_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_frame_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pixel_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_transfer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_primaries: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_space: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_video_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_video_sub_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_video_sub_type_description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_layout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,

    pub is_external: bool,
    pub is_text_subtitle_stream: bool,
}

impl MediaStream {
    pub fn new(index: u32, stream_type: StreamType) -> Self {
        Self {
            index,
            stream_type,
            codec: None,
            codec_tag: None,
            language: None,
            display_language: None,
            title: None,
            display_title: None,
            is_default: false,
            is_forced: false,
            is_hearing_impaired: false,
            bit_rate: None,
            width: None,
            height: None,
            average_frame_rate: None,
            real_frame_rate: None,
            bit_depth: None,
            pixel_format: None,
            profile: None,
            level: None,
            color_transfer: None,
            color_primaries: None,
            color_space: None,
            video_range: None,
            extended_video_type: None,
            extended_video_sub_type: None,
            extended_video_sub_type_description: None,
            channels: None,
            channel_layout: None,
            sample_rate: None,
            is_external: false,
            is_text_subtitle_stream: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_serializes_pascal_case_without_nulls() {
        let mut stream = MediaStream::new(0, StreamType::Audio);
        stream.codec = Some("truehd".into());
        stream.channels = Some(8);

        let json = serde_json::to_value(&stream).unwrap();
        assert_eq!(json["Type"], "Audio");
        assert_eq!(json["Codec"], "truehd");
        assert_eq!(json["Channels"], 8);
        assert_eq!(json["IsDefault"], false);
        assert!(json.get("Width").is_none());
        assert!(json.get("Language").is_none());
    }

    #[test]
    fn test_secs_to_ticks() {
        assert_eq!(secs_to_ticks(1.5), 15_000_000);
        assert_eq!(secs_to_ticks(0.0), 0);
    }
}
