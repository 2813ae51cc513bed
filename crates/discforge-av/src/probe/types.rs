//! Raw prober output.
//!
//! These types mirror ffprobe's JSON (`-show_format -show_streams
//! -show_chapters`) closely so the descriptor transformer sees the same
//! facts the tool reported. ffprobe emits many numbers as strings; the
//! accessors parse them leniently.

use serde::{Deserialize, Deserializer, Serialize};

/// Full prober result for one image.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProbeResult {
    #[serde(default)]
    pub format: ProbeFormat,
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
    #[serde(default)]
    pub chapters: Vec<ProbeChapter>,
}

impl ProbeResult {
    /// Container duration in seconds, 0 when unknown.
    pub fn duration_secs(&self) -> f64 {
        self.format.duration_secs().unwrap_or(0.0)
    }

    /// Streams of one `codec_type` in prober order.
    pub fn streams_of<'a>(&'a self, codec_type: &'a str) -> impl Iterator<Item = &'a ProbeStream> {
        self.streams
            .iter()
            .filter(move |s| s.codec_type.as_deref() == Some(codec_type))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProbeFormat {
    pub format_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bit_rate: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub size: Option<String>,
}

impl ProbeFormat {
    pub fn duration_secs(&self) -> Option<f64> {
        parse_f64(self.duration.as_deref())
    }

    pub fn bit_rate(&self) -> Option<u64> {
        parse_u64(self.bit_rate.as_deref())
    }

    pub fn size(&self) -> Option<u64> {
        parse_u64(self.size.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProbeStream {
    #[serde(default)]
    pub index: u32,
    pub codec_type: Option<String>,
    pub codec_name: Option<String>,
    pub codec_tag_string: Option<String>,
    pub profile: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub r_frame_rate: Option<String>,
    pub avg_frame_rate: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bit_rate: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bits_per_raw_sample: Option<String>,
    pub pix_fmt: Option<String>,
    pub level: Option<i32>,
    pub color_transfer: Option<String>,
    pub color_primaries: Option<String>,
    pub color_space: Option<String>,
    pub channels: Option<u32>,
    pub channel_layout: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sample_rate: Option<String>,
    #[serde(default)]
    pub disposition: ProbeDisposition,
    #[serde(default)]
    pub tags: ProbeTags,
    #[serde(default)]
    pub side_data_list: Vec<ProbeSideData>,
}

impl ProbeStream {
    pub fn is_type(&self, codec_type: &str) -> bool {
        self.codec_type.as_deref() == Some(codec_type)
    }

    pub fn bit_rate(&self) -> Option<u64> {
        parse_u64(self.bit_rate.as_deref())
    }

    pub fn bit_depth(&self) -> Option<u32> {
        parse_u64(self.bits_per_raw_sample.as_deref()).map(|v| v as u32)
    }

    pub fn sample_rate(&self) -> Option<u32> {
        parse_u64(self.sample_rate.as_deref()).map(|v| v as u32)
    }

    /// Frame rate from `avg_frame_rate`, falling back to `r_frame_rate`.
    pub fn frame_rate(&self) -> Option<f64> {
        self.avg_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .or_else(|| self.r_frame_rate.as_deref().and_then(parse_frame_rate))
    }

    pub fn language(&self) -> Option<&str> {
        self.tags
            .language
            .as_deref()
            .filter(|l| !l.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProbeDisposition {
    #[serde(default)]
    pub default: u8,
    #[serde(default)]
    pub forced: u8,
    #[serde(default)]
    pub hearing_impaired: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProbeTags {
    pub language: Option<String>,
    pub title: Option<String>,
}

/// One entry of a stream's `side_data_list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProbeSideData {
    pub side_data_type: Option<String>,
    pub dv_profile: Option<u8>,
    pub dv_level: Option<u8>,
    pub rpu_present_flag: Option<u8>,
    pub el_present_flag: Option<u8>,
    pub bl_present_flag: Option<u8>,
    pub dv_bl_signal_compatibility_id: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProbeChapter {
    #[serde(default, deserialize_with = "lenient_string")]
    pub start_time: Option<String>,
    #[serde(default)]
    pub tags: ProbeTags,
}

impl ProbeChapter {
    pub fn start_secs(&self) -> f64 {
        parse_f64(self.start_time.as_deref()).unwrap_or(0.0)
    }
}

/// Parse a frame rate string like "24000/1001" or "25".
pub fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        if den == 0.0 || num == 0.0 {
            return None;
        }
        Some(num / den)
    } else {
        s.trim().parse().ok().filter(|v: &f64| *v > 0.0)
    }
}

fn parse_f64(s: Option<&str>) -> Option<f64> {
    s.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn parse_u64(s: Option<&str>) -> Option<u64> {
    let s = s?.trim();
    s.parse::<u64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u64))
}

/// Accept strings or bare JSON numbers.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Str(s)) => Some(s),
        Some(Raw::Int(i)) => Some(i.to_string()),
        Some(Raw::Float(f)) => Some(f.to_string()),
        None => None,
    })
}
