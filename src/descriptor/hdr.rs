//! HDR and Dolby Vision classification from prober facts.
//!
//! Only consumes what the prober reports (transfer characteristic, side-data
//! records, codec fourCC); no bitstream decoding happens here.

use discforge_av::probe::{ProbeSideData, ProbeStream};

const TRANSFER_PQ: &str = "smpte2084";
const TRANSFER_HLG: &str = "arib-std-b67";
const DOVI_RECORD: &str = "DOVI configuration record";
const HDR10_PLUS_RECORD: &str = "HDR Dynamic Metadata SMPTE2094-40 (HDR10+)";
const DV_FOURCCS: &[&str] = &["dvh1", "dvhe", "dav1", "dva1", "dvav"];
const BDMV_CODEC_TAG: &str = "HDMV";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DvProfile {
    pub profile: u8,
    /// Single-layer profile 8 variant (1, 2 or 4).
    pub compatibility: Option<u8>,
}

impl DvProfile {
    fn from_record(record: &ProbeSideData) -> Option<Self> {
        let profile = record.dv_profile?;
        let compatibility = if profile == 8 {
            match record.dv_bl_signal_compatibility_id {
                None => Some(4),
                Some(id @ (1 | 2 | 4)) => Some(id),
                Some(_) => None,
            }
        } else {
            None
        };
        Some(Self {
            profile,
            compatibility,
        })
    }

    fn name(&self) -> String {
        match self.compatibility {
            Some(c) => format!("Profile {}.{}", self.profile, c),
            None => format!("Profile {}", self.profile),
        }
    }

    fn sub_type(&self) -> String {
        match self.compatibility {
            Some(c) => format!("DoviProfile{}{}", self.profile, c),
            None => format!("DoviProfile{}", self.profile),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HdrClass {
    Sdr,
    Hdr10,
    Hdr10Plus,
    Hlg,
    DolbyVision(Option<DvProfile>),
}

impl HdrClass {
    /// `VideoRange`: "HDR" or "SDR".
    pub fn video_range(&self) -> &'static str {
        match self {
            HdrClass::Sdr => "SDR",
            _ => "HDR",
        }
    }

    /// `ExtendedVideoType`.
    pub fn extended_type(&self) -> &'static str {
        match self {
            HdrClass::Sdr => "None",
            HdrClass::Hdr10 => "HDR10",
            HdrClass::Hdr10Plus => "HDR10Plus",
            HdrClass::Hlg => "HLG",
            HdrClass::DolbyVision(_) => "DolbyVision",
        }
    }

    /// `ExtendedVideoSubType`, only meaningful for Dolby Vision.
    pub fn sub_type(&self) -> Option<String> {
        match self {
            HdrClass::DolbyVision(Some(p)) => Some(p.sub_type()),
            _ => None,
        }
    }

    /// Human label, e.g. "DolbyVision Profile 8.2". `None` for SDR.
    pub fn label(&self) -> Option<String> {
        match self {
            HdrClass::Sdr => None,
            HdrClass::Hdr10 => Some("HDR10".into()),
            HdrClass::Hdr10Plus => Some("HDR10+".into()),
            HdrClass::Hlg => Some("HLG".into()),
            HdrClass::DolbyVision(None) => Some("DolbyVision".into()),
            HdrClass::DolbyVision(Some(p)) => Some(format!("DolbyVision {}", p.name())),
        }
    }

    pub fn is_dolby_vision(&self) -> bool {
        matches!(self, HdrClass::DolbyVision(_))
    }
}

fn is_pq(stream: &ProbeStream) -> bool {
    stream.color_transfer.as_deref() == Some(TRANSFER_PQ)
}

fn dovi_record(stream: &ProbeStream) -> Option<&ProbeSideData> {
    stream
        .side_data_list
        .iter()
        .find(|sd| sd.side_data_type.as_deref() == Some(DOVI_RECORD))
}

fn has_hdr10_plus(stream: &ProbeStream) -> bool {
    stream.side_data_list.iter().any(|sd| {
        sd.side_data_type
            .as_deref()
            .map(|t| t == HDR10_PLUS_RECORD || t.contains("SMPTE2094-40") || t.contains("HDR10+"))
            .unwrap_or(false)
    })
}

fn has_dv_fourcc(stream: &ProbeStream) -> bool {
    stream
        .codec_tag_string
        .as_deref()
        .map(|tag| DV_FOURCCS.iter().any(|cc| tag.eq_ignore_ascii_case(cc)))
        .unwrap_or(false)
}

/// Classify a single video stream.
pub fn classify_stream(stream: &ProbeStream) -> HdrClass {
    let pq = is_pq(stream);

    if pq {
        if let Some(record) = dovi_record(stream) {
            return HdrClass::DolbyVision(DvProfile::from_record(record));
        }
        if has_hdr10_plus(stream) {
            return HdrClass::Hdr10Plus;
        }
        return HdrClass::Hdr10;
    }

    if has_dv_fourcc(stream) {
        return HdrClass::DolbyVision(dovi_record(stream).and_then(DvProfile::from_record));
    }

    match stream.color_transfer.as_deref() {
        Some(TRANSFER_HLG) => HdrClass::Hlg,
        _ => HdrClass::Sdr,
    }
}

/// Dual-layer BDMV Dolby Vision: two or more PQ video streams where the first
/// carries the Blu-ray `HDMV` codec tag.
pub fn is_dual_layer_bdmv(video_streams: &[&ProbeStream]) -> bool {
    if video_streams.len() < 2 {
        return false;
    }
    let pq_count = video_streams.iter().filter(|s| is_pq(s)).count();
    let first_is_bdmv = video_streams[0]
        .codec_tag_string
        .as_deref()
        .map(|t| t.eq_ignore_ascii_case(BDMV_CODEC_TAG))
        .unwrap_or(false);
    pq_count >= 2 && first_is_bdmv
}

/// Classification for every video stream, applying the dual-layer override.
pub fn classify_video_streams(video_streams: &[&ProbeStream]) -> Vec<HdrClass> {
    if is_dual_layer_bdmv(video_streams) {
        let profile7 = HdrClass::DolbyVision(Some(DvProfile {
            profile: 7,
            compatibility: None,
        }));
        return vec![profile7; video_streams.len()];
    }
    video_streams.iter().map(|s| classify_stream(s)).collect()
}
