//! Bitrate reconstruction.
//!
//! Disc demuxers often report no bitrate, or one computed over the wrong
//! playlist. The size/duration estimate is the reference everything else is
//! checked against.

/// Size-derived bitrate in bits per second.
pub fn calculated_bitrate(size_bytes: u64, duration_secs: f64) -> Option<u64> {
    if size_bytes == 0 || duration_secs <= 0.0 {
        return None;
    }
    Some((size_bytes as f64 * 8.0 / duration_secs).round() as u64)
}

/// Total bitrate: the reported value unless it is missing, zero, or more
/// than `factor` times the size-derived estimate.
pub fn total_bitrate(
    reported: Option<u64>,
    size_bytes: u64,
    duration_secs: f64,
    factor: f64,
) -> Option<u64> {
    let calculated = calculated_bitrate(size_bytes, duration_secs);
    match (reported, calculated) {
        (Some(r), Some(c)) if r > 0 && (r as f64) <= c as f64 * factor => Some(r),
        (Some(r), Some(c)) => {
            if r > 0 {
                tracing::debug!("Reported bitrate {} implausible vs calculated {}", r, c);
            }
            Some(c)
        }
        (Some(r), None) if r > 0 => Some(r),
        (_, c) => c,
    }
}

/// One video stream's inputs to the allocation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VideoShare {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub reported: Option<u64>,
}

impl VideoShare {
    fn weight(&self) -> f64 {
        self.width as f64 * self.height as f64 * self.frame_rate.max(0.0)
    }
}

/// Bitrate per video stream.
///
/// The pool is `total - other_streams` (audio plus subtitle). Each stream gets
/// a share proportional to `width * height * fps`; equal shares when no
/// weights are known. A reported value is kept when it is non-zero and not
/// more than `factor` times the allocated share.
pub fn allocate_video_bitrates(
    videos: &[VideoShare],
    total: Option<u64>,
    other_streams: u64,
    factor: f64,
) -> Vec<Option<u64>> {
    let Some(total) = total else {
        return videos.iter().map(|v| v.reported.filter(|r| *r > 0)).collect();
    };

    let pool = total.saturating_sub(other_streams) as f64;
    let weights: Vec<f64> = videos.iter().map(VideoShare::weight).collect();
    let weight_sum: f64 = weights.iter().sum();

    videos
        .iter()
        .zip(&weights)
        .map(|(video, weight)| {
            let share = if weight_sum > 0.0 {
                pool * weight / weight_sum
            } else {
                pool / videos.len() as f64
            };
            let share = share.round() as u64;

            match video.reported {
                Some(r) if r > 0 && (share == 0 || (r as f64) <= share as f64 * factor) => Some(r),
                _ if share > 0 => Some(share),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculated_bitrate() {
        // 45 GB over two hours.
        assert_eq!(calculated_bitrate(45_000_000_000, 7200.0), Some(50_000_000));
        assert_eq!(calculated_bitrate(0, 7200.0), None);
        assert_eq!(calculated_bitrate(1000, 0.0), None);
    }

    #[test]
    fn test_total_prefers_plausible_reported() {
        let size = 45_000_000_000;
        assert_eq!(total_bitrate(Some(48_000_000), size, 7200.0, 1.5), Some(48_000_000));
        assert_eq!(total_bitrate(Some(80_000_000), size, 7200.0, 1.5), Some(50_000_000));
        assert_eq!(total_bitrate(Some(0), size, 7200.0, 1.5), Some(50_000_000));
        assert_eq!(total_bitrate(None, size, 7200.0, 1.5), Some(50_000_000));
        assert_eq!(total_bitrate(Some(1000), 0, 0.0, 1.5), Some(1000));
        assert_eq!(total_bitrate(None, 0, 0.0, 1.5), None);
    }

    #[test]
    fn test_allocation_by_weight() {
        let uhd = VideoShare {
            width: 3840,
            height: 2160,
            frame_rate: 24.0,
            reported: None,
        };
        let hd = VideoShare {
            width: 1920,
            height: 1080,
            frame_rate: 24.0,
            reported: None,
        };
        let shares = allocate_video_bitrates(&[uhd, hd], Some(55_000_000), 5_000_000, 1.5);
        assert_eq!(shares, vec![Some(40_000_000), Some(10_000_000)]);
    }

    #[test]
    fn test_allocation_keeps_plausible_reported() {
        let video = VideoShare {
            width: 1920,
            height: 1080,
            frame_rate: 24.0,
            reported: Some(30_000_000),
        };
        assert_eq!(
            allocate_video_bitrates(&[video], Some(40_000_000), 2_000_000, 1.5),
            vec![Some(30_000_000)]
        );

        let inflated = VideoShare {
            reported: Some(90_000_000),
            ..video
        };
        assert_eq!(
            allocate_video_bitrates(&[inflated], Some(40_000_000), 2_000_000, 1.5),
            vec![Some(38_000_000)]
        );
    }

    #[test]
    fn test_allocation_even_split_without_weights() {
        let unknown = VideoShare::default();
        assert_eq!(
            allocate_video_bitrates(&[unknown, unknown], Some(20_000_000), 0, 1.5),
            vec![Some(10_000_000), Some(10_000_000)]
        );
    }
}
