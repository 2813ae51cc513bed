//! Per-file pipeline: placeholder in, descriptor on disk out.

use std::path::{Path, PathBuf};

use discforge_av::{reconcile_duration, DiscStructureExtractor, ProbeExtractor, ReconcileSettings};
use discforge_common::paths::{descriptor_path, read_placeholder};
use discforge_common::protocol::detect_protocol_any;
use discforge_common::{DiscProtocol, Result};
use tracing::{debug, info};

use crate::descriptor::{build_descriptor, write_descriptor, TransformInput, TransformSettings};

/// What one successful run produced.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub placeholder: PathBuf,
    pub image: PathBuf,
    pub descriptor: PathBuf,
    /// Protocol the accepted probe output came from.
    pub protocol: DiscProtocol,
    pub used_fallback: bool,
    pub stream_count: usize,
    pub duration_secs: f64,
}

pub struct FilePipeline {
    probe: ProbeExtractor,
    disc: DiscStructureExtractor,
    reconcile: ReconcileSettings,
    transform: TransformSettings,
    descriptor_suffix: String,
}

impl FilePipeline {
    pub fn new(
        probe: ProbeExtractor,
        disc: DiscStructureExtractor,
        reconcile: ReconcileSettings,
        transform: TransformSettings,
        descriptor_suffix: impl Into<String>,
    ) -> Self {
        Self {
            probe,
            disc,
            reconcile,
            transform,
            descriptor_suffix: descriptor_suffix.into(),
        }
    }

    pub fn probe_extractor(&self) -> &ProbeExtractor {
        &self.probe
    }

    pub fn disc_extractor(&self) -> &DiscStructureExtractor {
        &self.disc
    }

    pub fn descriptor_suffix(&self) -> &str {
        &self.descriptor_suffix
    }

    /// Run every stage for `placeholder` and write its descriptor.
    ///
    /// Nothing is written unless every stage succeeds.
    pub async fn process(&self, placeholder: &Path) -> Result<ProcessOutcome> {
        let image = read_placeholder(placeholder)?;
        let requested = detect_protocol_any(&[placeholder, &image]);
        debug!("{:?} -> {:?} ({})", placeholder, image, requested);

        let probed = self.probe.extract(&image, requested).await?;
        let protocol = probed.protocol;
        if probed.used_fallback(requested) {
            info!(
                "{:?} probed as {} after {} failed ({} attempts)",
                image, protocol, requested, probed.attempts
            );
        }

        // Disc structure follows the protocol that actually worked.
        let disc = self.disc.extract(&image, protocol).await?;

        let duration_secs = reconcile_duration(
            probed.result.duration_secs(),
            disc.main_title_duration,
            protocol,
            &self.reconcile,
        );

        let file_size = tokio::fs::metadata(&image).await.ok().map(|m| m.len());

        let descriptor = build_descriptor(
            &TransformInput {
                probe: &probed.result,
                disc: &disc,
                image: &image,
                file_size,
                protocol,
                duration_secs,
            },
            &self.transform,
        )?;

        let target = descriptor_path(placeholder, &self.descriptor_suffix);
        write_descriptor(&target, &descriptor)?;

        let stream_count = descriptor.media_source_info.media_streams.len();
        info!(
            "Wrote {:?}: {} streams, {:.0}s, {}",
            target, stream_count, duration_secs, protocol
        );

        Ok(ProcessOutcome {
            placeholder: placeholder.to_path_buf(),
            image,
            descriptor: target,
            protocol,
            used_fallback: probed.used_fallback(requested),
            stream_count,
            duration_secs,
        })
    }
}
