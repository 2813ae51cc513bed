//! Duration Reconciler.
//!
//! The container-level duration of a Blu-ray can be wildly off (menus,
//! seamless-branching playlists). The disc lister reads the title structure
//! directly, so on disagreement it wins.

use discforge_common::DiscProtocol;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcileSettings {
    /// Disagreement (seconds) above which the lister duration is used.
    pub threshold_secs: f64,
    /// Durations below this (seconds) are considered suspiciously short.
    pub plausibility_floor_secs: f64,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            threshold_secs: 60.0,
            plausibility_floor_secs: 1800.0,
        }
    }
}

/// Pick the runtime to publish, in seconds.
///
/// `lister` is 0 when the disc lister produced nothing.
pub fn reconcile_duration(
    probe: f64,
    lister: f64,
    protocol: DiscProtocol,
    settings: &ReconcileSettings,
) -> f64 {
    let bluray = protocol == DiscProtocol::Bluray;

    if bluray && probe > 0.0 && lister > 0.0 && (probe - lister).abs() > settings.threshold_secs {
        tracing::info!(
            "Probe duration {:.0}s disagrees with disc title {:.0}s, using disc title",
            probe,
            lister
        );
        return lister;
    }

    if bluray && probe < settings.plausibility_floor_secs && lister > settings.plausibility_floor_secs
    {
        tracing::info!(
            "Probe duration {:.0}s below plausibility floor, using disc title {:.0}s",
            probe,
            lister
        );
        return lister;
    }

    if probe > 0.0 && probe < settings.plausibility_floor_secs {
        tracing::info!("Short runtime accepted as-is: {:.0}s", probe);
    }
    probe
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconcile(probe: f64, lister: f64, protocol: DiscProtocol) -> f64 {
        reconcile_duration(probe, lister, protocol, &ReconcileSettings::default())
    }

    #[test]
    fn test_large_disagreement_uses_lister() {
        assert_eq!(reconcile(5400.0, 5500.0, DiscProtocol::Bluray), 5500.0);
    }

    #[test]
    fn test_small_disagreement_keeps_probe() {
        assert_eq!(reconcile(5400.0, 5420.0, DiscProtocol::Bluray), 5400.0);
    }

    #[test]
    fn test_missing_probe_duration_below_floor() {
        assert_eq!(reconcile(0.0, 7200.0, DiscProtocol::Bluray), 7200.0);
    }

    #[test]
    fn test_dvd_never_uses_lister() {
        assert_eq!(reconcile(5400.0, 7200.0, DiscProtocol::Dvd), 5400.0);
    }

    #[test]
    fn test_no_lister_duration_keeps_probe() {
        assert_eq!(reconcile(1200.0, 0.0, DiscProtocol::Bluray), 1200.0);
    }

    #[test]
    fn test_custom_threshold() {
        let settings = ReconcileSettings {
            threshold_secs: 200.0,
            ..Default::default()
        };
        assert_eq!(
            reconcile_duration(5400.0, 5500.0, DiscProtocol::Bluray, &settings),
            5400.0
        );
    }
}
