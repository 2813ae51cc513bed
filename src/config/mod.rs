mod types;

pub use types::*;

use anyhow::{Context, Result};
use discforge_av::{BackoffSchedule, DiscSettings, ProbeSettings, ReconcileSettings};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;
    expand_paths(&mut config);

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./discforge.toml",
        "~/.config/discforge/config.toml",
        "/etc/discforge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    let mut config = Config::default();
    expand_paths(&mut config);
    Ok(config)
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

fn expand_opt(path: &mut Option<PathBuf>) {
    if let Some(p) = path.as_mut() {
        *p = expand(p);
    }
}

/// Expand `~` in every configured path.
fn expand_paths(config: &mut Config) {
    expand_opt(&mut config.scan.root);
    expand_opt(&mut config.scan.lock_path);
    config.scan.state_dir = expand(&config.scan.state_dir);
    config.probe.ffprobe_path = expand(&config.probe.ffprobe_path);
    config.disc.lister_path = expand(&config.disc.lister_path);
    expand_opt(&mut config.disc.mount_root);
    expand_opt(&mut config.disc.cache_dir);
    expand_opt(&mut config.failures.db_path);
    expand_opt(&mut config.upload.db_path);
    expand_opt(&mut config.upload.lock_path);
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.scan.batch_size == 0 {
        anyhow::bail!("scan.batch_size cannot be 0");
    }

    if config.scan.placeholder_extension.is_empty() {
        anyhow::bail!("scan.placeholder_extension cannot be empty");
    }

    if config.scan.descriptor_suffix.is_empty() {
        anyhow::bail!("scan.descriptor_suffix cannot be empty");
    }

    if config.failures.max_retries == 0 {
        anyhow::bail!("failures.max_retries cannot be 0");
    }

    if config.probe.attempts == 0 {
        anyhow::bail!("probe.attempts cannot be 0");
    }

    if config.probe.local_backoff_secs.is_empty() || config.probe.remote_backoff_secs.is_empty() {
        anyhow::bail!("probe backoff schedules cannot be empty");
    }

    if config.transform.bitrate_anomaly_factor <= 0.0 {
        anyhow::bail!("transform.bitrate_anomaly_factor must be positive");
    }

    if config.reconcile.threshold_secs < 0.0 || config.reconcile.plausibility_floor_secs < 0.0 {
        anyhow::bail!("reconcile thresholds cannot be negative");
    }

    if config.notify.enabled && config.notify.url.as_deref().unwrap_or("").is_empty() {
        anyhow::bail!("notify is enabled but has no url");
    }

    if config.upload.enabled && config.upload.file_types.is_empty() {
        tracing::warn!("upload is enabled but upload.file_types is empty");
    }

    if let Some(root) = &config.scan.root {
        if !root.exists() {
            tracing::warn!("Scan root does not exist: {:?}", root);
        }
    }

    Ok(())
}

impl Config {
    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            local: BackoffSchedule::from_secs(self.probe.attempts, &self.probe.local_backoff_secs),
            remote: BackoffSchedule::from_secs(
                self.probe.attempts,
                &self.probe.remote_backoff_secs,
            ),
            missing_image_wait: Duration::from_secs(self.probe.missing_image_wait_secs),
        }
    }

    pub fn disc_settings(&self) -> DiscSettings {
        DiscSettings {
            mount_root: self.mount_root(),
            unmount_attempts: self.disc.unmount_attempts,
            unmount_backoff: Duration::from_secs(1),
        }
    }

    pub fn reconcile_settings(&self) -> ReconcileSettings {
        ReconcileSettings {
            threshold_secs: self.reconcile.threshold_secs,
            plausibility_floor_secs: self.reconcile.plausibility_floor_secs,
        }
    }
}
