use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub disc: DiscConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,

    #[serde(default)]
    pub transform: TransformConfig,

    #[serde(default)]
    pub failures: FailuresConfig,

    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Config {
    pub fn scan_lock_path(&self) -> PathBuf {
        self.scan
            .lock_path
            .clone()
            .unwrap_or_else(|| self.scan.state_dir.join("scan.lock"))
    }

    pub fn failures_db_path(&self) -> PathBuf {
        self.failures
            .db_path
            .clone()
            .unwrap_or_else(|| self.scan.state_dir.join("failures.db"))
    }

    pub fn uploads_db_path(&self) -> PathBuf {
        self.upload
            .db_path
            .clone()
            .unwrap_or_else(|| self.scan.state_dir.join("uploads.db"))
    }

    pub fn upload_lock_path(&self) -> PathBuf {
        self.upload
            .lock_path
            .clone()
            .unwrap_or_else(|| self.scan.state_dir.join("upload.lock"))
    }

    pub fn mount_root(&self) -> PathBuf {
        self.disc
            .mount_root
            .clone()
            .unwrap_or_else(|| self.scan.state_dir.join("mounts"))
    }

    pub fn language_cache_dir(&self) -> PathBuf {
        self.disc
            .cache_dir
            .clone()
            .unwrap_or_else(|| self.scan.state_dir.join("languages"))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    /// Library root searched for placeholders
    #[serde(default)]
    pub root: Option<PathBuf>,

    #[serde(default = "default_placeholder_extension")]
    pub placeholder_extension: String,

    #[serde(default = "default_descriptor_suffix")]
    pub descriptor_suffix: String,

    /// Maximum placeholders processed per scan (default: 10)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between items, to stay under remote rate limits (default: 5)
    #[serde(default = "default_item_delay")]
    pub item_delay_secs: u64,

    /// Upper bound for the whole per-file pipeline (default: 1800)
    #[serde(default = "default_item_timeout")]
    pub item_timeout_secs: u64,

    #[serde(default)]
    pub lock_path: Option<PathBuf>,

    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Free space required under the scan root (default: 64 MiB)
    #[serde(default = "default_min_free_bytes")]
    pub min_free_bytes: u64,
}

fn default_placeholder_extension() -> String {
    discforge_common::paths::DEFAULT_PLACEHOLDER_EXTENSION.to_string()
}
fn default_descriptor_suffix() -> String {
    discforge_common::paths::DEFAULT_DESCRIPTOR_SUFFIX.to_string()
}
fn default_batch_size() -> usize {
    10
}
fn default_item_delay() -> u64 {
    5
}
fn default_item_timeout() -> u64 {
    1800
}
fn default_state_dir() -> PathBuf {
    PathBuf::from("~/.local/share/discforge")
}
fn default_min_free_bytes() -> u64 {
    64 * 1024 * 1024
}

impl ScanConfig {
    pub fn item_delay(&self) -> Duration {
        Duration::from_secs(self.item_delay_secs)
    }

    pub fn item_timeout(&self) -> Duration {
        Duration::from_secs(self.item_timeout_secs)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: None,
            placeholder_extension: default_placeholder_extension(),
            descriptor_suffix: default_descriptor_suffix(),
            batch_size: default_batch_size(),
            item_delay_secs: default_item_delay(),
            item_timeout_secs: default_item_timeout(),
            lock_path: None,
            state_dir: default_state_dir(),
            min_free_bytes: default_min_free_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Hard timeout per prober invocation (default: 600)
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_probe_attempts")]
    pub attempts: u32,

    #[serde(default = "default_local_backoff")]
    pub local_backoff_secs: Vec<u64>,

    #[serde(default = "default_remote_backoff")]
    pub remote_backoff_secs: Vec<u64>,

    /// Path fragments that mark a remote/cloud mount
    #[serde(default = "discforge_av::default_remote_markers")]
    pub remote_markers: Vec<String>,

    /// Also consult the filesystem type of the owning mount
    #[serde(default = "default_true")]
    pub check_fs_type: bool,

    #[serde(default = "default_missing_image_wait")]
    pub missing_image_wait_secs: u64,
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}
fn default_probe_timeout() -> u64 {
    600
}
fn default_probe_attempts() -> u32 {
    3
}
fn default_local_backoff() -> Vec<u64> {
    vec![30, 20, 10]
}
fn default_remote_backoff() -> Vec<u64> {
    vec![60, 30, 15]
}
fn default_true() -> bool {
    true
}
fn default_missing_image_wait() -> u64 {
    10
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ffprobe_path: default_ffprobe_path(),
            timeout_secs: default_probe_timeout(),
            attempts: default_probe_attempts(),
            local_backoff_secs: default_local_backoff(),
            remote_backoff_secs: default_remote_backoff(),
            remote_markers: discforge_av::default_remote_markers(),
            check_fs_type: true,
            missing_image_wait_secs: default_missing_image_wait(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscConfig {
    #[serde(default = "default_lister_path")]
    pub lister_path: PathBuf,

    #[serde(default = "default_mount_path")]
    pub mount_path: PathBuf,

    #[serde(default = "default_umount_path")]
    pub umount_path: PathBuf,

    #[serde(default)]
    pub mount_root: Option<PathBuf>,

    /// Timeout for mount, umount and the lister (default: 180)
    #[serde(default = "default_mount_timeout")]
    pub mount_timeout_secs: u64,

    #[serde(default = "default_unmount_attempts")]
    pub unmount_attempts: u32,

    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Language cache freshness (default: 24)
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_hours: u64,
}

fn default_lister_path() -> PathBuf {
    PathBuf::from("bd_list_titles")
}
fn default_mount_path() -> PathBuf {
    PathBuf::from("mount")
}
fn default_umount_path() -> PathBuf {
    PathBuf::from("umount")
}
fn default_mount_timeout() -> u64 {
    180
}
fn default_unmount_attempts() -> u32 {
    3
}
fn default_cache_ttl() -> u64 {
    24
}

impl Default for DiscConfig {
    fn default() -> Self {
        Self {
            lister_path: default_lister_path(),
            mount_path: default_mount_path(),
            umount_path: default_umount_path(),
            mount_root: None,
            mount_timeout_secs: default_mount_timeout(),
            unmount_attempts: default_unmount_attempts(),
            cache_dir: None,
            cache_ttl_hours: default_cache_ttl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcileConfig {
    #[serde(default = "default_reconcile_threshold")]
    pub threshold_secs: f64,

    #[serde(default = "default_plausibility_floor")]
    pub plausibility_floor_secs: f64,
}

fn default_reconcile_threshold() -> f64 {
    60.0
}
fn default_plausibility_floor() -> f64 {
    1800.0
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            threshold_secs: default_reconcile_threshold(),
            plausibility_floor_secs: default_plausibility_floor(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransformConfig {
    /// Reported bitrates above this multiple of the size-derived estimate
    /// are discarded (default: 1.5)
    #[serde(default = "default_bitrate_factor")]
    pub bitrate_anomaly_factor: f64,
}

fn default_bitrate_factor() -> f64 {
    1.5
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            bitrate_anomaly_factor: default_bitrate_factor(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FailuresConfig {
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Failures after which a placeholder is skipped (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    3
}

impl Default for FailuresConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Pause held under the upload lock after every copy (default: 15)
    #[serde(default = "default_upload_interval")]
    pub interval_secs: u64,

    /// Artifact suffixes eligible for upload
    #[serde(default = "default_file_types")]
    pub file_types: Vec<String>,

    #[serde(default)]
    pub db_path: Option<PathBuf>,

    #[serde(default)]
    pub lock_path: Option<PathBuf>,
}

fn default_upload_interval() -> u64 {
    15
}
fn default_file_types() -> Vec<String> {
    vec![
        discforge_common::paths::DEFAULT_DESCRIPTOR_SUFFIX.to_string(),
        ".nfo".to_string(),
        "-poster.jpg".to_string(),
        "-fanart.jpg".to_string(),
    ]
}

impl UploadConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_upload_interval(),
            file_types: default_file_types(),
            db_path: None,
            lock_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Base URL of the media server
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_notify_timeout")]
    pub timeout_secs: u64,
}

fn default_notify_timeout() -> u64 {
    10
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            api_key: None,
            timeout_secs: default_notify_timeout(),
        }
    }
}
