//! Rust models matching the cache tables.

use serde::{Deserialize, Serialize};

/// A row of the failure cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureEntry {
    /// Placeholder path, the unique key.
    pub file_path: String,
    /// Number of recorded failures; never decreases.
    pub failure_count: u32,
    /// Epoch seconds of the most recent failure.
    pub last_failure_time: i64,
    /// Message of the most recent failure.
    pub last_error_message: Option<String>,
}

/// Totals reported by the failure cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FailureStats {
    /// Entries with at least one recorded failure.
    pub total: u64,
    /// Entries at or above the retry ceiling.
    pub permanent: u64,
}

/// Upload status of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Success,
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Success => "success",
            UploadStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for UploadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(UploadStatus::Pending),
            "success" => Ok(UploadStatus::Success),
            "failed" => Ok(UploadStatus::Failed),
            _ => Err(format!("Invalid upload status: {}", s)),
        }
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of the upload cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadEntry {
    /// Local artifact path, the unique key.
    pub source_path: String,
    /// Remote twin path the artifact is copied to.
    pub target_path: String,
    pub status: UploadStatus,
    /// Number of upload attempts.
    pub upload_count: u32,
    /// Epoch seconds of the most recent attempt.
    pub last_upload_time: i64,
    pub last_error_message: Option<String>,
}

/// Per-status totals of the upload cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadStats {
    pub pending: u64,
    pub success: u64,
    pub failed: u64,
}

impl UploadStats {
    pub fn total(&self) -> u64 {
        self.pending + self.success + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_status_round_trip() {
        for status in [UploadStatus::Pending, UploadStatus::Success, UploadStatus::Failed] {
            assert_eq!(status.as_str().parse::<UploadStatus>().unwrap(), status);
        }
        assert!("done".parse::<UploadStatus>().is_err());
    }
}
