//! Database query modules.
//!
//! - failures: per-placeholder failure counters
//! - uploads: per-artifact upload status

pub mod failures;
pub mod uploads;

/// Current time as epoch seconds.
pub(crate) fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}
