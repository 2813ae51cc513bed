//! Failure Cache: per-placeholder failure counter with a retry ceiling.

use std::path::Path;

use discforge_common::Result;
use discforge_db::migrations::Store;
use discforge_db::models::{FailureEntry, FailureStats};
use discforge_db::pool::{get_conn, init_memory_pool, init_pool, DbPool};
use discforge_db::queries::failures;

/// Keyed by the exact path string. Writers are serialized by the scan lock.
#[derive(Clone)]
pub struct FailureCache {
    pool: DbPool,
    max_retries: u32,
}

impl FailureCache {
    pub fn open(db_path: &Path, max_retries: u32) -> Result<Self> {
        Ok(Self {
            pool: init_pool(db_path, Store::Failures)?,
            max_retries,
        })
    }

    pub fn in_memory(max_retries: u32) -> Result<Self> {
        Ok(Self {
            pool: init_memory_pool(Store::Failures)?,
            max_retries,
        })
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn key(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    /// Insert or increment the counter for `path`.
    pub fn record(&self, path: &Path, error: &str) -> Result<FailureEntry> {
        let conn = get_conn(&self.pool)?;
        let entry = failures::record(&conn, &Self::key(path), error)?;
        if entry.failure_count >= self.max_retries {
            tracing::error!(
                "{:?} failed {} times (max retries {}); it will be skipped until reset with \
                 `discforge failures reset {}`",
                path,
                entry.failure_count,
                self.max_retries,
                path.display()
            );
        } else {
            tracing::warn!(
                "{:?} failed ({}/{}): {}",
                path,
                entry.failure_count,
                self.max_retries,
                error
            );
        }
        Ok(entry)
    }

    /// True iff the counter has reached the retry ceiling.
    pub fn should_skip(&self, path: &Path) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        Ok(failures::failure_count(&conn, &Self::key(path))? >= self.max_retries)
    }

    pub fn failure_count(&self, path: &Path) -> Result<u32> {
        let conn = get_conn(&self.pool)?;
        failures::failure_count(&conn, &Self::key(path))
    }

    pub fn get(&self, path: &Path) -> Result<Option<FailureEntry>> {
        let conn = get_conn(&self.pool)?;
        failures::get(&conn, &Self::key(path))
    }

    /// Delete the entry for `path`; returns whether one existed.
    pub fn reset(&self, path: &Path) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        failures::reset(&conn, &Self::key(path))
    }

    /// Wipe every entry.
    pub fn clear(&self) -> Result<usize> {
        let conn = get_conn(&self.pool)?;
        failures::clear(&conn)
    }

    pub fn stats(&self) -> Result<FailureStats> {
        let conn = get_conn(&self.pool)?;
        failures::stats(&conn, self.max_retries)
    }

    /// All entries, most recent failure first.
    pub fn list(&self) -> Result<Vec<FailureEntry>> {
        let conn = get_conn(&self.pool)?;
        failures::list(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_exactly_at_ceiling() {
        let cache = FailureCache::in_memory(3).unwrap();
        let path = Path::new("/lib/Movie/Movie.strm");

        let mut last = 0;
        for expected in 1..=4u32 {
            assert_eq!(cache.should_skip(path).unwrap(), last >= 3);
            let entry = cache.record(path, "ffprobe timed out").unwrap();
            assert_eq!(entry.failure_count, expected);
            assert!(entry.failure_count > last);
            last = entry.failure_count;
        }
        assert!(cache.should_skip(path).unwrap());
    }

    #[test]
    fn test_reset_and_clear() {
        let cache = FailureCache::in_memory(1).unwrap();
        let a = Path::new("/lib/a.strm");
        let b = Path::new("/lib/b.strm");
        cache.record(a, "x").unwrap();
        cache.record(b, "y").unwrap();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.permanent, 2);

        assert!(cache.reset(a).unwrap());
        assert!(!cache.should_skip(a).unwrap());
        assert!(!cache.reset(a).unwrap());

        assert_eq!(cache.clear().unwrap(), 1);
        assert!(cache.list().unwrap().is_empty());
    }

    #[test]
    fn test_keys_are_exact_paths() {
        let cache = FailureCache::in_memory(1).unwrap();
        cache.record(Path::new("/lib/A.strm"), "x").unwrap();
        assert!(!cache.should_skip(Path::new("/lib/a.strm")).unwrap());
        assert!(cache.should_skip(Path::new("/lib/A.strm")).unwrap());
    }
}
