//! Upload cache queries.
//!
//! Status moves `pending -> success` (terminal until reset) or
//! `pending -> failed -> pending` when a retry starts a new attempt.

use discforge_common::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::now_epoch;
use crate::models::{UploadEntry, UploadStats, UploadStatus};

fn row_to_entry(row: &Row) -> rusqlite::Result<UploadEntry> {
    let status: String = row.get(2)?;
    let status = status.parse::<UploadStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        )
    })?;

    Ok(UploadEntry {
        source_path: row.get(0)?,
        target_path: row.get(1)?,
        status,
        upload_count: row.get(3)?,
        last_upload_time: row.get(4)?,
        last_error_message: row.get(5)?,
    })
}

/// Start an upload attempt: insert or move the entry to `pending` and bump
/// its attempt counter.
pub fn begin_attempt(conn: &Connection, source_path: &str, target_path: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO upload_cache
             (source_path, target_path, status, upload_count, last_upload_time, last_error_message)
         VALUES (?1, ?2, 'pending', 1, ?3, NULL)
         ON CONFLICT(source_path) DO UPDATE SET
             target_path = excluded.target_path,
             status = 'pending',
             upload_count = upload_count + 1,
             last_upload_time = excluded.last_upload_time,
             last_error_message = NULL",
        params![source_path, target_path, now_epoch()],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(())
}

/// Mark the current attempt as successful.
pub fn mark_success(conn: &Connection, source_path: &str) -> Result<()> {
    set_status(conn, source_path, UploadStatus::Success, None)
}

/// Mark the current attempt as failed with `error`.
pub fn mark_failed(conn: &Connection, source_path: &str, error: &str) -> Result<()> {
    set_status(conn, source_path, UploadStatus::Failed, Some(error))
}

fn set_status(
    conn: &Connection,
    source_path: &str,
    status: UploadStatus,
    error: Option<&str>,
) -> Result<()> {
    let affected = conn
        .execute(
            "UPDATE upload_cache
             SET status = ?2, last_upload_time = ?3, last_error_message = ?4
             WHERE source_path = ?1",
            params![source_path, status.as_str(), now_epoch(), error],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if affected == 0 {
        return Err(Error::invalid_input(format!(
            "no upload attempt recorded for {}",
            source_path
        )));
    }

    Ok(())
}

/// Get the entry for `source_path`.
pub fn get(conn: &Connection, source_path: &str) -> Result<Option<UploadEntry>> {
    conn.query_row(
        "SELECT source_path, target_path, status, upload_count, last_upload_time, last_error_message
         FROM upload_cache WHERE source_path = ?1",
        params![source_path],
        row_to_entry,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// All entries with `status`, oldest attempt first.
pub fn list_by_status(conn: &Connection, status: UploadStatus) -> Result<Vec<UploadEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT source_path, target_path, status, upload_count, last_upload_time, last_error_message
             FROM upload_cache WHERE status = ?1 ORDER BY last_upload_time, source_path",
        )
        .map_err(|e| Error::database(e.to_string()))?;

    let entries = stmt
        .query_map(params![status.as_str()], row_to_entry)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(entries)
}

/// Per-status totals.
pub fn stats(conn: &Connection) -> Result<UploadStats> {
    let mut stmt = conn
        .prepare("SELECT status, COUNT(*) FROM upload_cache GROUP BY status")
        .map_err(|e| Error::database(e.to_string()))?;

    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
        .map_err(|e| Error::database(e.to_string()))?;

    let mut stats = UploadStats::default();
    for row in rows {
        let (status, count) = row.map_err(|e| Error::database(e.to_string()))?;
        match status.parse::<UploadStatus>() {
            Ok(UploadStatus::Pending) => stats.pending = count as u64,
            Ok(UploadStatus::Success) => stats.success = count as u64,
            Ok(UploadStatus::Failed) => stats.failed = count as u64,
            Err(e) => return Err(Error::database(e)),
        }
    }

    Ok(stats)
}

/// Delete the entry for `source_path` so the next bulk run uploads it again.
pub fn reset(conn: &Connection, source_path: &str) -> Result<bool> {
    let affected = conn
        .execute(
            "DELETE FROM upload_cache WHERE source_path = ?1",
            params![source_path],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::Store;
    use crate::pool::{init_memory_pool, PooledConnection};

    fn setup_test_db() -> PooledConnection {
        let pool = init_memory_pool(Store::Uploads).unwrap();
        pool.get().unwrap()
    }

    #[test]
    fn test_attempt_then_success() {
        let conn = setup_test_db();
        begin_attempt(&conn, "/lib/a.json", "/remote/a.json").unwrap();

        let entry = get(&conn, "/lib/a.json").unwrap().unwrap();
        assert_eq!(entry.status, UploadStatus::Pending);
        assert_eq!(entry.upload_count, 1);

        mark_success(&conn, "/lib/a.json").unwrap();
        let entry = get(&conn, "/lib/a.json").unwrap().unwrap();
        assert_eq!(entry.status, UploadStatus::Success);
        assert_eq!(entry.target_path, "/remote/a.json");
    }

    #[test]
    fn test_failed_then_retry_goes_back_to_pending() {
        let conn = setup_test_db();
        begin_attempt(&conn, "/lib/a.json", "/remote/a.json").unwrap();
        mark_failed(&conn, "/lib/a.json", "permission denied").unwrap();

        let entry = get(&conn, "/lib/a.json").unwrap().unwrap();
        assert_eq!(entry.status, UploadStatus::Failed);
        assert_eq!(entry.last_error_message.as_deref(), Some("permission denied"));

        begin_attempt(&conn, "/lib/a.json", "/remote/a.json").unwrap();
        let entry = get(&conn, "/lib/a.json").unwrap().unwrap();
        assert_eq!(entry.status, UploadStatus::Pending);
        assert_eq!(entry.upload_count, 2);
        assert!(entry.last_error_message.is_none());
    }

    #[test]
    fn test_mark_without_attempt_is_error() {
        let conn = setup_test_db();
        assert!(mark_success(&conn, "/lib/missing.json").is_err());
    }

    #[test]
    fn test_list_by_status_and_stats() {
        let conn = setup_test_db();
        for (src, ok) in [("/a", true), ("/b", false), ("/c", false)] {
            begin_attempt(&conn, src, "/remote").unwrap();
            if ok {
                mark_success(&conn, src).unwrap();
            } else {
                mark_failed(&conn, src, "boom").unwrap();
            }
        }
        begin_attempt(&conn, "/d", "/remote").unwrap();

        let failed = list_by_status(&conn, UploadStatus::Failed).unwrap();
        let sources: Vec<_> = failed.iter().map(|e| e.source_path.as_str()).collect();
        assert_eq!(sources.len(), 2);
        assert!(sources.contains(&"/b") && sources.contains(&"/c"));

        let stats = stats(&conn).unwrap();
        assert_eq!(stats.success, 1);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.total(), 4);
    }

    #[test]
    fn test_reset() {
        let conn = setup_test_db();
        begin_attempt(&conn, "/a", "/remote/a").unwrap();
        assert!(reset(&conn, "/a").unwrap());
        assert!(get(&conn, "/a").unwrap().is_none());
    }
}
