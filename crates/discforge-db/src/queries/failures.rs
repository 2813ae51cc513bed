//! Failure cache queries.
//!
//! One row per placeholder path. `record` inserts or increments the counter;
//! nothing ever decrements it, only `reset`/`clear` remove rows.

use discforge_common::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::now_epoch;
use crate::models::{FailureEntry, FailureStats};

fn row_to_entry(row: &Row) -> rusqlite::Result<FailureEntry> {
    Ok(FailureEntry {
        file_path: row.get(0)?,
        failure_count: row.get(1)?,
        last_failure_time: row.get(2)?,
        last_error_message: row.get(3)?,
    })
}

/// Record a failure for `file_path`, returning the updated entry.
pub fn record(conn: &Connection, file_path: &str, error: &str) -> Result<FailureEntry> {
    conn.execute(
        "INSERT INTO failure_cache (file_path, failure_count, last_failure_time, last_error_message)
         VALUES (?1, 1, ?2, ?3)
         ON CONFLICT(file_path) DO UPDATE SET
             failure_count = failure_count + 1,
             last_failure_time = excluded.last_failure_time,
             last_error_message = excluded.last_error_message",
        params![file_path, now_epoch(), error],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    get(conn, file_path)?
        .ok_or_else(|| Error::internal(format!("failure entry vanished: {}", file_path)))
}

/// Get the entry for `file_path`.
pub fn get(conn: &Connection, file_path: &str) -> Result<Option<FailureEntry>> {
    conn.query_row(
        "SELECT file_path, failure_count, last_failure_time, last_error_message
         FROM failure_cache WHERE file_path = ?1",
        params![file_path],
        row_to_entry,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Failure count for `file_path`, zero when absent.
pub fn failure_count(conn: &Connection, file_path: &str) -> Result<u32> {
    Ok(get(conn, file_path)?.map(|e| e.failure_count).unwrap_or(0))
}

/// Delete the entry for `file_path`. Returns whether a row was removed.
pub fn reset(conn: &Connection, file_path: &str) -> Result<bool> {
    let affected = conn
        .execute(
            "DELETE FROM failure_cache WHERE file_path = ?1",
            params![file_path],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(affected > 0)
}

/// Delete every entry. Returns the number of rows removed.
pub fn clear(conn: &Connection) -> Result<usize> {
    conn.execute("DELETE FROM failure_cache", [])
        .map_err(|e| Error::database(e.to_string()))
}

/// Count all entries and those at or above `max_retries`.
pub fn stats(conn: &Connection, max_retries: u32) -> Result<FailureStats> {
    conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(CASE WHEN failure_count >= ?1 THEN 1 ELSE 0 END), 0)
         FROM failure_cache",
        params![max_retries],
        |row| {
            Ok(FailureStats {
                total: row.get::<_, i64>(0)? as u64,
                permanent: row.get::<_, i64>(1)? as u64,
            })
        },
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// All entries, most recent failure first.
pub fn list(conn: &Connection) -> Result<Vec<FailureEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT file_path, failure_count, last_failure_time, last_error_message
             FROM failure_cache ORDER BY last_failure_time DESC, file_path",
        )
        .map_err(|e| Error::database(e.to_string()))?;

    let entries = stmt
        .query_map([], row_to_entry)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(entries)
}
