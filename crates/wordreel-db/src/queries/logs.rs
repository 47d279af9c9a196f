//! Append-only audit log queries.
//!
//! Sequence numbers are allocated inside the INSERT itself via a subselect,
//! so two concurrent appends can never produce a gap or a duplicate: the
//! UNIQUE(project_id, seq) constraint makes the loser retry at the busy
//! handler level rather than silently reordering.

use chrono::Utc;
use rusqlite::{params, Connection};
use wordreel_common::{Error, LogLevel, ProjectId, Result};

use crate::models::LogEntry;

const LOG_COLUMNS: &str = "id, project_id, seq, level, message, payload, created_at";

/// Append an audit entry for a project, allocating the next sequence
/// number atomically. Returns the stored entry including its seq.
pub fn append_log(
    conn: &Connection,
    project_id: ProjectId,
    level: LogLevel,
    message: &str,
    payload: Option<&serde_json::Value>,
) -> Result<LogEntry> {
    let payload_json = payload
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| Error::internal(e.to_string()))?;
    let now = Utc::now();

    conn.execute(
        "INSERT INTO logs (project_id, seq, level, message, payload, created_at)
         VALUES (
             ?1,
             (SELECT COALESCE(MAX(seq), 0) + 1 FROM logs WHERE project_id = ?1),
             ?2, ?3, ?4, ?5
         )",
        params![
            project_id.to_string(),
            level.to_string(),
            message,
            payload_json,
            now.to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    conn.query_row(
        &format!("SELECT {LOG_COLUMNS} FROM logs WHERE id = last_insert_rowid()"),
        [],
        LogEntry::from_row,
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// All log entries for a project in sequence order.
pub fn logs_for_project(conn: &Connection, project_id: ProjectId) -> Result<Vec<LogEntry>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM logs WHERE project_id = ? ORDER BY seq ASC"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let entries = stmt
        .query_map([project_id.to_string()], LogEntry::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(entries)
}

/// Highest sequence number recorded for a project (0 if none).
pub fn latest_seq(conn: &Connection, project_id: ProjectId) -> Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(seq), 0) FROM logs WHERE project_id = ?",
        [project_id.to_string()],
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}
