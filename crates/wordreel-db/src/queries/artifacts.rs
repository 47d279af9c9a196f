//! Artifact provenance queries.
//!
//! One row per (project, kind). Re-generating an artifact upserts the row;
//! staleness is never stored, it is derived by comparing the stored
//! provenance digest against the currently expected one.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use wordreel_common::{ArtifactKind, Error, ProjectId, Result};

use crate::models::ArtifactRecord;

const ARTIFACT_COLUMNS: &str =
    "project_id, kind, file_path, provenance, duration_secs, created_at";

/// Record (or replace) the provenance row for one artifact.
pub fn upsert_artifact(
    conn: &Connection,
    project_id: ProjectId,
    kind: ArtifactKind,
    file_path: &str,
    provenance: &str,
    duration_secs: Option<f64>,
) -> Result<()> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO artifacts (project_id, kind, file_path, provenance, duration_secs, created_at)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT (project_id, kind) DO UPDATE SET
             file_path = excluded.file_path,
             provenance = excluded.provenance,
             duration_secs = excluded.duration_secs,
             created_at = excluded.created_at",
        params![
            project_id.to_string(),
            kind.to_string(),
            file_path,
            provenance,
            duration_secs,
            now.to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// Look up one artifact's provenance row.
pub fn get_artifact(
    conn: &Connection,
    project_id: ProjectId,
    kind: ArtifactKind,
) -> Result<Option<ArtifactRecord>> {
    conn.query_row(
        &format!(
            "SELECT {ARTIFACT_COLUMNS} FROM artifacts WHERE project_id = ? AND kind = ?"
        ),
        params![project_id.to_string(), kind.to_string()],
        ArtifactRecord::from_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// All artifact rows for a project.
pub fn artifacts_for_project(
    conn: &Connection,
    project_id: ProjectId,
) -> Result<Vec<ArtifactRecord>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {ARTIFACT_COLUMNS} FROM artifacts WHERE project_id = ? ORDER BY kind"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let records = stmt
        .query_map([project_id.to_string()], ArtifactRecord::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(records)
}

/// Drop the provenance row for one artifact. Returns whether a row existed.
pub fn delete_artifact(
    conn: &Connection,
    project_id: ProjectId,
    kind: ArtifactKind,
) -> Result<bool> {
    let affected = conn
        .execute(
            "DELETE FROM artifacts WHERE project_id = ? AND kind = ?",
            params![project_id.to_string(), kind.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(affected > 0)
}

/// Drop every provenance row for a project. Returns the number removed.
pub fn delete_all_artifacts(conn: &Connection, project_id: ProjectId) -> Result<usize> {
    conn.execute(
        "DELETE FROM artifacts WHERE project_id = ?",
        [project_id.to_string()],
    )
    .map_err(|e| Error::database(e.to_string()))
}
