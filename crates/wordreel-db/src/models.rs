//! Rust models matching the database schema.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::Serialize;
use wordreel_common::{ArtifactKind, LogLevel, ProjectId, ProjectStatus, Stage, VideoPlan};

/// One generation project.
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: ProjectId,
    /// Stable human-readable identity, unique across the store. Starts as a
    /// placeholder until the plan supplies the real slug.
    pub slug: String,
    /// The free-text prompt the project was created from.
    pub prompt: String,
    pub status: ProjectStatus,
    /// Project-scoped artifact directory; set together with the plan.
    pub asset_dir: Option<String>,
    /// The persisted plan; immutable once written.
    pub plan: Option<VideoPlan>,
    /// Stage that failed; present iff status is Failed.
    pub failed_stage: Option<Stage>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Map a row in column order (id, slug, prompt, status, asset_dir,
    /// plan_json, failed_stage, failure_reason, created_at, updated_at).
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let id_str: String = row.get(0)?;
        let status_str: String = row.get(3)?;
        let plan_json: Option<String> = row.get(5)?;
        let failed_stage: Option<String> = row.get(6)?;

        Ok(Project {
            id: id_str
                .parse::<uuid::Uuid>()
                .map_err(|e| text_error(0, e))?
                .into(),
            slug: row.get(1)?,
            prompt: row.get(2)?,
            status: status_str.parse().map_err(|e| text_error(3, e))?,
            asset_dir: row.get(4)?,
            plan: plan_json
                .map(|json| serde_json::from_str(&json))
                .transpose()
                .map_err(|e| text_error(5, e))?,
            failed_stage: failed_stage
                .map(|s| s.parse())
                .transpose()
                .map_err(|e| text_error(6, e))?,
            failure_reason: row.get(7)?,
            created_at: parse_timestamp(row, 8)?,
            updated_at: parse_timestamp(row, 9)?,
        })
    }
}

/// One append-only audit record.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub id: i64,
    pub project_id: ProjectId,
    /// Monotonic, gap-free per project.
    pub seq: i64,
    pub level: LogLevel,
    pub message: String,
    /// Structured payload, e.g. the exact prompt sent to an external call.
    pub payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    /// Map a row in column order (id, project_id, seq, level, message,
    /// payload, created_at).
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let project_id: String = row.get(1)?;
        let level: String = row.get(3)?;
        let payload: Option<String> = row.get(5)?;

        Ok(LogEntry {
            id: row.get(0)?,
            project_id: project_id
                .parse::<uuid::Uuid>()
                .map_err(|e| text_error(1, e))?
                .into(),
            seq: row.get(2)?,
            level: level.parse().map_err(|e| text_error(3, e))?,
            message: row.get(4)?,
            payload: payload
                .map(|json| serde_json::from_str(&json))
                .transpose()
                .map_err(|e| text_error(5, e))?,
            created_at: parse_timestamp(row, 6)?,
        })
    }
}

/// Provenance row for one generated artifact.
#[derive(Debug, Clone)]
pub struct ArtifactRecord {
    pub project_id: ProjectId,
    pub kind: ArtifactKind,
    pub file_path: String,
    /// Digest of the plan fields (and upstream artifacts) that produced
    /// this file. Staleness is derived by comparing against the currently
    /// expected digest; it is never stored.
    pub provenance: String,
    /// Clip length in seconds for audio artifacts; feeds the video
    /// duration calculation.
    pub duration_secs: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl ArtifactRecord {
    /// Map a row in column order (project_id, kind, file_path, provenance,
    /// duration_secs, created_at).
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let project_id: String = row.get(0)?;
        let kind: String = row.get(1)?;

        Ok(ArtifactRecord {
            project_id: project_id
                .parse::<uuid::Uuid>()
                .map_err(|e| text_error(0, e))?
                .into(),
            kind: kind.parse().map_err(|e| text_error(1, e))?,
            file_path: row.get(2)?,
            provenance: row.get(3)?,
            duration_secs: row.get(4)?,
            created_at: parse_timestamp(row, 5)?,
        })
    }
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| text_error(idx, e))
}

fn text_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}
