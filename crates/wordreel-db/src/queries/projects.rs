//! Project query operations.
//!
//! Status updates are guarded by `ProjectStatus::can_transition_to` and by
//! a compare-and-swap on the current status, so an illegal or concurrent
//! transition fails loudly instead of corrupting the state machine.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use wordreel_common::{Error, ProjectId, ProjectStatus, Result, Stage, VideoPlan};

use crate::models::Project;

const PROJECT_COLUMNS: &str =
    "id, slug, prompt, status, asset_dir, plan_json, failed_stage, failure_reason, \
     created_at, updated_at";

/// Create a new project in the `Created` state.
///
/// The slug starts as a placeholder derived from the id; `store_plan`
/// replaces it with the durable slug once the plan names one.
pub fn create_project(conn: &Connection, prompt: &str) -> Result<Project> {
    let id = ProjectId::new();
    let now = Utc::now();
    let slug = format!("pending-{}", &id.to_string()[..8]);

    conn.execute(
        "INSERT INTO projects (id, slug, prompt, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            id.to_string(),
            &slug,
            prompt,
            ProjectStatus::Created.to_string(),
            now.to_rfc3339(),
            now.to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Project {
        id,
        slug,
        prompt: prompt.to_string(),
        status: ProjectStatus::Created,
        asset_dir: None,
        plan: None,
        failed_stage: None,
        failure_reason: None,
        created_at: now,
        updated_at: now,
    })
}

/// Persist the plan, the durable slug, and the asset directory, and move
/// the project to `PlanReady` -- all in one statement, so the plan is
/// never durable without the transition and vice versa.
///
/// Fails if the project is not in `Planning` or already holds a plan:
/// a persisted plan is immutable.
pub fn store_plan(
    conn: &Connection,
    id: ProjectId,
    slug: &str,
    asset_dir: &str,
    plan: &VideoPlan,
) -> Result<()> {
    let plan_json =
        serde_json::to_string(plan).map_err(|e| Error::internal(e.to_string()))?;
    let now = Utc::now();

    let affected = conn
        .execute(
            "UPDATE projects
             SET slug = ?, asset_dir = ?, plan_json = ?, status = ?, updated_at = ?
             WHERE id = ? AND status = ? AND plan_json IS NULL",
            params![
                slug,
                asset_dir,
                plan_json,
                ProjectStatus::PlanReady.to_string(),
                now.to_rfc3339(),
                id.to_string(),
                ProjectStatus::Planning.to_string(),
            ],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if affected == 0 {
        return Err(Error::internal(format!(
            "cannot store plan for project {id}: not in planning state or plan already set"
        )));
    }

    Ok(())
}

/// Transition a project to a new status.
///
/// Leaving any non-`Failed` state clears the failure context. Returns
/// `Error::Internal` for transitions the state machine forbids.
pub fn set_status(conn: &Connection, id: ProjectId, next: ProjectStatus) -> Result<()> {
    let current = get_project(conn, id)?.status;

    if !current.can_transition_to(next) {
        return Err(Error::internal(format!(
            "illegal status transition for project {id}: {current} -> {next}"
        )));
    }

    let now = Utc::now();
    let affected = conn
        .execute(
            "UPDATE projects
             SET status = ?, failed_stage = NULL, failure_reason = NULL, updated_at = ?
             WHERE id = ? AND status = ?",
            params![
                next.to_string(),
                now.to_rfc3339(),
                id.to_string(),
                current.to_string(),
            ],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if affected == 0 {
        return Err(Error::database(format!(
            "project {id} was modified concurrently during {current} -> {next}"
        )));
    }

    Ok(())
}

/// Move a project to `Failed`, recording the stage and reason so a resume
/// can re-enter exactly the failed stage.
pub fn mark_failed(conn: &Connection, id: ProjectId, stage: Stage, reason: &str) -> Result<()> {
    let now = Utc::now();
    let affected = conn
        .execute(
            "UPDATE projects
             SET status = ?, failed_stage = ?, failure_reason = ?, updated_at = ?
             WHERE id = ?",
            params![
                ProjectStatus::Failed.to_string(),
                stage.to_string(),
                reason,
                now.to_rfc3339(),
                id.to_string(),
            ],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if affected == 0 {
        return Err(Error::not_found(format!("project {id}")));
    }

    Ok(())
}

/// Get a project by ID.
pub fn get_project(conn: &Connection, id: ProjectId) -> Result<Project> {
    conn.query_row(
        &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"),
        [id.to_string()],
        Project::from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => Error::not_found(format!("project {id}")),
        _ => Error::database(e.to_string()),
    })
}

/// Get a project by its stable slug.
pub fn get_project_by_slug(conn: &Connection, slug: &str) -> Result<Project> {
    conn.query_row(
        &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE slug = ?"),
        [slug],
        Project::from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => Error::not_found(format!("project '{slug}'")),
        _ => Error::database(e.to_string()),
    })
}

/// The most recently modified project, if any.
pub fn latest_project(conn: &Connection) -> Result<Option<Project>> {
    conn.query_row(
        &format!(
            "SELECT {PROJECT_COLUMNS} FROM projects
             ORDER BY updated_at DESC, created_at DESC LIMIT 1"
        ),
        [],
        Project::from_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// The most recently failed project, if any.
pub fn latest_failed_project(conn: &Connection) -> Result<Option<Project>> {
    conn.query_row(
        &format!(
            "SELECT {PROJECT_COLUMNS} FROM projects
             WHERE status = ?
             ORDER BY updated_at DESC, created_at DESC LIMIT 1"
        ),
        [ProjectStatus::Failed.to_string()],
        Project::from_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// List projects ordered by most recent modification.
pub fn list_projects(conn: &Connection, limit: usize) -> Result<Vec<Project>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects
             ORDER BY updated_at DESC, created_at DESC LIMIT ?"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let projects = stmt
        .query_map([limit as i64], Project::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(projects)
}

/// Delete a project. Its log entries and artifact rows cascade.
pub fn delete_project(conn: &Connection, id: ProjectId) -> Result<bool> {
    let affected = conn
        .execute("DELETE FROM projects WHERE id = ?", [id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(affected > 0)
}
