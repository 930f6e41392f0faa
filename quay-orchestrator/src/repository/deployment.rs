//! Deployment Repository
//!
//! Handles all database operations related to deployments. Status updates
//! are guarded so that the QUEUED -> IN_PROGRESS -> {READY | FAILED}
//! progression is enforced at the row level: a stale or out-of-order
//! update simply affects zero rows.

use quay_core::domain::deployment::{Deployment, DeploymentStatus};
use sqlx::PgPool;
use uuid::Uuid;

/// Create a new deployment in QUEUED state
pub async fn create(pool: &PgPool, project_id: Uuid) -> Result<Deployment, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = chrono::Utc::now();

    sqlx::query(
        r#"
        INSERT INTO deployments (id, project_id, status, created_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(id)
    .bind(project_id)
    .bind(status_to_string(DeploymentStatus::Queued))
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Deployment {
        id,
        project_id,
        status: DeploymentStatus::Queued,
        created_at: now,
    })
}

/// Find a deployment by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Deployment>, sqlx::Error> {
    let row = sqlx::query_as::<_, DeploymentRow>(
        r#"
        SELECT id, project_id, status, created_at
        FROM deployments
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// List deployments of a project, newest first
pub async fn find_by_project(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Vec<Deployment>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DeploymentRow>(
        r#"
        SELECT id, project_id, status, created_at
        FROM deployments
        WHERE project_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Mark a QUEUED deployment as IN_PROGRESS
///
/// Returns whether a row was updated.
pub async fn mark_in_progress(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE deployments SET status = $1
        WHERE id = $2 AND status = $3
        "#,
    )
    .bind(status_to_string(DeploymentStatus::InProgress))
    .bind(id)
    .bind(status_to_string(DeploymentStatus::Queued))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Mark a non-terminal deployment as READY or FAILED
///
/// Returns whether a row was updated; a deployment already in a terminal
/// state is left untouched.
pub async fn mark_terminal(
    pool: &PgPool,
    id: Uuid,
    status: DeploymentStatus,
) -> Result<bool, sqlx::Error> {
    debug_assert!(status.is_terminal());

    let result = sqlx::query(
        r#"
        UPDATE deployments SET status = $1
        WHERE id = $2 AND status IN ($3, $4)
        "#,
    )
    .bind(status_to_string(status))
    .bind(id)
    .bind(status_to_string(DeploymentStatus::Queued))
    .bind(status_to_string(DeploymentStatus::InProgress))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Helper Functions
// =============================================================================

fn status_to_string(status: DeploymentStatus) -> &'static str {
    match status {
        DeploymentStatus::Queued => "QUEUED",
        DeploymentStatus::InProgress => "IN_PROGRESS",
        DeploymentStatus::Ready => "READY",
        DeploymentStatus::Failed => "FAILED",
    }
}

fn string_to_status(s: &str) -> DeploymentStatus {
    match s {
        "QUEUED" => DeploymentStatus::Queued,
        "IN_PROGRESS" => DeploymentStatus::InProgress,
        "READY" => DeploymentStatus::Ready,
        "FAILED" => DeploymentStatus::Failed,
        _ => DeploymentStatus::Failed,
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct DeploymentRow {
    id: Uuid,
    project_id: Uuid,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<DeploymentRow> for Deployment {
    fn from(row: DeploymentRow) -> Self {
        Deployment {
            id: row.id,
            project_id: row.project_id,
            status: string_to_status(&row.status),
            created_at: row.created_at,
        }
    }
}
