//! Project Repository
//!
//! Handles all database operations related to projects.

use quay_core::domain::project::Project;
use sqlx::PgPool;
use uuid::Uuid;

/// Create a new project
///
/// Fails with a unique-constraint violation if `subdomain` is taken; the
/// service layer treats that as a signal to regenerate the slug.
pub async fn create(
    pool: &PgPool,
    name: &str,
    source_repo_url: &str,
    subdomain: &str,
) -> Result<Project, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = chrono::Utc::now();

    sqlx::query(
        r#"
        INSERT INTO projects (id, name, source_repo_url, subdomain, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(source_repo_url)
    .bind(subdomain)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Project {
        id,
        name: name.to_string(),
        source_repo_url: source_repo_url.to_string(),
        subdomain: subdomain.to_string(),
        created_at: now,
    })
}

/// Find a project by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Project>, sqlx::Error> {
    let row = sqlx::query_as::<_, ProjectRow>(
        r#"
        SELECT id, name, source_repo_url, subdomain, created_at
        FROM projects
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Find a project by its unique subdomain
pub async fn find_by_subdomain(
    pool: &PgPool,
    subdomain: &str,
) -> Result<Option<Project>, sqlx::Error> {
    let row = sqlx::query_as::<_, ProjectRow>(
        r#"
        SELECT id, name, source_repo_url, subdomain, created_at
        FROM projects
        WHERE subdomain = $1
        "#,
    )
    .bind(subdomain)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    name: String,
    source_repo_url: String,
    subdomain: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: row.id,
            name: row.name,
            source_repo_url: row.source_repo_url,
            subdomain: row.subdomain,
            created_at: row.created_at,
        }
    }
}
