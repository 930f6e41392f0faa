//! Project Service
//!
//! Business logic for project creation and lookup.

use quay_core::domain::project::Project;
use quay_core::dto::project::CreateProjectRequest;
use quay_core::slug;
use sqlx::PgPool;
use uuid::Uuid;

use crate::repository::project_repository;

/// How many generated subdomains are tried before giving up
const MAX_SLUG_ATTEMPTS: usize = 3;

/// Service error type
#[derive(Debug)]
pub enum ProjectError {
    NotFound(Uuid),
    ValidationError(String),
    /// Every generated subdomain collided with an existing project
    SlugExhausted,
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for ProjectError {
    fn from(err: sqlx::Error) -> Self {
        ProjectError::DatabaseError(err)
    }
}

/// Create a new project with a freshly generated subdomain
///
/// Slug collisions surface as unique-constraint violations and trigger
/// regeneration, bounded by [`MAX_SLUG_ATTEMPTS`].
pub async fn create_project(
    pool: &PgPool,
    req: CreateProjectRequest,
) -> Result<Project, ProjectError> {
    validate_new_project(&req)?;

    for attempt in 1..=MAX_SLUG_ATTEMPTS {
        let subdomain = slug::generate_subdomain();

        match project_repository::create(pool, &req.name, &req.source_repo_url, &subdomain).await {
            Ok(project) => {
                tracing::info!("Project created: {} ({})", project.id, project.subdomain);
                return Ok(project);
            }
            Err(err) if is_unique_violation(&err) => {
                tracing::warn!(
                    "Subdomain {} already taken (attempt {}/{})",
                    subdomain,
                    attempt,
                    MAX_SLUG_ATTEMPTS
                );
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(ProjectError::SlugExhausted)
}

/// Get a project by ID
pub async fn get_project(pool: &PgPool, id: Uuid) -> Result<Project, ProjectError> {
    let project = project_repository::find_by_id(pool, id)
        .await?
        .ok_or(ProjectError::NotFound(id))?;

    Ok(project)
}

// =============================================================================
// Validation
// =============================================================================

fn validate_new_project(req: &CreateProjectRequest) -> Result<(), ProjectError> {
    if req.name.trim().is_empty() {
        return Err(ProjectError::ValidationError(
            "Project name cannot be empty".to_string(),
        ));
    }

    let parsed = url::Url::parse(&req.source_repo_url).map_err(|e| {
        ProjectError::ValidationError(format!("Invalid repository URL: {}", e))
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ProjectError::ValidationError(format!(
            "Unsupported repository URL scheme: {}",
            parsed.scheme()
        )));
    }

    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
