//! Project API Handlers
//!
//! HTTP endpoints for project management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use quay_core::domain::deployment::Deployment;
use quay_core::domain::project::Project;
use quay_core::dto::project::{CreateProjectRequest, CreateProjectResponse};
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::{deployment_service, project_service};

/// POST /project
/// Create a new project with a generated preview subdomain
pub async fn create_project(
    State(state): State<AppState>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<CreateProjectResponse>)> {
    tracing::info!("Creating project: {}", req.name);

    let project = project_service::create_project(&state.pool, req)
        .await
        .map_err(map_project_error)?;

    Ok((StatusCode::CREATED, Json(CreateProjectResponse { project })))
}

/// GET /project/{id}
/// Get project details by ID
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    tracing::debug!("Getting project: {}", id);

    let project = project_service::get_project(&state.pool, id)
        .await
        .map_err(map_project_error)?;

    Ok(Json(project))
}

/// GET /project/{id}/deployments
/// List all deployments of a project, newest first
pub async fn list_project_deployments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Deployment>>> {
    tracing::debug!("Listing deployments for project: {}", id);

    let deployments = deployment_service::list_deployments(&state.pool, id)
        .await
        .map_err(|e| match e {
            deployment_service::DeploymentError::ProjectNotFound(id) => {
                ApiError::NotFound(format!("Project {} not found", id))
            }
            deployment_service::DeploymentError::NotFound(id) => {
                ApiError::NotFound(format!("Deployment {} not found", id))
            }
            deployment_service::DeploymentError::DatabaseError(err) => ApiError::DatabaseError(err),
            deployment_service::DeploymentError::Dispatch(err) => {
                ApiError::InternalError(format!("Unexpected dispatch error: {:?}", err))
            }
        })?;

    Ok(Json(deployments))
}

fn map_project_error(e: project_service::ProjectError) -> ApiError {
    match e {
        project_service::ProjectError::NotFound(id) => {
            ApiError::NotFound(format!("Project {} not found", id))
        }
        project_service::ProjectError::ValidationError(msg) => ApiError::BadRequest(msg),
        project_service::ProjectError::SlugExhausted => ApiError::Conflict(
            "Could not allocate a unique subdomain, please retry".to_string(),
        ),
        project_service::ProjectError::DatabaseError(err) => ApiError::DatabaseError(err),
    }
}
