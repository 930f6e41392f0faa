//! Deployment Service
//!
//! Business logic for triggering deployments. A trigger creates the QUEUED
//! record first and only then dispatches the build task; a failed or
//! timed-out dispatch leaves the deployment QUEUED so the caller can
//! retry, because the orchestrator does not own build-execution state.

use std::time::Duration;

use quay_core::domain::deployment::Deployment;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dispatch::{BuildTask, DispatchError, TaskDispatcher};
use crate::repository::{deployment_repository, project_repository};

/// Service error type
#[derive(Debug)]
pub enum DeploymentError {
    ProjectNotFound(Uuid),
    NotFound(Uuid),
    Dispatch(DispatchError),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for DeploymentError {
    fn from(err: sqlx::Error) -> Self {
        DeploymentError::DatabaseError(err)
    }
}

/// Create a QUEUED deployment and dispatch its build task
///
/// Returns the deployment together with the preview URL the artifacts
/// will be served from.
pub async fn trigger_deployment(
    pool: &PgPool,
    dispatcher: &dyn TaskDispatcher,
    dispatch_timeout: Duration,
    preview_host: &str,
    project_id: Uuid,
) -> Result<(Deployment, String), DeploymentError> {
    let project = project_repository::find_by_id(pool, project_id)
        .await?
        .ok_or(DeploymentError::ProjectNotFound(project_id))?;

    let deployment = deployment_repository::create(pool, project_id).await?;

    tracing::info!(
        "Deployment {} created for project {}",
        deployment.id,
        project_id
    );

    let task = BuildTask {
        source_repo_url: project.source_repo_url.clone(),
        project_id,
        deployment_id: deployment.id,
    };

    match tokio::time::timeout(dispatch_timeout, dispatcher.dispatch(task)).await {
        Ok(Ok(handle)) => {
            tracing::info!("Deployment {} dispatched as task {}", deployment.id, handle.id);
        }
        Ok(Err(err)) => return Err(DeploymentError::Dispatch(err)),
        Err(_) => return Err(DeploymentError::Dispatch(DispatchError::TimedOut)),
    }

    let deployed_url = format!("http://{}.{}/", project.subdomain, preview_host);

    Ok((deployment, deployed_url))
}

/// Get a deployment by ID
pub async fn get_deployment(pool: &PgPool, id: Uuid) -> Result<Deployment, DeploymentError> {
    let deployment = deployment_repository::find_by_id(pool, id)
        .await?
        .ok_or(DeploymentError::NotFound(id))?;

    Ok(deployment)
}

/// List deployments of a project, newest first
pub async fn list_deployments(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Vec<Deployment>, DeploymentError> {
    // Verify project exists
    let _project = project_repository::find_by_id(pool, project_id)
        .await?
        .ok_or(DeploymentError::ProjectNotFound(project_id))?;

    let deployments = deployment_repository::find_by_project(pool, project_id).await?;
    Ok(deployments)
}
