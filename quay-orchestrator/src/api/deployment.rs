//! Deployment API Handlers
//!
//! HTTP endpoints for triggering deployments.

use axum::{Json, extract::State};
use quay_core::dto::deployment::{TriggerDeploymentRequest, TriggerDeploymentResponse};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::dispatch::DispatchError;
use crate::service::deployment_service;

/// POST /deploy
/// Create a QUEUED deployment and dispatch its build task
pub async fn trigger_deployment(
    State(state): State<AppState>,
    Json(req): Json<TriggerDeploymentRequest>,
) -> ApiResult<Json<TriggerDeploymentResponse>> {
    tracing::info!("Triggering deployment for project: {}", req.project_id);

    let (deployment, deployed_url) = deployment_service::trigger_deployment(
        &state.pool,
        state.dispatcher.as_ref(),
        state.config.dispatch_timeout,
        &state.config.preview_host,
        req.project_id,
    )
    .await
    .map_err(|e| match e {
        deployment_service::DeploymentError::ProjectNotFound(id) => {
            ApiError::NotFound(format!("Project {} not found", id))
        }
        deployment_service::DeploymentError::NotFound(id) => {
            ApiError::NotFound(format!("Deployment {} not found", id))
        }
        deployment_service::DeploymentError::Dispatch(err) => {
            ApiError::BadGateway(dispatch_message(err))
        }
        deployment_service::DeploymentError::DatabaseError(err) => ApiError::DatabaseError(err),
    })?;

    Ok(Json(TriggerDeploymentResponse {
        deployment_id: deployment.id,
        deployed_url,
    }))
}

fn dispatch_message(err: DispatchError) -> String {
    match err {
        DispatchError::Unavailable(msg) => {
            format!("Build scheduler unavailable: {}", msg)
        }
        DispatchError::TimedOut => "Build dispatch timed out".to_string(),
    }
}
