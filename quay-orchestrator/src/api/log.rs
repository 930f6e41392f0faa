//! Log API Handlers
//!
//! HTTP endpoints for reading deployment logs.

use axum::{
    Json,
    extract::{Path, State},
};
use quay_core::dto::log::LogsResponse;
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::log_service;

/// GET /logs/{deployment_id}
/// Get the persisted log events of a deployment, timestamp ascending
///
/// A deployment whose build has produced no output yet yields an empty
/// list, not an error.
pub async fn get_deployment_logs(
    State(state): State<AppState>,
    Path(deployment_id): Path<Uuid>,
) -> ApiResult<Json<LogsResponse>> {
    tracing::debug!("Getting logs for deployment: {}", deployment_id);

    let logs = log_service::get_deployment_logs(&state.pool, deployment_id)
        .await
        .map_err(|e| match e {
            log_service::LogError::DeploymentNotFound(id) => {
                ApiError::NotFound(format!("Deployment {} not found", id))
            }
            log_service::LogError::DatabaseError(err) => ApiError::DatabaseError(err),
        })?;

    Ok(Json(LogsResponse { logs }))
}
