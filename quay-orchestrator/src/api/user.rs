//! User API Handlers
//!
//! HTTP endpoint for the idempotent login upsert.

use axum::{Json, extract::State};
use quay_core::dto::user::{LoginRequest, LoginResponse};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::user_service;

/// POST /login
/// Find or create the profile for the given user id
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    tracing::debug!("Login for user: {}", req.user_id);

    let profile = user_service::login(&state.pool, req)
        .await
        .map_err(|e| match e {
            user_service::UserError::ValidationError(msg) => ApiError::BadRequest(msg),
            user_service::UserError::DatabaseError(err) => ApiError::DatabaseError(err),
        })?;

    Ok(Json(LoginResponse { profile }))
}
