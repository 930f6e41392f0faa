//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod deployment;
pub mod error;
pub mod health;
pub mod log;
pub mod project;
pub mod user;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::dispatch::TaskDispatcher;

/// Shared state injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub dispatcher: Arc<dyn TaskDispatcher>,
    pub config: Arc<Config>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Project endpoints
        .route("/project", post(project::create_project))
        .route("/project/{id}", get(project::get_project))
        .route(
            "/project/{id}/deployments",
            get(project::list_project_deployments),
        )
        // Deployment endpoints
        .route("/deploy", post(deployment::trigger_deployment))
        .route("/logs/{deployment_id}", get(log::get_deployment_logs))
        // User endpoints
        .route("/login", post(user::login))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
