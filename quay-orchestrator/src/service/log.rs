//! Log Service
//!
//! Read-side business logic for deployment logs. Writes happen only in
//! the ingestion pipeline; this service exposes the ordered view.

use quay_core::domain::log::LogEvent;
use sqlx::PgPool;
use uuid::Uuid;

use crate::repository::{deployment_repository, log_repository};

/// Service error type
#[derive(Debug)]
pub enum LogError {
    DeploymentNotFound(Uuid),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for LogError {
    fn from(err: sqlx::Error) -> Self {
        LogError::DatabaseError(err)
    }
}

/// Get all log events for a deployment in timestamp order
///
/// An existing deployment with no ingested events yields an empty list,
/// indistinguishable from a build that has not produced output yet.
pub async fn get_deployment_logs(
    pool: &PgPool,
    deployment_id: Uuid,
) -> Result<Vec<LogEvent>, LogError> {
    let _deployment = deployment_repository::find_by_id(pool, deployment_id)
        .await?
        .ok_or(LogError::DeploymentNotFound(deployment_id))?;

    let logs = log_repository::find_by_deployment(pool, deployment_id).await?;

    Ok(logs)
}
