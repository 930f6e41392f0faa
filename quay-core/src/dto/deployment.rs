//! Deployment DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to trigger a deployment for an existing project
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerDeploymentRequest {
    pub project_id: Uuid,
}

/// Response body of a successful deployment trigger
///
/// `deployed_url` is the preview URL the artifacts will be served from
/// once the build completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerDeploymentResponse {
    pub deployment_id: Uuid,
    pub deployed_url: String,
}
