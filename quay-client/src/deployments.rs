//! Deployment and log API endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use quay_core::domain::log::LogEvent;
use quay_core::dto::deployment::{TriggerDeploymentRequest, TriggerDeploymentResponse};
use quay_core::dto::log::LogsResponse;
use uuid::Uuid;

impl OrchestratorClient {
    /// Trigger a new deployment for a project
    ///
    /// # Returns
    /// The deployment id and the preview URL the build will be served from
    pub async fn trigger_deployment(&self, project_id: Uuid) -> Result<TriggerDeploymentResponse> {
        let url = format!("{}/deploy", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&TriggerDeploymentRequest { project_id })
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get the persisted log events of a deployment, timestamp ascending
    ///
    /// An empty list means the build has not produced output yet; readers
    /// detect completion by the sentinel log line.
    pub async fn get_logs(&self, deployment_id: Uuid) -> Result<Vec<LogEvent>> {
        let url = format!("{}/logs/{}", self.base_url, deployment_id);
        let response = self.client.get(&url).send().await?;

        let body: LogsResponse = self.handle_response(response).await?;
        Ok(body.logs)
    }
}
