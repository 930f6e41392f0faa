//! Project-related API endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use quay_core::domain::deployment::Deployment;
use quay_core::domain::project::Project;
use quay_core::dto::project::{CreateProjectRequest, CreateProjectResponse};
use uuid::Uuid;

impl OrchestratorClient {
    /// Create a new project
    ///
    /// # Arguments
    /// * `name` - Display name of the project
    /// * `source_repo_url` - Repository the project is built from
    ///
    /// # Returns
    /// The created project, including its generated subdomain
    pub async fn create_project(
        &self,
        name: impl Into<String>,
        source_repo_url: impl Into<String>,
    ) -> Result<Project> {
        let url = format!("{}/project", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&CreateProjectRequest {
                name: name.into(),
                source_repo_url: source_repo_url.into(),
            })
            .send()
            .await?;

        let body: CreateProjectResponse = self.handle_response(response).await?;
        Ok(body.project)
    }

    /// Get a project by ID
    pub async fn get_project(&self, project_id: Uuid) -> Result<Project> {
        let url = format!("{}/project/{}", self.base_url, project_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// List all deployments of a project, newest first
    pub async fn list_deployments(&self, project_id: Uuid) -> Result<Vec<Deployment>> {
        let url = format!("{}/project/{}/deployments", self.base_url, project_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }
}
