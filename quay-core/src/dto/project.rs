//! Project DTOs

use serde::{Deserialize, Serialize};

use crate::domain::project::Project;

/// Request to create a new project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(rename = "sourceRepoURL")]
    pub source_repo_url: String,
}

/// Response body of a successful project creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectResponse {
    pub project: Project,
}
