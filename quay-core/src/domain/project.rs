//! Project domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A deployable project
///
/// Owned by the orchestrator; the reverse proxy reads it to resolve
/// subdomains. The subdomain is generated at creation time, globally
/// unique, and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "sourceRepoURL")]
    pub source_repo_url: String,
    pub subdomain: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
