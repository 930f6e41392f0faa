//! Builder configuration
//!
//! The worker receives its task identity (source URL, project and
//! deployment ids) as environment overrides from the dispatcher, plus the
//! ambient wiring for the log channel and the artifact store. These
//! environment variables are its only inputs; there is no shared state
//! with the orchestrator process.

use std::path::PathBuf;

use anyhow::Result;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Config {
    /// Repository to build
    pub source_repo_url: String,

    /// Project the artifacts are published under
    pub project_id: Uuid,

    /// Deployment every log event is keyed by
    pub deployment_id: Uuid,

    /// Postgres connection string of the log event channel
    pub channel_database_url: String,

    /// Object store URL artifacts are uploaded to
    /// (e.g. `file:///var/lib/quay/artifacts` or `s3://bucket`)
    pub artifact_store_url: String,

    /// Directory the source is checked out into
    pub workspace_dir: PathBuf,

    /// Build output directory, relative to the workspace
    pub output_subdir: String,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Required: SOURCE_REPO_URL, PROJECT_ID, DEPLOYMENT_ID,
    /// CHANNEL_DATABASE_URL, ARTIFACT_STORE_URL.
    /// Optional: WORKSPACE_DIR (default: ./workspace), OUTPUT_SUBDIR
    /// (default: dist).
    pub fn from_env() -> Result<Self> {
        let source_repo_url = require("SOURCE_REPO_URL")?;

        let project_id = require("PROJECT_ID")?
            .parse::<Uuid>()
            .map_err(|e| anyhow::anyhow!("PROJECT_ID is not a valid UUID: {}", e))?;

        let deployment_id = require("DEPLOYMENT_ID")?
            .parse::<Uuid>()
            .map_err(|e| anyhow::anyhow!("DEPLOYMENT_ID is not a valid UUID: {}", e))?;

        let channel_database_url = require("CHANNEL_DATABASE_URL")?;
        let artifact_store_url = require("ARTIFACT_STORE_URL")?;

        let workspace_dir = std::env::var("WORKSPACE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("workspace"));

        let output_subdir =
            std::env::var("OUTPUT_SUBDIR").unwrap_or_else(|_| "dist".to_string());

        Ok(Self {
            source_repo_url,
            project_id,
            deployment_id,
            channel_database_url,
            artifact_store_url,
            workspace_dir,
            output_subdir,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.source_repo_url.is_empty() {
            anyhow::bail!("source_repo_url cannot be empty");
        }

        if self.channel_database_url.is_empty() {
            anyhow::bail!("channel_database_url cannot be empty");
        }

        if self.artifact_store_url.is_empty() {
            anyhow::bail!("artifact_store_url cannot be empty");
        }

        if self.output_subdir.is_empty() {
            anyhow::bail!("output_subdir cannot be empty");
        }

        Ok(())
    }
}

fn require(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| anyhow::anyhow!("{} environment variable not set", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            source_repo_url: "https://example.com/org/repo".to_string(),
            project_id: Uuid::new_v4(),
            deployment_id: Uuid::new_v4(),
            channel_database_url: "postgres://localhost/quay".to_string(),
            artifact_store_url: "file:///tmp/artifacts".to_string(),
            workspace_dir: PathBuf::from("workspace"),
            output_subdir: "dist".to_string(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = sample();
        config.source_repo_url = String::new();
        assert!(config.validate().is_err());

        let mut config = sample();
        config.output_subdir = String::new();
        assert!(config.validate().is_err());
    }
}
