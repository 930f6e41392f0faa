//! Quay HTTP Client
//!
//! A simple, type-safe HTTP client for the Quay orchestrator API.
//!
//! This crate is the integration surface for front-ends and tooling:
//! create a project, trigger a deployment, poll its logs.
//!
//! # Example
//!
//! ```no_run
//! use quay_client::OrchestratorClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), quay_client::ClientError> {
//!     let client = OrchestratorClient::new("http://localhost:9000");
//!
//!     let project = client
//!         .create_project("demo", "https://github.com/org/repo")
//!         .await?;
//!
//!     let deploy = client.trigger_deployment(project.id).await?;
//!     println!("Deploying at {}", deploy.deployed_url);
//!     Ok(())
//! }
//! ```

pub mod error;
mod deployments;
mod projects;
mod users;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the Quay orchestrator API
#[derive(Debug, Clone)]
pub struct OrchestratorClient {
    /// Base URL of the orchestrator (e.g., "http://localhost:9000")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl OrchestratorClient {
    /// Create a new orchestrator client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the orchestrator API
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Create a new orchestrator client with a custom HTTP client
    ///
    /// This allows configuring timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the orchestrator
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// Checks the status code and returns an appropriate error if the
    /// request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OrchestratorClient::new("http://localhost:9000");
        assert_eq!(client.base_url(), "http://localhost:9000");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = OrchestratorClient::new("http://localhost:9000/");
        assert_eq!(client.base_url(), "http://localhost:9000");
    }
}
