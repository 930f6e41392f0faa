//! User API endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use quay_core::domain::user::UserProfile;
use quay_core::dto::user::{LoginRequest, LoginResponse};

impl OrchestratorClient {
    /// Find or create the profile for a user id (idempotent)
    pub async fn login(
        &self,
        user_id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<UserProfile> {
        let url = format!("{}/login", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                user_id: user_id.into(),
                name: name.into(),
                email: email.into(),
            })
            .send()
            .await?;

        let body: LoginResponse = self.handle_response(response).await?;
        Ok(body.profile)
    }
}
