//! User DTOs

use serde::{Deserialize, Serialize};

use crate::domain::user::UserProfile;

/// Login request: idempotent upsert of a profile by user id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub name: String,
    pub email: String,
    pub user_id: String,
}

/// Login response, identical in the create and found cases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub profile: UserProfile,
}
