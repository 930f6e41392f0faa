//! User profile domain types

use serde::{Deserialize, Serialize};

/// A user profile, keyed by an externally issued user id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub name: String,
    pub email: String,
}
