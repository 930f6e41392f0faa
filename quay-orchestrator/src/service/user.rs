//! User Service
//!
//! Idempotent login-as-upsert for user profiles.

use quay_core::domain::user::UserProfile;
use quay_core::dto::user::LoginRequest;
use sqlx::PgPool;

use crate::repository::user_repository;

/// Service error type
#[derive(Debug)]
pub enum UserError {
    ValidationError(String),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for UserError {
    fn from(err: sqlx::Error) -> Self {
        UserError::DatabaseError(err)
    }
}

/// Find or create the profile for `user_id`
///
/// Both outcomes return the profile; a concurrent create racing on the
/// unique key falls back to the winner's row.
pub async fn login(pool: &PgPool, req: LoginRequest) -> Result<UserProfile, UserError> {
    validate_login(&req)?;

    if let Some(profile) = user_repository::find_by_user_id(pool, &req.user_id).await? {
        return Ok(profile);
    }

    match user_repository::create(pool, &req.user_id, &req.name, &req.email).await {
        Ok(profile) => Ok(profile),
        Err(err) if is_unique_violation(&err) => {
            let profile = user_repository::find_by_user_id(pool, &req.user_id)
                .await?
                .ok_or(UserError::DatabaseError(sqlx::Error::RowNotFound))?;
            Ok(profile)
        }
        Err(err) => Err(err.into()),
    }
}

// =============================================================================
// Validation
// =============================================================================

fn validate_login(req: &LoginRequest) -> Result<(), UserError> {
    if req.user_id.trim().is_empty() {
        return Err(UserError::ValidationError(
            "userId cannot be empty".to_string(),
        ));
    }

    if req.name.trim().is_empty() {
        return Err(UserError::ValidationError(
            "name cannot be empty".to_string(),
        ));
    }

    if req.email.trim().is_empty() {
        return Err(UserError::ValidationError(
            "email cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(user_id: &str, name: &str, email: &str) -> LoginRequest {
        LoginRequest {
            user_id: user_id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    #[test]
    fn test_validate_login_valid() {
        assert!(validate_login(&request("u-1", "Sam", "sam@example.com")).is_ok());
    }

    #[test]
    fn test_validate_login_rejects_blank_fields() {
        assert!(validate_login(&request("", "Sam", "sam@example.com")).is_err());
        assert!(validate_login(&request("u-1", " ", "sam@example.com")).is_err());
        assert!(validate_login(&request("u-1", "Sam", "")).is_err());
    }
}
