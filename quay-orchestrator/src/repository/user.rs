//! User Repository
//!
//! Handles database operations for user profiles.

use quay_core::domain::user::UserProfile;
use sqlx::PgPool;

/// Find a profile by its external user id
pub async fn find_by_user_id(
    pool: &PgPool,
    user_id: &str,
) -> Result<Option<UserProfile>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT user_id, name, email
        FROM users
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Create a new profile
pub async fn create(
    pool: &PgPool,
    user_id: &str,
    name: &str,
    email: &str,
) -> Result<UserProfile, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO users (user_id, name, email, created_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(user_id)
    .bind(name)
    .bind(email)
    .bind(chrono::Utc::now())
    .execute(pool)
    .await?;

    Ok(UserProfile {
        user_id: user_id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
    })
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: String,
    name: String,
    email: String,
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        UserProfile {
            user_id: row.user_id,
            name: row.name,
            email: row.email,
        }
    }
}
