use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create projects table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id UUID PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            source_repo_url TEXT NOT NULL,
            subdomain VARCHAR(255) NOT NULL UNIQUE,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create deployments table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS deployments (
            id UUID PRIMARY KEY,
            project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            status VARCHAR(20) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create log events table. No foreign key on deployment_id: events are
    // ingested from the channel and must never fail to persist because the
    // producer referenced an unknown deployment.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS log_events (
            event_id UUID PRIMARY KEY,
            deployment_id UUID NOT NULL,
            message TEXT NOT NULL,
            timestamp TIMESTAMPTZ NOT NULL,
            channel_seq BIGINT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create users table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            user_id VARCHAR(255) PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            email VARCHAR(255) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Dead-letter destination for channel payloads that fail schema
    // validation at ingestion
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dead_letters (
            id SERIAL PRIMARY KEY,
            topic TEXT NOT NULL,
            payload BYTEA NOT NULL,
            reason TEXT NOT NULL,
            received_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for better query performance
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_deployments_project_id ON deployments(project_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_log_events_deployment ON log_events(deployment_id, timestamp, channel_seq)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
