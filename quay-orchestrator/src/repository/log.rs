//! Log Event Repository
//!
//! Handles the append-only log store and the dead-letter table. Events are
//! keyed by deployment and ordered by `(timestamp, channel_seq)`, the
//! channel sequence acting as the tie-break for lines ingested within the
//! same timestamp.

use quay_core::domain::log::LogEvent;
use sqlx::PgPool;
use uuid::Uuid;

/// A log event about to be persisted
///
/// The event id is assigned at insert time, not by the producer, so
/// redelivered channel messages become distinct rows rather than failed
/// inserts.
#[derive(Debug, Clone)]
pub struct NewLogEvent {
    pub deployment_id: Uuid,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub channel_seq: i64,
}

/// Persist a batch of log events
pub async fn insert_events(pool: &PgPool, events: &[NewLogEvent]) -> Result<(), sqlx::Error> {
    for event in events {
        sqlx::query(
            r#"
            INSERT INTO log_events (event_id, deployment_id, message, timestamp, channel_seq)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event.deployment_id)
        .bind(&event.message)
        .bind(event.timestamp)
        .bind(event.channel_seq)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Get all log events for a deployment, in timestamp order
pub async fn find_by_deployment(
    pool: &PgPool,
    deployment_id: Uuid,
) -> Result<Vec<LogEvent>, sqlx::Error> {
    let rows = sqlx::query_as::<_, LogEventRow>(
        r#"
        SELECT event_id, deployment_id, message, timestamp
        FROM log_events
        WHERE deployment_id = $1
        ORDER BY timestamp ASC, channel_seq ASC
        "#,
    )
    .bind(deployment_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Record a channel payload that failed schema validation
pub async fn insert_dead_letter(
    pool: &PgPool,
    topic: &str,
    payload: &[u8],
    reason: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO dead_letters (topic, payload, reason, received_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(topic)
    .bind(payload)
    .bind(reason)
    .bind(chrono::Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct LogEventRow {
    event_id: Uuid,
    deployment_id: Uuid,
    message: String,
    timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<LogEventRow> for LogEvent {
    fn from(row: LogEventRow) -> Self {
        LogEvent {
            event_id: row.event_id,
            deployment_id: row.deployment_id,
            message: row.message,
            timestamp: row.timestamp,
        }
    }
}
