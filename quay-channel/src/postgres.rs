//! Postgres-backed channel
//!
//! Messages live in an append-only table ordered by a global sequence;
//! per-group cursors and partition leases live in a second table. At most
//! one consumer per group owns a partition at a time: ownership is taken
//! with a guarded update that only succeeds while the lease is free or
//! expired, and every poll renews it.

use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;
use uuid::Uuid;

use crate::{ChannelError, Consumer, Message, Producer, partition_for_key};

/// Partitions per topic
///
/// One partition preserves total publish order per topic; the log pipeline
/// only needs per-deployment order, which the key hashing already gives,
/// so this stays small by default.
const DEFAULT_PARTITIONS: i32 = 4;

/// Lease duration after which an unrenewed partition owner is evicted
const DEFAULT_LEASE: Duration = Duration::from_secs(30);

/// Durable channel over a Postgres database
#[derive(Clone)]
pub struct PgChannel {
    pool: PgPool,
    partitions: i32,
}

impl PgChannel {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            partitions: DEFAULT_PARTITIONS,
        }
    }

    #[allow(dead_code)]
    pub fn with_partitions(pool: PgPool, partitions: i32) -> Self {
        Self { pool, partitions }
    }

    /// Connects a standalone channel client (used by the build worker,
    /// which has no pool of its own)
    pub async fn connect(database_url: &str) -> Result<Self, ChannelError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        Ok(Self::new(pool))
    }

    /// Creates the channel tables if they do not exist
    pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS channel_messages (
                seq BIGSERIAL PRIMARY KEY,
                topic TEXT NOT NULL,
                "partition" INT NOT NULL,
                msg_key TEXT NOT NULL,
                payload BYTEA NOT NULL,
                published_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_channel_messages_topic
            ON channel_messages (topic, "partition", seq)
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS channel_cursors (
                group_name TEXT NOT NULL,
                topic TEXT NOT NULL,
                "partition" INT NOT NULL,
                committed_seq BIGINT NOT NULL DEFAULT 0,
                owner TEXT,
                last_heartbeat_at TIMESTAMPTZ,
                PRIMARY KEY (group_name, topic, "partition")
            )
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Channel migrations completed successfully");
        Ok(())
    }

    /// Joins `group` as a new consumer subscribed to `topics`
    ///
    /// Creates the group's cursor rows on first subscription.
    pub async fn subscribe(
        &self,
        group: &str,
        topics: &[&str],
    ) -> Result<PgConsumer, ChannelError> {
        for topic in topics {
            for partition in 0..self.partitions {
                sqlx::query(
                    r#"
                    INSERT INTO channel_cursors (group_name, topic, "partition")
                    VALUES ($1, $2, $3)
                    ON CONFLICT DO NOTHING
                    "#,
                )
                .bind(group)
                .bind(topic)
                .bind(partition)
                .execute(&self.pool)
                .await?;
            }
        }

        let consumer_id = Uuid::new_v4().to_string();

        tracing::debug!(
            "Consumer {} joined group {} on topics {:?}",
            consumer_id,
            group,
            topics
        );

        Ok(PgConsumer {
            pool: self.pool.clone(),
            group: group.to_string(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
            consumer_id,
            lease: DEFAULT_LEASE,
        })
    }
}

#[async_trait::async_trait]
impl Producer for PgChannel {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), ChannelError> {
        let partition = partition_for_key(key, self.partitions);

        sqlx::query(
            r#"
            INSERT INTO channel_messages (topic, "partition", msg_key, payload, published_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(topic)
        .bind(partition)
        .bind(key)
        .bind(payload)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// One member of a consumer group
pub struct PgConsumer {
    pool: PgPool,
    group: String,
    topics: Vec<String>,
    consumer_id: String,
    lease: Duration,
}

impl PgConsumer {
    /// Claims free or expired partition leases and renews held ones
    ///
    /// Returns the owned `(topic, partition, committed_seq)` set.
    async fn claim_partitions(&self) -> Result<Vec<(String, i32, i64)>, ChannelError> {
        let owned: Vec<(String, i32, i64)> = sqlx::query_as(
            r#"
            UPDATE channel_cursors
            SET owner = $1, last_heartbeat_at = now()
            WHERE group_name = $2
              AND topic = ANY($3)
              AND (owner IS NULL
                   OR owner = $1
                   OR last_heartbeat_at IS NULL
                   OR last_heartbeat_at < now() - make_interval(secs => $4))
            RETURNING topic, "partition", committed_seq
            "#,
        )
        .bind(&self.consumer_id)
        .bind(&self.group)
        .bind(&self.topics)
        .bind(self.lease.as_secs_f64())
        .fetch_all(&self.pool)
        .await?;

        Ok(owned)
    }
}

#[async_trait::async_trait]
impl Consumer for PgConsumer {
    async fn poll(&self, max: usize) -> Result<Vec<Message>, ChannelError> {
        let owned = self.claim_partitions().await?;

        let mut messages = Vec::new();

        for (topic, partition, committed_seq) in owned {
            let remaining = max.saturating_sub(messages.len());
            if remaining == 0 {
                break;
            }

            let rows: Vec<MessageRow> = sqlx::query_as(
                r#"
                SELECT seq, topic, "partition", msg_key, payload, published_at
                FROM channel_messages
                WHERE topic = $1 AND "partition" = $2 AND seq > $3
                ORDER BY seq ASC
                LIMIT $4
                "#,
            )
            .bind(&topic)
            .bind(partition)
            .bind(committed_seq)
            .bind(remaining as i64)
            .fetch_all(&self.pool)
            .await?;

            messages.extend(rows.into_iter().map(Message::from));
        }

        Ok(messages)
    }

    async fn commit(&self, message: &Message) -> Result<(), ChannelError> {
        let result = sqlx::query(
            r#"
            UPDATE channel_cursors
            SET committed_seq = $1
            WHERE group_name = $2 AND topic = $3 AND "partition" = $4
              AND owner = $5 AND committed_seq < $1
            "#,
        )
        .bind(message.offset)
        .bind(&self.group)
        .bind(&message.topic)
        .bind(message.partition)
        .bind(&self.consumer_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Either the cursor is already past this offset (fine) or the
            // lease was lost to another consumer.
            let owner: Option<(Option<String>,)> = sqlx::query_as(
                r#"
                SELECT owner FROM channel_cursors
                WHERE group_name = $1 AND topic = $2 AND "partition" = $3
                "#,
            )
            .bind(&self.group)
            .bind(&message.topic)
            .bind(message.partition)
            .fetch_optional(&self.pool)
            .await?;

            if let Some((owner,)) = owner
                && owner.as_deref() != Some(self.consumer_id.as_str())
            {
                return Err(ChannelError::NotOwner {
                    topic: message.topic.clone(),
                    partition: message.partition,
                });
            }
        }

        Ok(())
    }

    async fn heartbeat(&self) -> Result<(), ChannelError> {
        sqlx::query(
            r#"
            UPDATE channel_cursors
            SET last_heartbeat_at = now()
            WHERE group_name = $1 AND owner = $2
            "#,
        )
        .bind(&self.group)
        .bind(&self.consumer_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct MessageRow {
    seq: i64,
    topic: String,
    partition: i32,
    msg_key: String,
    payload: Vec<u8>,
    published_at: chrono::DateTime<chrono::Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            topic: row.topic,
            partition: row.partition,
            offset: row.seq,
            key: row.msg_key,
            payload: row.payload,
            published_at: row.published_at,
        }
    }
}
