//! Quay Log Event Channel
//!
//! An ordered, durable, at-least-once message channel partitioned by
//! topic, with consumer groups and manual offset acknowledgment.
//!
//! Producers append messages to a topic; each message lands in a partition
//! chosen by hashing its key, so all messages sharing a key stay in
//! publish order. Consumers join a named group, claim partition leases,
//! poll batches and commit offsets only after processing. An uncommitted
//! batch is redelivered on the next poll, which is what makes delivery
//! at-least-once: a consumer that crashes mid-batch loses no messages,
//! only its progress through them.
//!
//! Two implementations are provided: [`postgres::PgChannel`], durable and
//! backed by an append-only table, and [`memory::MemoryChannel`] for
//! tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

/// A message read from the channel
#[derive(Debug, Clone)]
pub struct Message {
    pub topic: String,
    pub partition: i32,
    /// Position within the channel; strictly increasing per partition
    pub offset: i64,
    pub key: String,
    pub payload: Vec<u8>,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

/// Channel error type
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("consumer no longer owns partition {partition} of topic {topic}")]
    NotOwner { topic: String, partition: i32 },
}

/// Appends messages to the channel
#[async_trait]
pub trait Producer: Send + Sync {
    /// Publishes one message to `topic`.
    ///
    /// Returns only once the message is durably appended. Messages sharing
    /// a `key` are delivered in publish order.
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), ChannelError>;
}

/// Reads messages as one member of a consumer group
///
/// Each partition of a topic is owned by at most one consumer of a group
/// at a time; ownership is leased and must be renewed via [`heartbeat`]
/// (or by polling). A consumer whose lease expires loses the partition to
/// another group member.
///
/// [`heartbeat`]: Consumer::heartbeat
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Returns up to `max` unacknowledged messages from the partitions this
    /// consumer currently owns, in offset order per partition.
    async fn poll(&self, max: usize) -> Result<Vec<Message>, ChannelError>;

    /// Advances the group cursor through `message`'s offset.
    ///
    /// Commits are monotonic; committing behind the cursor is a no-op.
    async fn commit(&self, message: &Message) -> Result<(), ChannelError>;

    /// Renews this consumer's partition leases.
    async fn heartbeat(&self) -> Result<(), ChannelError>;
}

/// Stable partition assignment for a message key
pub(crate) fn partition_for_key(key: &str, partitions: i32) -> i32 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);

    (hasher.finish() % partitions as u64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_in_range() {
        for key in ["", "a", "deployment-123", "another-key"] {
            let p = partition_for_key(key, 4);
            assert!((0..4).contains(&p));
        }
    }

    #[test]
    fn test_partition_stable() {
        assert_eq!(partition_for_key("k", 8), partition_for_key("k", 8));
    }
}
