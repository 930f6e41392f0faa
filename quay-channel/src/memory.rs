//! In-memory channel
//!
//! Implements the producer/consumer traits over a mutexed map with a
//! single partition per topic. No durability; intended for unit tests of
//! channel producers and consumers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::{ChannelError, Consumer, Message, Producer};

#[derive(Default)]
struct Inner {
    /// Messages per topic; offsets are global so they stay unique
    topics: HashMap<String, Vec<Message>>,
    /// Committed offset per (group, topic)
    cursors: HashMap<(String, String), i64>,
    next_offset: i64,
}

/// In-memory implementation of the channel
#[derive(Clone, Default)]
pub struct MemoryChannel {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins `group` subscribed to `topics`
    pub fn subscribe(&self, group: &str, topics: &[&str]) -> MemoryConsumer {
        MemoryConsumer {
            inner: Arc::clone(&self.inner),
            group: group.to_string(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[async_trait::async_trait]
impl Producer for MemoryChannel {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().unwrap();

        inner.next_offset += 1;
        let offset = inner.next_offset;

        let message = Message {
            topic: topic.to_string(),
            partition: 0,
            offset,
            key: key.to_string(),
            payload: payload.to_vec(),
            published_at: chrono::Utc::now(),
        };

        inner.topics.entry(topic.to_string()).or_default().push(message);

        Ok(())
    }
}

/// One member of a consumer group on a [`MemoryChannel`]
pub struct MemoryConsumer {
    inner: Arc<Mutex<Inner>>,
    group: String,
    topics: Vec<String>,
}

#[async_trait::async_trait]
impl Consumer for MemoryConsumer {
    async fn poll(&self, max: usize) -> Result<Vec<Message>, ChannelError> {
        let inner = self.inner.lock().unwrap();

        let mut messages = Vec::new();

        for topic in &self.topics {
            let committed = inner
                .cursors
                .get(&(self.group.clone(), topic.clone()))
                .copied()
                .unwrap_or(0);

            if let Some(stored) = inner.topics.get(topic) {
                messages.extend(
                    stored
                        .iter()
                        .filter(|m| m.offset > committed)
                        .take(max.saturating_sub(messages.len()))
                        .cloned(),
                );
            }

            if messages.len() >= max {
                break;
            }
        }

        Ok(messages)
    }

    async fn commit(&self, message: &Message) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().unwrap();

        let cursor = inner
            .cursors
            .entry((self.group.clone(), message.topic.clone()))
            .or_insert(0);

        if *cursor < message.offset {
            *cursor = message.offset;
        }

        Ok(())
    }

    async fn heartbeat(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_then_poll_in_order() {
        let channel = MemoryChannel::new();
        let consumer = channel.subscribe("g", &["logs"]);

        channel.publish("logs", "k", b"one").await.unwrap();
        channel.publish("logs", "k", b"two").await.unwrap();
        channel.publish("logs", "k", b"three").await.unwrap();

        let batch = consumer.poll(10).await.unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0].payload, b"one");
        assert_eq!(batch[2].payload, b"three");
        assert!(batch[0].offset < batch[1].offset);
    }

    #[tokio::test]
    async fn test_uncommitted_batch_redelivered() {
        let channel = MemoryChannel::new();
        let consumer = channel.subscribe("g", &["logs"]);

        channel.publish("logs", "k", b"one").await.unwrap();

        let first = consumer.poll(10).await.unwrap();
        let again = consumer.poll(10).await.unwrap();

        // Nothing was acknowledged, so the message is delivered again.
        assert_eq!(first.len(), 1);
        assert_eq!(again.len(), 1);
        assert_eq!(first[0].offset, again[0].offset);
    }

    #[tokio::test]
    async fn test_commit_advances_cursor() {
        let channel = MemoryChannel::new();
        let consumer = channel.subscribe("g", &["logs"]);

        channel.publish("logs", "k", b"one").await.unwrap();
        channel.publish("logs", "k", b"two").await.unwrap();

        let batch = consumer.poll(10).await.unwrap();
        consumer.commit(&batch[1]).await.unwrap();

        assert!(consumer.poll(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_is_monotonic() {
        let channel = MemoryChannel::new();
        let consumer = channel.subscribe("g", &["logs"]);

        channel.publish("logs", "k", b"one").await.unwrap();
        channel.publish("logs", "k", b"two").await.unwrap();

        let batch = consumer.poll(10).await.unwrap();
        consumer.commit(&batch[1]).await.unwrap();
        consumer.commit(&batch[0]).await.unwrap();

        // Committing behind the cursor must not rewind it.
        assert!(consumer.poll(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_groups_have_independent_cursors() {
        let channel = MemoryChannel::new();
        let first = channel.subscribe("group-a", &["logs"]);
        let second = channel.subscribe("group-b", &["logs"]);

        channel.publish("logs", "k", b"one").await.unwrap();

        let batch = first.poll(10).await.unwrap();
        first.commit(&batch[0]).await.unwrap();

        assert!(first.poll(10).await.unwrap().is_empty());
        assert_eq!(second.poll(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_poll_respects_max() {
        let channel = MemoryChannel::new();
        let consumer = channel.subscribe("g", &["logs"]);

        for i in 0..5 {
            channel
                .publish("logs", "k", format!("{i}").as_bytes())
                .await
                .unwrap();
        }

        assert_eq!(consumer.poll(2).await.unwrap().len(), 2);
    }
}
