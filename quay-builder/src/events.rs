//! Build event publication
//!
//! Every observable step of the worker goes out as a channel message:
//! build output lines and progress markers on the log topic, terminal
//! state on the status topic. The worker never writes to the log store
//! directly, which decouples build execution from storage durability.

use std::sync::Arc;

use anyhow::{Context, Result};
use uuid::Uuid;

use quay_channel::Producer;
use quay_core::domain::deployment::DeploymentStatus;
use quay_core::domain::log::SENTINEL_MESSAGE;
use quay_core::wire;

/// Publishes log and status events for one deployment
///
/// All messages are keyed by the deployment id so they share a channel
/// partition and arrive in publish order.
#[derive(Clone)]
pub struct EventPublisher {
    producer: Arc<dyn Producer>,
    project_id: Uuid,
    deployment_id: Uuid,
}

impl EventPublisher {
    pub fn new(producer: Arc<dyn Producer>, project_id: Uuid, deployment_id: Uuid) -> Self {
        Self {
            producer,
            project_id,
            deployment_id,
        }
    }

    /// Publishes one log line
    pub async fn log(&self, message: impl Into<String>) -> Result<()> {
        let body = wire::LogEventMessage {
            project_id: self.project_id,
            deployment_id: self.deployment_id,
            message: message.into(),
        };

        self.producer
            .publish(
                wire::LOG_TOPIC,
                &self.deployment_id.to_string(),
                &body.to_bytes(),
            )
            .await
            .context("failed to publish log event")
    }

    /// Publishes a deployment status transition
    pub async fn status(&self, status: DeploymentStatus) -> Result<()> {
        let body = wire::StatusMessage {
            project_id: self.project_id,
            deployment_id: self.deployment_id,
            status,
        };

        self.producer
            .publish(
                wire::STATUS_TOPIC,
                &self.deployment_id.to_string(),
                &body.to_bytes(),
            )
            .await
            .context("failed to publish status event")
    }

    /// Publishes the terminal sentinel log line
    pub async fn sentinel(&self) -> Result<()> {
        self.log(SENTINEL_MESSAGE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quay_channel::Consumer;
    use quay_channel::memory::MemoryChannel;

    #[tokio::test]
    async fn test_events_land_on_expected_topics() {
        let channel = MemoryChannel::new();
        let consumer = channel.subscribe("test", &[wire::LOG_TOPIC, wire::STATUS_TOPIC]);

        let publisher =
            EventPublisher::new(Arc::new(channel), Uuid::new_v4(), Uuid::new_v4());

        publisher.log("Build started").await.unwrap();
        publisher.status(DeploymentStatus::InProgress).await.unwrap();
        publisher.sentinel().await.unwrap();

        let batch = consumer.poll(10).await.unwrap();
        assert_eq!(batch.len(), 3);

        let logs: Vec<_> = batch
            .iter()
            .filter(|m| m.topic == wire::LOG_TOPIC)
            .collect();
        assert_eq!(logs.len(), 2);

        let last = wire::LogEventMessage::from_bytes(&logs[1].payload).unwrap();
        assert_eq!(last.message, SENTINEL_MESSAGE);

        let status = batch
            .iter()
            .find(|m| m.topic == wire::STATUS_TOPIC)
            .unwrap();
        let parsed = wire::StatusMessage::from_bytes(&status.payload).unwrap();
        assert_eq!(parsed.status, DeploymentStatus::InProgress);
    }
}
