//! Log ingestion pipeline
//!
//! A long-lived consumer that drains the log event channel into the
//! queryable log store. Per batch: every payload is parsed against the
//! wire contract, log rows are persisted and status transitions applied,
//! and only then is the batch's offset committed. An uncommitted batch is
//! redelivered on the next poll, so no event is ever acknowledged before
//! it is durably stored; the price is that a crash between persist and
//! commit makes duplicates visible on redelivery.
//!
//! Malformed payloads are routed to the dead-letter table and committed
//! past: a poison message must not wedge its partition. The partition
//! lease is heartbeated once per processing loop regardless of batch size.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quay_core::domain::deployment::DeploymentStatus;
use quay_core::wire;
use sqlx::PgPool;
use uuid::Uuid;

use quay_channel::{ChannelError, Consumer, Message};

use crate::repository::deployment_repository;
use crate::repository::log_repository::{self, NewLogEvent};

/// Consumer group this pipeline commits offsets under
pub const CONSUMER_GROUP: &str = "orchestrator-log-ingest";

/// Ingestion error type
#[derive(Debug)]
pub enum IngestError {
    Channel(ChannelError),
    Store(StoreError),
}

impl From<ChannelError> for IngestError {
    fn from(err: ChannelError) -> Self {
        IngestError::Channel(err)
    }
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        IngestError::Store(err)
    }
}

/// Persistence error raised by an [`IngestStore`]
#[derive(Debug)]
pub struct StoreError(pub String);

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError(err.to_string())
    }
}

/// Storage capability of the ingestion pipeline
///
/// Splitting persistence behind a trait keeps the batch loop testable
/// against an in-memory double and leaves the Postgres wiring in one
/// place.
#[async_trait]
pub trait IngestStore: Send + Sync {
    /// Durably persists a batch of log events
    async fn persist_events(&self, events: Vec<NewLogEvent>) -> Result<(), StoreError>;

    /// Applies a deployment status transition reported by a worker
    async fn apply_status(
        &self,
        deployment_id: Uuid,
        status: DeploymentStatus,
    ) -> Result<(), StoreError>;

    /// Records a payload that failed schema validation
    async fn dead_letter(&self, topic: &str, payload: &[u8], reason: &str)
    -> Result<(), StoreError>;
}

/// Postgres-backed implementation of [`IngestStore`]
pub struct PgIngestStore {
    pool: PgPool,
}

impl PgIngestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IngestStore for PgIngestStore {
    async fn persist_events(&self, events: Vec<NewLogEvent>) -> Result<(), StoreError> {
        log_repository::insert_events(&self.pool, &events).await?;
        Ok(())
    }

    async fn apply_status(
        &self,
        deployment_id: Uuid,
        status: DeploymentStatus,
    ) -> Result<(), StoreError> {
        let applied = match status {
            DeploymentStatus::InProgress => {
                deployment_repository::mark_in_progress(&self.pool, deployment_id).await?
            }
            DeploymentStatus::Ready | DeploymentStatus::Failed => {
                deployment_repository::mark_terminal(&self.pool, deployment_id, status).await?
            }
            DeploymentStatus::Queued => false,
        };

        if !applied {
            tracing::warn!(
                "Ignored status update {:?} for deployment {} (stale or unknown)",
                status,
                deployment_id
            );
        }

        Ok(())
    }

    async fn dead_letter(
        &self,
        topic: &str,
        payload: &[u8],
        reason: &str,
    ) -> Result<(), StoreError> {
        log_repository::insert_dead_letter(&self.pool, topic, payload, reason).await?;
        Ok(())
    }
}

/// The ingestion pipeline itself
pub struct LogIngestor {
    consumer: Arc<dyn Consumer>,
    store: Arc<dyn IngestStore>,
    batch_size: usize,
    poll_interval: Duration,
}

impl LogIngestor {
    pub fn new(
        consumer: Arc<dyn Consumer>,
        store: Arc<dyn IngestStore>,
        batch_size: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            consumer,
            store,
            batch_size,
            poll_interval,
        }
    }

    /// Runs the pipeline forever
    ///
    /// A failed batch is logged and retried on redelivery; the loop never
    /// gives up on its own.
    pub async fn run(self) {
        tracing::info!(
            "Log ingestion pipeline running (batch size {}, poll interval {:?})",
            self.batch_size,
            self.poll_interval
        );

        loop {
            match self.run_once().await {
                Ok(0) => tokio::time::sleep(self.poll_interval).await,
                Ok(n) => tracing::debug!("Ingested {} channel message(s)", n),
                Err(e) => {
                    tracing::error!("Ingestion batch failed, will be redelivered: {:?}", e);
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Processes one batch; returns the number of messages handled
    ///
    /// Separated from [`run`](Self::run) so tests can drive the loop
    /// deterministically.
    pub async fn run_once(&self) -> Result<usize, IngestError> {
        let batch = self.consumer.poll(self.batch_size).await?;

        if batch.is_empty() {
            return Ok(0);
        }

        tracing::debug!("Received {} channel message(s)", batch.len());

        // Keep the partition lease alive while the batch is processed,
        // however large it is.
        self.consumer.heartbeat().await?;

        let mut events = Vec::new();
        let mut statuses = Vec::new();
        let mut rejected = Vec::new();

        for message in &batch {
            match message.topic.as_str() {
                wire::LOG_TOPIC => match wire::LogEventMessage::from_bytes(&message.payload) {
                    Ok(event) => events.push(NewLogEvent {
                        deployment_id: event.deployment_id,
                        message: event.message,
                        timestamp: chrono::Utc::now(),
                        channel_seq: message.offset,
                    }),
                    Err(e) => rejected.push((message, format!("malformed log event: {}", e))),
                },
                wire::STATUS_TOPIC => match wire::StatusMessage::from_bytes(&message.payload) {
                    Ok(update) => statuses.push((update.deployment_id, update.status)),
                    Err(e) => rejected.push((message, format!("malformed status update: {}", e))),
                },
                other => rejected.push((message, format!("unexpected topic: {}", other))),
            }
        }

        // Persist everything before acknowledging anything. An error here
        // returns without committing, so the whole batch is redelivered.
        self.store.persist_events(events).await?;

        for (deployment_id, status) in statuses {
            self.store.apply_status(deployment_id, status).await?;
        }

        for (message, reason) in rejected {
            tracing::warn!(
                "Dead-lettering message at offset {} of {}: {}",
                message.offset,
                message.topic,
                reason
            );
            self.store
                .dead_letter(&message.topic, &message.payload, &reason)
                .await?;
        }

        // Commit the furthest offset seen per partition.
        let mut last: HashMap<(String, i32), &Message> = HashMap::new();
        for message in &batch {
            last.insert((message.topic.clone(), message.partition), message);
        }

        for message in last.values() {
            self.consumer.commit(message).await?;
        }

        Ok(batch.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quay_channel::Producer;
    use quay_channel::memory::MemoryChannel;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingStore {
        events: Mutex<Vec<NewLogEvent>>,
        statuses: Mutex<Vec<(Uuid, DeploymentStatus)>>,
        dead: Mutex<Vec<String>>,
        fail_next_persist: AtomicBool,
    }

    #[async_trait]
    impl IngestStore for RecordingStore {
        async fn persist_events(&self, events: Vec<NewLogEvent>) -> Result<(), StoreError> {
            if self.fail_next_persist.swap(false, Ordering::SeqCst) {
                return Err(StoreError("injected persistence failure".to_string()));
            }
            self.events.lock().unwrap().extend(events);
            Ok(())
        }

        async fn apply_status(
            &self,
            deployment_id: Uuid,
            status: DeploymentStatus,
        ) -> Result<(), StoreError> {
            self.statuses.lock().unwrap().push((deployment_id, status));
            Ok(())
        }

        async fn dead_letter(
            &self,
            _topic: &str,
            _payload: &[u8],
            reason: &str,
        ) -> Result<(), StoreError> {
            self.dead.lock().unwrap().push(reason.to_string());
            Ok(())
        }
    }

    struct Fixture {
        channel: MemoryChannel,
        store: Arc<RecordingStore>,
        deployment_id: Uuid,
        project_id: Uuid,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                channel: MemoryChannel::new(),
                store: Arc::new(RecordingStore::default()),
                deployment_id: Uuid::new_v4(),
                project_id: Uuid::new_v4(),
            }
        }

        fn ingestor(&self) -> LogIngestor {
            let consumer = self
                .channel
                .subscribe(CONSUMER_GROUP, &[wire::LOG_TOPIC, wire::STATUS_TOPIC]);
            LogIngestor::new(
                Arc::new(consumer),
                self.store.clone(),
                100,
                Duration::from_millis(10),
            )
        }

        async fn publish_log(&self, message: &str) {
            let body = wire::LogEventMessage {
                project_id: self.project_id,
                deployment_id: self.deployment_id,
                message: message.to_string(),
            };
            self.channel
                .publish(
                    wire::LOG_TOPIC,
                    &self.deployment_id.to_string(),
                    &body.to_bytes(),
                )
                .await
                .unwrap();
        }

        async fn publish_status(&self, status: DeploymentStatus) {
            let body = wire::StatusMessage {
                project_id: self.project_id,
                deployment_id: self.deployment_id,
                status,
            };
            self.channel
                .publish(
                    wire::STATUS_TOPIC,
                    &self.deployment_id.to_string(),
                    &body.to_bytes(),
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_persists_batch_then_commits() {
        let fixture = Fixture::new();
        let ingestor = fixture.ingestor();

        fixture.publish_log("one").await;
        fixture.publish_log("two").await;
        fixture.publish_log("three").await;

        assert_eq!(ingestor.run_once().await.unwrap(), 3);

        {
            let events = fixture.store.events.lock().unwrap();
            assert_eq!(events.len(), 3);
            assert_eq!(events[0].message, "one");
            assert_eq!(events[2].message, "three");
            assert!(events[0].channel_seq < events[1].channel_seq);
        }

        // Batch was committed, nothing is redelivered.
        assert_eq!(ingestor.run_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_batch_uncommitted() {
        let fixture = Fixture::new();
        let ingestor = fixture.ingestor();

        fixture.publish_log("one").await;
        fixture.publish_log("two").await;

        fixture
            .store
            .fail_next_persist
            .store(true, Ordering::SeqCst);
        assert!(ingestor.run_once().await.is_err());
        assert!(fixture.store.events.lock().unwrap().is_empty());

        // Redelivery after the transient failure: nothing was lost.
        assert_eq!(ingestor.run_once().await.unwrap(), 2);
        assert_eq!(fixture.store.events.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_status_updates_applied() {
        let fixture = Fixture::new();
        let ingestor = fixture.ingestor();

        fixture.publish_status(DeploymentStatus::InProgress).await;
        fixture.publish_status(DeploymentStatus::Ready).await;

        ingestor.run_once().await.unwrap();

        let statuses = fixture.store.statuses.lock().unwrap();
        assert_eq!(
            *statuses,
            vec![
                (fixture.deployment_id, DeploymentStatus::InProgress),
                (fixture.deployment_id, DeploymentStatus::Ready),
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_payload_dead_lettered_and_skipped() {
        let fixture = Fixture::new();
        let ingestor = fixture.ingestor();

        fixture
            .channel
            .publish(wire::LOG_TOPIC, "k", b"not json at all")
            .await
            .unwrap();
        fixture.publish_log("valid line").await;

        assert_eq!(ingestor.run_once().await.unwrap(), 2);
        assert_eq!(fixture.store.events.lock().unwrap().len(), 1);
        assert_eq!(fixture.store.dead.lock().unwrap().len(), 1);

        // The poison message was committed past, not redelivered forever.
        assert_eq!(ingestor.run_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_heartbeat_sent_once_per_batch() {
        struct CountingConsumer {
            inner: Box<dyn Consumer>,
            heartbeats: AtomicUsize,
        }

        #[async_trait]
        impl Consumer for CountingConsumer {
            async fn poll(&self, max: usize) -> Result<Vec<Message>, ChannelError> {
                self.inner.poll(max).await
            }

            async fn commit(&self, message: &Message) -> Result<(), ChannelError> {
                self.inner.commit(message).await
            }

            async fn heartbeat(&self) -> Result<(), ChannelError> {
                self.heartbeats.fetch_add(1, Ordering::SeqCst);
                self.inner.heartbeat().await
            }
        }

        let fixture = Fixture::new();
        let consumer = Arc::new(CountingConsumer {
            inner: Box::new(
                fixture
                    .channel
                    .subscribe(CONSUMER_GROUP, &[wire::LOG_TOPIC, wire::STATUS_TOPIC]),
            ),
            heartbeats: AtomicUsize::new(0),
        });

        let ingestor = LogIngestor::new(
            consumer.clone(),
            fixture.store.clone(),
            100,
            Duration::from_millis(10),
        );

        fixture.publish_log("one").await;
        fixture.publish_log("two").await;
        ingestor.run_once().await.unwrap();

        assert_eq!(consumer.heartbeats.load(Ordering::SeqCst), 1);
    }
}
