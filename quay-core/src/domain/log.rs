//! Log event domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal log line the build worker publishes as its final event.
///
/// Log readers treat its presence as the completion signal for a
/// deployment's log stream.
pub const SENTINEL_MESSAGE: &str = "Process done";

/// A single persisted build log line
///
/// Append-only and immutable once written. The `event_id` is assigned at
/// ingestion time, not by the producer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub event_id: Uuid,
    pub deployment_id: Uuid,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
