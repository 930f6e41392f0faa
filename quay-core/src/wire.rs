//! Channel wire contract
//!
//! Message bodies exchanged over the log event channel between the build
//! worker (producer) and the log ingestion pipeline (consumer). Bodies are
//! UTF-8 JSON, one event per channel message.
//!
//! The schema is a versioned contract: [`WIRE_VERSION`] is the shapes in
//! this module, parsed strictly so that unknown or malformed payloads can
//! be routed to a dead-letter path at ingestion instead of being silently
//! dropped.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::deployment::DeploymentStatus;

/// Current schema version of the types below
pub const WIRE_VERSION: u32 = 1;

/// Topic carrying one message per build output line
pub const LOG_TOPIC: &str = "build-logs";

/// Topic carrying deployment status transitions reported by the worker
pub const STATUS_TOPIC: &str = "deploy-status";

/// One build output line, keyed by the deployment it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LogEventMessage {
    pub project_id: Uuid,
    pub deployment_id: Uuid,
    pub message: String,
}

/// A deployment status transition reported by the worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StatusMessage {
    pub project_id: Uuid,
    pub deployment_id: Uuid,
    pub status: DeploymentStatus,
}

impl LogEventMessage {
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("log event message serializes")
    }

    pub fn from_bytes(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

impl StatusMessage {
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("status message serializes")
    }

    pub fn from_bytes(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_round_trip() {
        let msg = LogEventMessage {
            project_id: Uuid::new_v4(),
            deployment_id: Uuid::new_v4(),
            message: "Build started".to_string(),
        };

        let parsed = LogEventMessage::from_bytes(&msg.to_bytes()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_log_event_field_names() {
        let msg = LogEventMessage {
            project_id: Uuid::new_v4(),
            deployment_id: Uuid::new_v4(),
            message: "hello".to_string(),
        };

        let json: serde_json::Value = serde_json::from_slice(&msg.to_bytes()).unwrap();
        assert!(json.get("projectId").is_some());
        assert!(json.get("deploymentId").is_some());
        assert!(json.get("message").is_some());
    }

    #[test]
    fn test_status_round_trip() {
        let msg = StatusMessage {
            project_id: Uuid::new_v4(),
            deployment_id: Uuid::new_v4(),
            status: DeploymentStatus::Ready,
        };

        let parsed = StatusMessage::from_bytes(&msg.to_bytes()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_malformed_payload_rejected() {
        assert!(LogEventMessage::from_bytes(b"not json").is_err());
        assert!(LogEventMessage::from_bytes(b"{\"message\": \"missing ids\"}").is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let id = Uuid::new_v4();
        let payload = format!(
            "{{\"projectId\":\"{id}\",\"deploymentId\":\"{id}\",\"message\":\"x\",\"extra\":1}}"
        );
        assert!(LogEventMessage::from_bytes(payload.as_bytes()).is_err());
    }
}
