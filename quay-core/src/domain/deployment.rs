//! Deployment domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One build-and-publish attempt for a project
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: Uuid,
    pub project_id: Uuid,
    pub status: DeploymentStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Deployment lifecycle status
///
/// Transitions are monotonic: Queued -> InProgress -> {Ready | Failed}.
/// A terminal state is never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentStatus {
    Queued,
    InProgress,
    Ready,
    Failed,
}

impl DeploymentStatus {
    /// Whether this status admits no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, DeploymentStatus::Ready | DeploymentStatus::Failed)
    }

    /// Whether `next` is a legal successor of this status
    ///
    /// Terminal states can be reached from any non-terminal state so that a
    /// worker that failed before reporting progress can still be recorded
    /// as failed.
    pub fn can_transition_to(self, next: DeploymentStatus) -> bool {
        match (self, next) {
            (DeploymentStatus::Queued, DeploymentStatus::InProgress) => true,
            (DeploymentStatus::Queued | DeploymentStatus::InProgress, n) => n.is_terminal(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!DeploymentStatus::Queued.is_terminal());
        assert!(!DeploymentStatus::InProgress.is_terminal());
        assert!(DeploymentStatus::Ready.is_terminal());
        assert!(DeploymentStatus::Failed.is_terminal());
    }

    #[test]
    fn test_monotonic_transitions() {
        assert!(DeploymentStatus::Queued.can_transition_to(DeploymentStatus::InProgress));
        assert!(DeploymentStatus::InProgress.can_transition_to(DeploymentStatus::Ready));
        assert!(DeploymentStatus::InProgress.can_transition_to(DeploymentStatus::Failed));
        assert!(DeploymentStatus::Queued.can_transition_to(DeploymentStatus::Failed));

        // No transition leaves a terminal state
        assert!(!DeploymentStatus::Ready.can_transition_to(DeploymentStatus::Failed));
        assert!(!DeploymentStatus::Failed.can_transition_to(DeploymentStatus::Ready));
        assert!(!DeploymentStatus::Ready.can_transition_to(DeploymentStatus::InProgress));

        // No transition goes backwards
        assert!(!DeploymentStatus::InProgress.can_transition_to(DeploymentStatus::Queued));
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_string(&DeploymentStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        let parsed: DeploymentStatus = serde_json::from_str("\"QUEUED\"").unwrap();
        assert_eq!(parsed, DeploymentStatus::Queued);
    }
}
