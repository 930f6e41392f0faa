//! Log retrieval DTOs

use serde::{Deserialize, Serialize};

use crate::domain::log::LogEvent;

/// Response body of a log query, ordered by timestamp ascending
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsResponse {
    pub logs: Vec<LogEvent>,
}
