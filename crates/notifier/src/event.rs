//! Notification payloads.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle events pushed to live observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    WorkflowStarted,
    WorkflowCompleted,
    WorkflowFailed,
    TaskCancelled,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkflowStarted => write!(f, "WORKFLOW_STARTED"),
            Self::WorkflowCompleted => write!(f, "WORKFLOW_COMPLETED"),
            Self::WorkflowFailed => write!(f, "WORKFLOW_FAILED"),
            Self::TaskCancelled => write!(f, "TASK_CANCELLED"),
        }
    }
}

/// Wire shape: `{"type": "...", "data": {...}, "timestamp": <epoch ms>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub event: EventType,
    pub data: Value,
    pub timestamp: i64,
}

impl Notification {
    pub fn new(event: EventType, data: Value) -> Self {
        Self {
            event,
            data,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}
