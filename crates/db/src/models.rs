//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models: they carry no domain behaviour.
//! Domain types live in the `engine` crate.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
pub use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// workflows
// ---------------------------------------------------------------------------

/// A persisted workflow definition row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkflowRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub active: bool,
    /// `{"nodes": [...], "edges": [...]}`
    pub definition: Json<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`crate::repository::workflows::create_workflow`].
#[derive(Debug, Clone)]
pub struct NewWorkflow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub active: bool,
    pub definition: Value,
}

// ---------------------------------------------------------------------------
// tasks
// ---------------------------------------------------------------------------

/// Lifecycle of a task.
///
/// `Running` is the only non-terminal state:
/// `RUNNING -> COMPLETED | FAILED | CANCELLED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RUNNING"   => Ok(Self::Running),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED"    => Ok(Self::Failed),
            "CANCELLED" => Ok(Self::Cancelled),
            other       => Err(format!("unknown task status: {other}")),
        }
    }
}

/// A persisted task row: one per node visited during a run.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskRow {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub node_id: String,
    pub name: String,
    pub task_type: String,
    pub configuration: Option<Json<Value>>,
    pub status: TaskStatus,
    pub result: Option<Json<Value>>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for [`crate::repository::tasks::create_task`]. The task starts in
/// `RUNNING` with `started_at = now`.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub workflow_id: Uuid,
    pub node_id: String,
    pub name: String,
    pub task_type: String,
    pub configuration: Value,
}

// ---------------------------------------------------------------------------
// execution_logs
// ---------------------------------------------------------------------------

/// Status recorded on an execution log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum LogStatus {
    Started,
    Completed,
    Failed,
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started   => write!(f, "STARTED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed    => write!(f, "FAILED"),
        }
    }
}

/// An append-only execution log row.
///
/// Workflow-level entries have no `task_id`/`node_id`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExecutionLogRow {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub task_id: Option<Uuid>,
    pub node_id: Option<String>,
    pub status: LogStatus,
    pub message: String,
    pub data: Option<Json<Value>>,
    pub created_at: DateTime<Utc>,
}

impl ExecutionLogRow {
    pub fn is_workflow_level(&self) -> bool {
        self.task_id.is_none()
    }
}

/// Input for [`crate::repository::logs::append_log`].
#[derive(Debug, Clone)]
pub struct NewExecutionLog {
    pub workflow_id: Uuid,
    pub task_id: Option<Uuid>,
    pub node_id: Option<String>,
    pub status: LogStatus,
    pub message: String,
    pub data: Option<Value>,
}

impl NewExecutionLog {
    /// A workflow-level entry.
    pub fn workflow(workflow_id: Uuid, status: LogStatus, message: impl Into<String>) -> Self {
        Self {
            workflow_id,
            task_id: None,
            node_id: None,
            status,
            message: message.into(),
            data: None,
        }
    }

    /// A node-level entry referencing the node's task.
    pub fn node(task: &TaskRow, status: LogStatus, message: impl Into<String>) -> Self {
        Self {
            workflow_id: task.workflow_id,
            task_id: Some(task.id),
            node_id: Some(task.node_id.clone()),
            status,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}
