//! Engine-level error types.

use thiserror::Error;
use uuid::Uuid;

use db::models::TaskStatus;
use nodes::NodeError;

/// Errors produced by the workflow engine (validation + execution).
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Precondition errors ------

    /// The workflow has no node of type `trigger`; nothing was executed.
    #[error("no trigger node found in workflow")]
    MissingTrigger,

    /// Two or more nodes share the same ID.
    #[error("duplicate node ID: '{0}'")]
    DuplicateNodeId(String),

    /// The stored definition could not be decoded into nodes and edges.
    #[error("invalid workflow definition: {0}")]
    InvalidDefinition(#[from] serde_json::Error),

    #[error("workflow {0} not found")]
    WorkflowNotFound(Uuid),

    // ------ Execution errors ------

    /// A node's executor failed; its task is marked `FAILED`.
    #[error("node '{node_id}': {source}")]
    NodeFailed {
        node_id: String,
        #[source]
        source: NodeError,
    },

    /// The run visited more nodes than the configured cap allows.
    #[error("run exceeded the limit of {limit} node visits")]
    VisitLimitExceeded { limit: usize },

    // ------ Task operations ------

    #[error("task {0} not found")]
    TaskNotFound(Uuid),

    /// Cancellation only applies to `RUNNING` tasks.
    #[error("task {id} is already {status}")]
    TaskAlreadyTerminal { id: Uuid, status: TaskStatus },

    /// Persistence error from the db crate.
    #[error("database error: {0}")]
    Database(#[from] db::DbError),
}
