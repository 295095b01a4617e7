//! Node-level error type.

use thiserror::Error;

/// Errors returned by a node executor.
///
/// Every variant is terminal for the run: the engine marks the node's task
/// as `FAILED` and aborts the traversal. There is no retry.
#[derive(Debug, Error, Clone)]
pub enum NodeError {
    /// The node's behaviour could not be carried out.
    #[error("node execution failed: {0}")]
    Failed(String),
}
