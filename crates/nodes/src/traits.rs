//! The `NodeExecutor` trait: the contract every node behaviour must fulfil.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{NodeError, WorkflowNode};

/// The result mapping a node produces. It becomes the next node's input and
/// the context outgoing edge conditions are evaluated against.
pub type NodeOutput = Map<String, Value>;

/// Executes a single node.
///
/// Defined here (in the nodes crate) so both the engine and alternative
/// executors can depend on it without a circular dependency.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Run `node` with the previous node's output (or the trigger payload)
    /// as `input`, and return this node's output.
    async fn execute(&self, node: &WorkflowNode, input: &NodeOutput)
        -> Result<NodeOutput, NodeError>;
}
