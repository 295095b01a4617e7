//! `ScriptedExecutor`: a test double for [`NodeExecutor`].
//!
//! Wraps another executor (the built-in one by default), records every call
//! it receives, and lets tests force a node's output or make it fail.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::{BuiltinExecutor, LatencyConfig, NodeError, NodeExecutor, NodeOutput, WorkflowNode};

/// Behaviour injected for a specific node id.
#[derive(Debug, Clone)]
pub enum Script {
    /// Run the inner executor, then overwrite these keys in its output.
    Override(NodeOutput),
    /// Fail with [`NodeError::Failed`].
    Fail(String),
}

/// A recorded call: which node ran and what input it received.
#[derive(Debug, Clone)]
pub struct Call {
    pub node_id: String,
    pub input: NodeOutput,
}

/// Executor that records calls and applies per-node scripts.
pub struct ScriptedExecutor {
    inner: Arc<dyn NodeExecutor>,
    scripts: HashMap<String, Script>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Default for ScriptedExecutor {
    fn default() -> Self {
        Self::wrapping(Arc::new(BuiltinExecutor::new(LatencyConfig::none())))
    }
}

impl ScriptedExecutor {
    /// Script on top of an arbitrary executor.
    pub fn wrapping(inner: Arc<dyn NodeExecutor>) -> Self {
        Self {
            inner,
            scripts: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Force `key = value` into `node_id`'s output.
    pub fn with_output(mut self, node_id: impl Into<String>, key: &str, value: Value) -> Self {
        let entry = self
            .scripts
            .entry(node_id.into())
            .or_insert_with(|| Script::Override(NodeOutput::new()));
        if let Script::Override(fields) = entry {
            fields.insert(key.to_owned(), value);
        }
        self
    }

    /// Make `node_id` fail with `message`.
    pub fn failing(mut self, node_id: impl Into<String>, message: impl Into<String>) -> Self {
        self.scripts.insert(node_id.into(), Script::Fail(message.into()));
        self
    }

    /// Shared handle to the call log, usable after the executor has been
    /// moved into an engine.
    pub fn call_log(&self) -> Arc<Mutex<Vec<Call>>> {
        Arc::clone(&self.calls)
    }

    /// Node ids in the order they were executed.
    pub fn visited(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|c| c.node_id.clone())
            .collect()
    }

    /// Number of times `node_id` has been executed.
    pub fn call_count(&self, node_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| c.node_id == node_id)
            .count()
    }
}

#[async_trait]
impl NodeExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        node: &WorkflowNode,
        input: &NodeOutput,
    ) -> Result<NodeOutput, NodeError> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(Call {
            node_id: node.node_id.clone(),
            input: input.clone(),
        });

        match self.scripts.get(&node.node_id) {
            Some(Script::Fail(message)) => Err(NodeError::Failed(message.clone())),
            Some(Script::Override(fields)) => {
                let mut out = self.inner.execute(node, input).await?;
                for (key, value) in fields {
                    out.insert(key.clone(), value.clone());
                }
                Ok(out)
            }
            None => self.inner.execute(node, input).await,
        }
    }
}
