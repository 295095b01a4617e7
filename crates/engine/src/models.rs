//! Core domain models for the workflow engine.
//!
//! These types are the source of truth for what a workflow looks like
//! in memory. The graph part (nodes and edges) is stored in the JSON
//! `definition` column of the `workflows` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use db::models::{NewWorkflow, WorkflowRow};

use crate::EngineError;

pub use nodes::{NodeKind, WorkflowNode};

// ---------------------------------------------------------------------------
// WorkflowEdge
// ---------------------------------------------------------------------------

/// Directed edge from one node to another.
///
/// Endpoints are soft references to `WorkflowNode::node_id`; an edge whose
/// target does not exist is simply never followed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEdge {
    pub source_node_id: String,
    pub target_node_id: String,
    /// Expression evaluated against the source node's output. `None` or
    /// empty always passes.
    #[serde(default)]
    pub condition: Option<String>,
}

impl WorkflowEdge {
    /// Unconditional edge.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_node_id: source.into(),
            target_node_id: target.into(),
            condition: None,
        }
    }

    pub fn when(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

// ---------------------------------------------------------------------------
// WorkflowGraph
// ---------------------------------------------------------------------------

/// The persisted `definition` column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowGraph {
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub edges: Vec<WorkflowEdge>,
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

fn default_active() -> bool {
    true
}

/// A complete workflow definition. Owns its nodes and edges; both lists are
/// ordered and that order drives trigger selection and traversal order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub edges: Vec<WorkflowEdge>,
}

impl Workflow {
    /// Convenience constructor for testing.
    pub fn new(
        name: impl Into<String>,
        nodes: Vec<WorkflowNode>,
        edges: Vec<WorkflowEdge>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            active: true,
            created_at: now,
            updated_at: now,
            nodes,
            edges,
        }
    }

    /// The first node of type `trigger`, in node-list order.
    pub fn trigger_node(&self) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.kind.is_trigger())
    }

    /// Look a node up by its `node_id`.
    pub fn node(&self, node_id: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.node_id == node_id)
    }

    /// Edges leaving `node_id`, in edge-list order.
    pub fn outgoing<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a WorkflowEdge> + 'a {
        self.edges.iter().filter(move |e| e.source_node_id == node_id)
    }

    /// JSON stored in the `definition` column.
    pub fn definition(&self) -> Result<Value, EngineError> {
        let graph = WorkflowGraph {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        };
        Ok(serde_json::to_value(graph)?)
    }

    /// Row input for persisting this workflow.
    pub fn to_new_row(&self) -> Result<NewWorkflow, EngineError> {
        Ok(NewWorkflow {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            active: self.active,
            definition: self.definition()?,
        })
    }
}

impl TryFrom<WorkflowRow> for Workflow {
    type Error = EngineError;

    fn try_from(row: WorkflowRow) -> Result<Self, Self::Error> {
        let graph: WorkflowGraph = serde_json::from_value(row.definition.0)?;
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            nodes: graph.nodes,
            edges: graph.edges,
        })
    }
}
