//! Static graph checks: run before persisting a workflow or from the CLI.
//!
//! Errors (the workflow cannot run):
//! 1. Node IDs must be unique within the workflow.
//! 2. At least one trigger node must exist.
//!
//! Warnings (the engine tolerates them, but they are usually mistakes):
//! - more than one trigger node (only the first is used),
//! - edges whose endpoints do not exist (never followed),
//! - nodes unreachable from the trigger,
//! - cycles (bounded only by the visit cap at run time).
//!
//! When the graph is acyclic the report carries a topological order.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use crate::{models::Workflow, EngineError};

/// Something suspicious about a workflow graph that does not stop it running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphWarning {
    /// Node ids of every trigger after the first.
    ExtraTriggers(Vec<String>),
    DanglingEdge { node_id: String, side: &'static str },
    Unreachable(Vec<String>),
    Cycle,
}

impl fmt::Display for GraphWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExtraTriggers(ids) => {
                write!(f, "additional trigger nodes are ignored: {}", ids.join(", "))
            }
            Self::DanglingEdge { node_id, side } => {
                write!(f, "edge {side} references unknown node '{node_id}'")
            }
            Self::Unreachable(ids) => {
                write!(f, "nodes unreachable from the trigger: {}", ids.join(", "))
            }
            Self::Cycle => write!(f, "graph contains a cycle"),
        }
    }
}

/// Outcome of [`validate_graph`].
#[derive(Debug, Clone)]
pub struct GraphReport {
    /// The trigger node the engine will start from.
    pub trigger: String,
    pub warnings: Vec<GraphWarning>,
    /// Topological order over valid edges, `None` if cyclic.
    pub order: Option<Vec<String>>,
}

impl GraphReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Validate the workflow's graph.
///
/// # Errors
/// - [`EngineError::DuplicateNodeId`] if two nodes share an ID.
/// - [`EngineError::MissingTrigger`] if no node has type `trigger`.
pub fn validate_graph(workflow: &Workflow) -> Result<GraphReport, EngineError> {
    // -----------------------------------------------------------------------
    // 1. Ensure node IDs are unique
    // -----------------------------------------------------------------------
    let mut node_set: HashSet<&str> = HashSet::new();
    for node in &workflow.nodes {
        if !node_set.insert(node.node_id.as_str()) {
            return Err(EngineError::DuplicateNodeId(node.node_id.clone()));
        }
    }

    // -----------------------------------------------------------------------
    // 2. Trigger selection
    // -----------------------------------------------------------------------
    let mut triggers = workflow
        .nodes
        .iter()
        .filter(|n| n.kind.is_trigger())
        .map(|n| n.node_id.clone());
    let trigger = triggers.next().ok_or(EngineError::MissingTrigger)?;

    let mut warnings = Vec::new();
    let extra: Vec<String> = triggers.collect();
    if !extra.is_empty() {
        warnings.push(GraphWarning::ExtraTriggers(extra));
    }

    // -----------------------------------------------------------------------
    // 3. Edge endpoints
    // -----------------------------------------------------------------------
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> =
        workflow.nodes.iter().map(|n| (n.node_id.as_str(), 0)).collect();

    for edge in &workflow.edges {
        let source = edge.source_node_id.as_str();
        let target = edge.target_node_id.as_str();
        let mut valid = true;
        for (node_id, side) in [(source, "source"), (target, "target")] {
            if !node_set.contains(node_id) {
                warnings.push(GraphWarning::DanglingEdge {
                    node_id: node_id.to_owned(),
                    side,
                });
                valid = false;
            }
        }
        if valid {
            adjacency.entry(source).or_default().push(target);
            *in_degree.entry(target).or_insert(0) += 1;
        }
    }

    // -----------------------------------------------------------------------
    // 4. Reachability from the trigger
    // -----------------------------------------------------------------------
    let mut reached: HashSet<&str> = HashSet::from([trigger.as_str()]);
    let mut frontier = vec![trigger.as_str()];
    while let Some(node_id) = frontier.pop() {
        for &next in adjacency.get(node_id).into_iter().flatten() {
            if reached.insert(next) {
                frontier.push(next);
            }
        }
    }
    let unreachable: Vec<String> = workflow
        .nodes
        .iter()
        .map(|n| n.node_id.as_str())
        .filter(|id| !reached.contains(id))
        .map(str::to_owned)
        .collect();
    if !unreachable.is_empty() {
        warnings.push(GraphWarning::Unreachable(unreachable));
    }

    // -----------------------------------------------------------------------
    // 5. Topological sort (Kahn's algorithm)
    // -----------------------------------------------------------------------
    // Seeded in node-list order so the result is deterministic.
    let mut queue: VecDeque<&str> = workflow
        .nodes
        .iter()
        .map(|n| n.node_id.as_str())
        .filter(|id| in_degree.get(id) == Some(&0))
        .collect();

    let mut sorted: Vec<String> = Vec::with_capacity(workflow.nodes.len());

    while let Some(node_id) = queue.pop_front() {
        sorted.push(node_id.to_owned());

        for &neighbour in adjacency.get(node_id).into_iter().flatten() {
            if let Some(deg) = in_degree.get_mut(neighbour) {
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(neighbour);
                }
            }
        }
    }

    let order = if sorted.len() == workflow.nodes.len() {
        Some(sorted)
    } else {
        warnings.push(GraphWarning::Cycle);
        None
    };

    Ok(GraphReport {
        trigger,
        warnings,
        order,
    })
}
