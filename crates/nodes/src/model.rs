//! Node definitions as they appear inside a workflow graph.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// NodeKind
// ---------------------------------------------------------------------------

/// The behaviour a node dispatches to.
///
/// Serialised as the lowercase type string (`"trigger"`, `"action"`, …).
/// Any other string is kept verbatim in [`NodeKind::Unknown`] so it can be
/// reported back instead of rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    Trigger,
    Condition,
    Action,
    Approval,
    End,
    Unknown(String),
}

impl NodeKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Trigger => "trigger",
            Self::Condition => "condition",
            Self::Action => "action",
            Self::Approval => "approval",
            Self::End => "end",
            Self::Unknown(other) => other,
        }
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self, Self::Trigger)
    }
}

impl From<String> for NodeKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "trigger" => Self::Trigger,
            "condition" => Self::Condition,
            "action" => Self::Action,
            "approval" => Self::Approval,
            "end" => Self::End,
            _ => Self::Unknown(value),
        }
    }
}

impl From<&str> for NodeKind {
    fn from(value: &str) -> Self {
        Self::from(value.to_owned())
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Unknown(other) => other,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// WorkflowNode
// ---------------------------------------------------------------------------

/// A single step in the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
    /// Identifier unique within the workflow; edges reference it.
    pub node_id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub label: String,
    /// Canvas coordinates. Not used during execution.
    #[serde(default)]
    pub position_x: f64,
    #[serde(default)]
    pub position_y: f64,
    /// Type-specific settings, interpreted only by the node executor.
    #[serde(default)]
    pub configuration: Value,
}

impl WorkflowNode {
    /// Convenience constructor used by tests and the sample workflow.
    pub fn new(
        node_id: impl Into<String>,
        kind: impl Into<NodeKind>,
        label: impl Into<String>,
        configuration: Value,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            kind: kind.into(),
            label: label.into(),
            position_x: 0.0,
            position_y: 0.0,
            configuration,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position_x = x;
        self.position_y = y;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn known_kinds_round_trip_through_strings() {
        for name in ["trigger", "condition", "action", "approval", "end"] {
            let kind = NodeKind::from(name);
            assert!(!matches!(kind, NodeKind::Unknown(_)), "{name} should be known");
            assert_eq!(String::from(kind), name);
        }
    }

    #[test]
    fn unknown_kind_keeps_its_name() {
        let kind = NodeKind::from("webhook-call");
        assert_eq!(kind, NodeKind::Unknown("webhook-call".into()));
        assert_eq!(kind.to_string(), "webhook-call");
    }

    #[test]
    fn node_deserialises_from_camel_case_json() {
        let node: WorkflowNode = serde_json::from_value(json!({
            "nodeId": "approval-1",
            "type": "approval",
            "label": "Manager Approval",
            "positionX": 300,
            "positionY": 100,
            "configuration": { "approver": "manager@example.com" }
        }))
        .expect("valid node json");

        assert_eq!(node.node_id, "approval-1");
        assert_eq!(node.kind, NodeKind::Approval);
        assert_eq!(node.configuration["approver"], "manager@example.com");
    }

    #[test]
    fn missing_optional_fields_default() {
        let node: WorkflowNode =
            serde_json::from_value(json!({ "nodeId": "x", "type": "custom" })).unwrap();
        assert_eq!(node.label, "");
        assert_eq!(node.configuration, Value::Null);
        assert_eq!(node.kind, NodeKind::Unknown("custom".into()));
    }
}
