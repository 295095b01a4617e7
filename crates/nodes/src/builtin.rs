//! Built-in node behaviour, one handler per [`NodeKind`].
//!
//! Every handler returns a mapping with `status = "completed"` and a
//! `message`, plus its type-specific keys:
//!
//! | kind      | extra keys                                      |
//! |-----------|-------------------------------------------------|
//! | trigger   | `triggerData`                                   |
//! | condition | `conditionResult`, `condition`                  |
//! | action    | `actionResult`, `input`                         |
//! | approval  | `approved`, `approver`, `approvalTime`, `input` |
//! | end       | `finalData`                                     |
//!
//! `input` is the handler's own input, so nodes after an approval or action
//! can still reach earlier results (`input.triggerData.formData...`).
//!
//! Unknown kinds complete with an "Unknown node type" message instead of
//! failing.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::path::{resolve, stringify};
use crate::{NodeError, NodeExecutor, NodeKind, NodeOutput, WorkflowNode};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Simulated processing time for trigger and action nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyConfig {
    pub trigger: Duration,
    pub action: Duration,
}

impl LatencyConfig {
    /// No artificial delay at all.
    pub fn none() -> Self {
        Self {
            trigger: Duration::ZERO,
            action: Duration::ZERO,
        }
    }
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            trigger: Duration::from_millis(500),
            action: Duration::from_millis(1000),
        }
    }
}

// ---------------------------------------------------------------------------
// Condition rules
// ---------------------------------------------------------------------------

/// Comparison carried in a condition node's configuration, e.g.
/// `{"field": "position", "operator": "equals", "value": "Senior"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConditionRule {
    /// Dotted path into the node's input.
    pub field: String,
    #[serde(default)]
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    #[default]
    #[serde(alias = "==")]
    Equals,
    #[serde(alias = "!=")]
    NotEquals,
    Contains,
    #[serde(alias = ">")]
    GreaterThan,
    #[serde(alias = "<")]
    LessThan,
    Exists,
}

impl ConditionRule {
    /// Parse a rule from node configuration. `None` when the configuration
    /// does not describe a rule.
    pub fn from_configuration(configuration: &Value) -> Option<Self> {
        serde_json::from_value(configuration_object(configuration)?).ok()
    }

    /// Evaluate the rule against `input`. A field that is not found only
    /// satisfies `not_equals`.
    pub fn evaluate(&self, input: &NodeOutput) -> bool {
        let actual = resolve(input, &self.field);

        match self.operator {
            Operator::Exists => actual.is_some(),
            Operator::Equals => actual.is_some_and(|v| stringify(v) == stringify(&self.value)),
            Operator::NotEquals => actual.map_or(true, |v| stringify(v) != stringify(&self.value)),
            Operator::Contains => actual.is_some_and(|v| match v {
                Value::Array(items) => {
                    let needle = stringify(&self.value);
                    items.iter().any(|item| stringify(item) == needle)
                }
                other => stringify(other).contains(&stringify(&self.value)),
            }),
            Operator::GreaterThan => compare_numbers(actual, &self.value, |a, b| a > b),
            Operator::LessThan => compare_numbers(actual, &self.value, |a, b| a < b),
        }
    }
}

/// Node configuration as a JSON value. Configuration saved as raw JSON
/// text is parsed; `null` and unparseable text give `None`.
pub fn configuration_object(configuration: &Value) -> Option<Value> {
    match configuration {
        Value::Null => None,
        Value::String(text) => serde_json::from_str(text).ok(),
        other => Some(other.clone()),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn compare_numbers(actual: Option<&Value>, expected: &Value, cmp: fn(f64, f64) -> bool) -> bool {
    match (actual.and_then(as_number), as_number(expected)) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// BuiltinExecutor
// ---------------------------------------------------------------------------

/// The production [`NodeExecutor`].
#[derive(Debug, Clone, Default)]
pub struct BuiltinExecutor {
    latency: LatencyConfig,
}

impl BuiltinExecutor {
    pub fn new(latency: LatencyConfig) -> Self {
        Self { latency }
    }

    async fn trigger(&self, input: &NodeOutput) -> NodeOutput {
        simulate(self.latency.trigger).await;
        completed(
            "Trigger node executed",
            [("triggerData", Value::Object(input.clone()))],
        )
    }

    fn condition(&self, node: &WorkflowNode, input: &NodeOutput) -> NodeOutput {
        let outcome = match ConditionRule::from_configuration(&node.configuration) {
            Some(rule) => rule.evaluate(input),
            None => {
                debug!(node_id = %node.node_id, "condition node has no usable rule, evaluating to false");
                false
            }
        };

        completed(
            "Condition node executed",
            [
                ("conditionResult", Value::Bool(outcome)),
                ("condition", Value::String(outcome.to_string())),
            ],
        )
    }

    async fn action(&self, input: &NodeOutput) -> NodeOutput {
        simulate(self.latency.action).await;
        completed(
            "Action node executed",
            [
                ("actionResult", json!("Action completed successfully")),
                ("input", Value::Object(input.clone())),
            ],
        )
    }

    fn approval(&self, node: &WorkflowNode, input: &NodeOutput) -> NodeOutput {
        // Approvals resolve immediately; there is no waiting state.
        let approver = configuration_object(&node.configuration)
            .and_then(|config| config.get("approver")?.as_str().map(str::to_owned))
            .unwrap_or_else(|| "system".to_owned());

        completed(
            "Approval node executed",
            [
                ("approved", Value::Bool(true)),
                ("approver", json!(approver)),
                ("approvalTime", json!(Utc::now().timestamp_millis())),
                ("input", Value::Object(input.clone())),
            ],
        )
    }

    fn end(&self, input: &NodeOutput) -> NodeOutput {
        completed(
            "End node reached - workflow complete",
            [("finalData", Value::Object(input.clone()))],
        )
    }
}

#[async_trait]
impl NodeExecutor for BuiltinExecutor {
    async fn execute(
        &self,
        node: &WorkflowNode,
        input: &NodeOutput,
    ) -> Result<NodeOutput, NodeError> {
        let output = match &node.kind {
            NodeKind::Trigger => self.trigger(input).await,
            NodeKind::Condition => self.condition(node, input),
            NodeKind::Action => self.action(input).await,
            NodeKind::Approval => self.approval(node, input),
            NodeKind::End => self.end(input),
            NodeKind::Unknown(kind) => {
                warn!(node_id = %node.node_id, node_type = %kind, "unknown node type");
                completed(format!("Unknown node type: {kind}"), [])
            }
        };
        Ok(output)
    }
}

fn completed<const N: usize>(message: impl Into<String>, extra: [(&str, Value); N]) -> NodeOutput {
    let mut out = NodeOutput::new();
    out.insert("status".into(), json!("completed"));
    out.insert("message".into(), Value::String(message.into()));
    for (key, value) in extra {
        out.insert(key.to_owned(), value);
    }
    out
}

async fn simulate(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
